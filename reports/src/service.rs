//! Report orchestration: serve from the cache when a fresh entry exists,
//! fetch in the foreground otherwise, and refresh behind the scenes on every
//! hit so entries rarely age out while an account is in use.

use crate::cache::{CachedReport, ReportCache};
use crate::client::ReportClient;
use crate::errors::ReportError;
use crate::metrics_defs::{REPORT_CACHE_HIT, REPORT_CACHE_MISS};
use crate::parser::ReportRow;
use crate::refresh::RefreshQueue;
use accounts::Account;
use async_trait::async_trait;
use chrono::Utc;
use shared::counter;
use std::sync::Arc;

/// Seam over the remote client so orchestration can be exercised with a
/// counting stub.
#[async_trait]
pub trait ReportFetcher: Send + Sync {
    async fn fetch(&self, account: &Account) -> Result<Vec<ReportRow>, ReportError>;
}

#[async_trait]
impl ReportFetcher for ReportClient {
    async fn fetch(&self, account: &Account) -> Result<Vec<ReportRow>, ReportError> {
        self.fetch_report(&account.access_token, &account.login).await
    }
}

#[derive(Clone)]
pub struct ReportService {
    fetcher: Arc<dyn ReportFetcher>,
    cache: ReportCache,
    refresh: RefreshQueue,
}

impl ReportService {
    pub fn new(fetcher: Arc<dyn ReportFetcher>, cache: ReportCache, refresh: RefreshQueue) -> Self {
        ReportService {
            fetcher,
            cache,
            refresh,
        }
    }

    /// Serve the report for an account.
    ///
    /// A fresh cache entry is returned immediately with a refresh enqueued
    /// behind it, on every hit rather than only near expiry. A stale or
    /// missing entry means a foreground fetch; its failure propagates to the
    /// caller with no stale fallback.
    pub async fn get_report(&self, account: &Account) -> Result<Vec<ReportRow>, ReportError> {
        match self.cache.get(account.id).await? {
            Some(cached) if cached.is_fresh(Utc::now()) => {
                counter!(REPORT_CACHE_HIT).increment(1);
                self.refresh.submit(account.clone());
                Ok(cached.rows)
            }
            _ => {
                counter!(REPORT_CACHE_MISS).increment(1);
                self.fetch_and_store(account).await
            }
        }
    }

    /// The cached entry regardless of who asks, with its freshness left for
    /// the caller to judge.
    pub async fn cached_report(&self, account_id: i64) -> Result<Option<CachedReport>, ReportError> {
        self.cache.get(account_id).await
    }

    pub async fn invalidate(&self, account_id: i64) -> Result<(), ReportError> {
        self.cache.invalidate(account_id).await
    }

    /// Fetch, parse and write through the cache. Shared by the foreground
    /// path and both refresh flavors.
    pub(crate) async fn fetch_and_store(
        &self,
        account: &Account,
    ) -> Result<Vec<ReportRow>, ReportError> {
        let rows = self.fetcher.fetch(account).await?;
        self.cache.put(account.id, &rows).await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh;
    use crate::store::{InMemoryReportStore, ReportStore};
    use indexmap::IndexMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn new() -> Arc<Self> {
            Arc::new(CountingFetcher {
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReportFetcher for CountingFetcher {
        async fn fetch(&self, _account: &Account) -> Result<Vec<ReportRow>, ReportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(fetched_rows())
        }
    }

    fn fetched_rows() -> Vec<ReportRow> {
        vec![IndexMap::from_iter([
            ("CampaignId".to_string(), "9".to_string()),
            ("Clicks".to_string(), "99".to_string()),
        ])]
    }

    fn cached_rows() -> Vec<ReportRow> {
        vec![IndexMap::from_iter([
            ("CampaignId".to_string(), "1".to_string()),
            ("Clicks".to_string(), "10".to_string()),
        ])]
    }

    fn account() -> Account {
        Account {
            id: 7,
            external_id: "ext-7".to_string(),
            login: "shop".to_string(),
            display_name: "Shop".to_string(),
            access_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
            created_at: Utc::now(),
        }
    }

    fn service_with(
        fetcher: Arc<CountingFetcher>,
        store: Arc<InMemoryReportStore>,
    ) -> ReportService {
        let cache = ReportCache::new(store);
        let (queue, rx) = RefreshQueue::new();
        let service = ReportService::new(fetcher, cache, queue);
        tokio::spawn(refresh::run_refresh_worker(rx, service.clone()));
        service
    }

    async fn wait_for_calls(fetcher: &CountingFetcher, expected: usize) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while fetcher.calls() < expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("expected fetch count was not reached");
    }

    #[tokio::test]
    async fn hit_serves_cached_rows_and_refreshes_once() {
        let fetcher = CountingFetcher::new();
        let store = Arc::new(InMemoryReportStore::default());
        let service = service_with(fetcher.clone(), store.clone());

        ReportCache::new(store).put(7, &cached_rows()).await.unwrap();

        let rows = service.get_report(&account()).await.unwrap();
        assert_eq!(rows, cached_rows());

        // Exactly one background fetch, even though the entry was fresh.
        wait_for_calls(&fetcher, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn miss_fetches_in_the_foreground_and_writes_through() {
        let fetcher = CountingFetcher::new();
        let store = Arc::new(InMemoryReportStore::default());
        let service = service_with(fetcher.clone(), store);

        let rows = service.get_report(&account()).await.unwrap();
        assert_eq!(rows, fetched_rows());
        assert_eq!(fetcher.calls(), 1);

        // The entry is now cached; the next call serves it and only adds the
        // background refresh.
        let rows = service.get_report(&account()).await.unwrap();
        assert_eq!(rows, fetched_rows());
        wait_for_calls(&fetcher, 2).await;
    }

    #[tokio::test]
    async fn stale_entry_is_refetched_in_the_foreground() {
        let fetcher = CountingFetcher::new();
        let store = Arc::new(InMemoryReportStore::default());
        let service = service_with(fetcher.clone(), store.clone());

        let rows = serde_json::to_string(&cached_rows()).unwrap();
        let stale = Utc::now() - chrono::TimeDelta::hours(25);
        let meta = format!(r#"{{"last_updated":"{}"}}"#, stale.to_rfc3339());
        store
            .set_pair([("report:7", rows.as_str()), ("report:7:meta", meta.as_str())], 60)
            .await
            .unwrap();

        let rows = service.get_report(&account()).await.unwrap();

        assert_eq!(rows, fetched_rows());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn invalidate_then_get_reports_absent() {
        let fetcher = CountingFetcher::new();
        let store = Arc::new(InMemoryReportStore::default());
        let service = service_with(fetcher, store.clone());

        ReportCache::new(store).put(7, &cached_rows()).await.unwrap();
        service.invalidate(7).await.unwrap();

        assert!(service.cached_report(7).await.unwrap().is_none());
    }
}
