//! Cached reports keyed by account id. Two co-keyed values are stored per
//! account: the serialized rows and a metadata record with the last-updated
//! timestamp. Freshness is always computed at read time from the stored
//! timestamp, never persisted as a flag.

use crate::errors::ReportError;
use crate::parser::ReportRow;
use crate::store::ReportStore;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How long a cached report is served without a synchronous refetch.
const FRESHNESS_WINDOW_HOURS: i64 = 24;

/// Physical retention in the backing store. Enforced by the store itself,
/// which decouples "stale for serving" from "gone".
const RETENTION_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Serialize, Deserialize, Debug)]
struct CacheMeta {
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CachedReport {
    pub rows: Vec<ReportRow>,
    pub last_updated: DateTime<Utc>,
}

impl CachedReport {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.last_updated < TimeDelta::hours(FRESHNESS_WINDOW_HOURS)
    }
}

#[derive(Clone)]
pub struct ReportCache {
    store: Arc<dyn ReportStore>,
}

impl ReportCache {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        ReportCache { store }
    }

    fn rows_key(account_id: i64) -> String {
        format!("report:{account_id}")
    }

    fn meta_key(account_id: i64) -> String {
        format!("report:{account_id}:meta")
    }

    pub async fn get(&self, account_id: i64) -> Result<Option<CachedReport>, ReportError> {
        let rows = self.store.get(&Self::rows_key(account_id)).await?;
        let meta = self.store.get(&Self::meta_key(account_id)).await?;

        let (Some(rows), Some(meta)) = (rows, meta) else {
            return Ok(None);
        };

        let rows: Vec<ReportRow> = serde_json::from_str(&rows)
            .map_err(|e| ReportError::Malformed(format!("cached rows are not valid JSON: {e}")))?;
        let meta: CacheMeta = serde_json::from_str(&meta)
            .map_err(|e| ReportError::Malformed(format!("cache metadata is not valid JSON: {e}")))?;

        Ok(Some(CachedReport {
            rows,
            last_updated: meta.last_updated,
        }))
    }

    /// Overwrite the entry for an account. Rows and timestamp go through one
    /// combined store write so a reader never sees one without the other.
    pub async fn put(&self, account_id: i64, rows: &[ReportRow]) -> Result<(), ReportError> {
        let payload = serde_json::to_string(rows)
            .map_err(|e| ReportError::Malformed(format!("could not encode rows: {e}")))?;
        let meta = serde_json::to_string(&CacheMeta {
            last_updated: Utc::now(),
        })
        .map_err(|e| ReportError::Malformed(format!("could not encode metadata: {e}")))?;

        self.store
            .set_pair(
                [
                    (Self::rows_key(account_id).as_str(), payload.as_str()),
                    (Self::meta_key(account_id).as_str(), meta.as_str()),
                ],
                RETENTION_TTL_SECS,
            )
            .await?;
        Ok(())
    }

    pub async fn invalidate(&self, account_id: i64) -> Result<(), ReportError> {
        self.store
            .delete(&[
                Self::rows_key(account_id).as_str(),
                Self::meta_key(account_id).as_str(),
            ])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryReportStore;
    use indexmap::IndexMap;

    fn sample_rows() -> Vec<ReportRow> {
        vec![
            IndexMap::from_iter([
                ("CampaignId".to_string(), "1".to_string()),
                ("Clicks".to_string(), "10".to_string()),
            ]),
            IndexMap::from_iter([
                ("CampaignId".to_string(), "2".to_string()),
                ("Clicks".to_string(), "3".to_string()),
            ]),
        ]
    }

    fn cache() -> ReportCache {
        ReportCache::new(Arc::new(InMemoryReportStore::default()))
    }

    #[tokio::test]
    async fn put_then_get_round_trips_in_order() {
        let cache = cache();
        let rows = sample_rows();

        cache.put(5, &rows).await.unwrap();
        let cached = cache.get(5).await.unwrap().expect("entry present");

        assert_eq!(cached.rows, rows);
        assert!(cached.is_fresh(Utc::now()));
    }

    #[tokio::test]
    async fn invalidate_removes_the_entry() {
        let cache = cache();
        cache.put(5, &sample_rows()).await.unwrap();

        cache.invalidate(5).await.unwrap();

        assert!(cache.get(5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_meta_counts_as_absent() {
        let store = Arc::new(InMemoryReportStore::default());
        let cache = ReportCache::new(store.clone());
        cache.put(5, &sample_rows()).await.unwrap();

        store.delete(&["report:5:meta"]).await.unwrap();

        assert!(cache.get(5).await.unwrap().is_none());
    }

    #[test]
    fn freshness_boundary_is_twenty_four_hours() {
        let written_at = Utc::now();
        let entry = CachedReport {
            rows: sample_rows(),
            last_updated: written_at,
        };

        let just_inside = written_at + TimeDelta::hours(23) + TimeDelta::minutes(59);
        let just_outside = written_at + TimeDelta::hours(24) + TimeDelta::minutes(1);

        assert!(entry.is_fresh(just_inside));
        assert!(!entry.is_fresh(just_outside));
    }
}
