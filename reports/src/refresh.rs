//! Background refresh of cached reports. Two flavors share the same
//! fetch-and-store path: a per-hit queue drained by a worker task inside the
//! serving process, and a periodic sweep over every authorized account run
//! by the dedicated refresh-worker process.

use crate::metrics_defs::{REFRESH_FAILED, REFRESH_OK, REFRESH_QUEUE_FULL};
use crate::service::ReportService;
use accounts::{Account, AccountStore};
use shared::counter;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

const QUEUE_SIZE: usize = 64;

/// Handle the service uses to hand a refresh job to the worker without
/// waiting on it.
#[derive(Clone)]
pub struct RefreshQueue {
    tx: mpsc::Sender<Account>,
}

impl RefreshQueue {
    pub fn new() -> (Self, mpsc::Receiver<Account>) {
        let (tx, rx) = mpsc::channel(QUEUE_SIZE);
        (RefreshQueue { tx }, rx)
    }

    /// Enqueue without blocking. A full queue drops the job: the cached copy
    /// keeps being served and the next hit enqueues again.
    pub fn submit(&self, account: Account) {
        let account_id = account.id;
        if self.tx.try_send(account).is_err() {
            counter!(REFRESH_QUEUE_FULL).increment(1);
            tracing::warn!(account_id, "refresh queue full, dropping job");
        }
    }
}

/// Drain refresh jobs until every queue handle is gone. Failures are logged
/// and absorbed; the requester already has its response.
pub async fn run_refresh_worker(mut rx: mpsc::Receiver<Account>, service: ReportService) {
    while let Some(account) = rx.recv().await {
        match service.fetch_and_store(&account).await {
            Ok(rows) => {
                counter!(REFRESH_OK).increment(1);
                tracing::info!(
                    account_id = account.id,
                    rows = rows.len(),
                    "report cache refreshed"
                );
            }
            Err(err) => {
                counter!(REFRESH_FAILED).increment(1);
                tracing::error!(account_id = account.id, "background refresh failed: {err}");
            }
        }
    }
}

/// Rebuild the cache entry of every authorized account on a fixed interval.
/// Per-account failures are logged and the sweep moves on.
pub async fn run_scheduled_refresh(
    service: ReportService,
    accounts: AccountStore,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let authorized = match accounts.list_authorized().await {
            Ok(accounts) => accounts,
            Err(err) => {
                tracing::error!("could not list accounts for the refresh sweep: {err}");
                continue;
            }
        };

        tracing::info!(count = authorized.len(), "starting report refresh sweep");
        for account in authorized {
            match service.fetch_and_store(&account).await {
                Ok(_) => counter!(REFRESH_OK).increment(1),
                Err(err) => {
                    counter!(REFRESH_FAILED).increment(1);
                    tracing::error!(account_id = account.id, "scheduled refresh failed: {err}");
                }
            }
        }
    }
}
