use crate::store::StoreError;
use thiserror::Error;

/// Result type alias for report operations
pub type Result<T, E = ReportError> = std::result::Result<T, E>;

/// Failure kinds of the report pipeline. Foreground callers receive these
/// typed so the handler layer can pick an HTTP status; background refreshes
/// log and absorb them.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The account does not exist or holds no bearer token. Never retried.
    #[error("account is not authorized on the platform")]
    Unauthorized,

    /// The remote service answered with a non-success, non-queued status.
    #[error("remote API returned {status}: {body}")]
    RemoteApi {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Polling attempts were exhausted before the report became ready.
    /// Distinct from `RemoteApi` so operators can tell "slow" from "broken".
    #[error("report was not ready after {attempts} poll attempts")]
    Timeout { attempts: u32 },

    /// The payload did not match the tabular report format.
    #[error("malformed report payload: {0}")]
    Malformed(String),

    #[error("cache store unavailable: {0}")]
    CacheUnavailable(#[from] StoreError),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("account lookup failed: {0}")]
    Accounts(#[from] accounts::AccountError),
}
