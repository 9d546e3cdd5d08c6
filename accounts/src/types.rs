use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A connected platform account. Tokens never leave the process through the
/// API; they are only forwarded to the platform itself.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: i64,
    pub external_id: String,
    pub login: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
}

/// Profile and tokens as delivered by a completed login exchange.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub external_id: String,
    pub login: String,
    pub display_name: String,
    pub access_token: String,
    pub refresh_token: String,
}
