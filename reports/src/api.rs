use crate::client::ReportClient;
use crate::errors::ReportError;
use crate::negative::NegativeCache;
use crate::parser::ReportRow;
use crate::service::ReportService;
use accounts::{Account, AccountStore};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub service: ReportService,
    pub client: Arc<ReportClient>,
    pub accounts: AccountStore,
    pub negative: Arc<NegativeCache>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/reports/{account_id}", get(get_report))
        .route(
            "/reports/cache/{account_id}",
            get(get_cached_report).delete(delete_cached_report),
        )
        .route("/campaigns/{account_id}", get(get_campaigns))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

#[derive(Serialize)]
struct InvalidatedResponse {
    message: &'static str,
}

async fn health() -> &'static str {
    "ok\n"
}

async fn get_report(
    State(state): State<ApiState>,
    Path(account_id): Path<i64>,
) -> Result<Json<Vec<ReportRow>>, ReportError> {
    let account = authorized_account(&state, account_id).await?;
    let rows = state.service.get_report(&account).await?;
    Ok(Json(rows))
}

async fn get_cached_report(
    State(state): State<ApiState>,
    Path(account_id): Path<i64>,
) -> Result<Response, ReportError> {
    match state.service.cached_report(account_id).await? {
        Some(cached) if cached.is_fresh(Utc::now()) => Ok(Json(cached.rows).into_response()),
        _ => Ok((
            StatusCode::NOT_FOUND,
            Json(ApiErrorResponse {
                error_message: "no cached report for this account".to_string(),
            }),
        )
            .into_response()),
    }
}

async fn delete_cached_report(
    State(state): State<ApiState>,
    Path(account_id): Path<i64>,
) -> Result<Json<InvalidatedResponse>, ReportError> {
    state.service.invalidate(account_id).await?;
    Ok(Json(InvalidatedResponse {
        message: "cache entry removed",
    }))
}

async fn get_campaigns(
    State(state): State<ApiState>,
    Path(account_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ReportError> {
    let account = authorized_account(&state, account_id).await?;
    let payload = state.client.list_campaigns(&account.access_token).await?;
    Ok(Json(payload))
}

/// Resolve the account and require a usable bearer token, remembering
/// rejections for a short while so repeated unauthorized requests skip the
/// store.
async fn authorized_account(state: &ApiState, account_id: i64) -> Result<Account, ReportError> {
    if state.negative.is_unauthorized(account_id) {
        return Err(ReportError::Unauthorized);
    }

    match state.accounts.find(account_id).await? {
        Some(account) if !account.access_token.is_empty() => Ok(account),
        _ => {
            state.negative.mark_unauthorized(account_id);
            Err(ReportError::Unauthorized)
        }
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let status = match self {
            ReportError::Unauthorized => StatusCode::FORBIDDEN,
            ReportError::RemoteApi { .. }
            | ReportError::Timeout { .. }
            | ReportError::Malformed(_)
            | ReportError::CacheUnavailable(_)
            | ReportError::Transport(_)
            | ReportError::Accounts(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match &self {
            ReportError::RemoteApi {
                status: remote_status,
                body,
            } => {
                tracing::error!(status = %remote_status, body, "remote API request failed");
            }
            ReportError::Unauthorized => {}
            other => tracing::error!("{other}"),
        }

        let body = Json(ApiErrorResponse {
            error_message: self.to_string(),
        });

        (status, body).into_response()
    }
}
