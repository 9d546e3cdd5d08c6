use crate::client::{Counter, MetrikaClient};
use crate::errors::MetrikaError;
use crate::store::TrafficStore;
use crate::summary::{self, ChartPoint, TrafficSummary};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone)]
pub struct ApiState {
    pub client: MetrikaClient,
    pub store: TrafficStore,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/metrika/counters", get(counters))
        .route("/metrika/summary", get(traffic_summary))
        .route("/metrika/chart", get(traffic_chart))
        .with_state(state)
}

#[derive(Serialize)]
struct CountersResponse {
    counters: Vec<Counter>,
}

#[derive(Deserialize, Debug)]
struct DateRange {
    date1: Option<String>,
    date2: Option<String>,
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

impl DateRange {
    /// Defaults to the current month, first day through today.
    fn resolve(self) -> (String, String) {
        let today = Utc::now().date_naive();
        let first_of_month = today.with_day(1).unwrap_or(today);
        (
            self.date1.unwrap_or_else(|| first_of_month.to_string()),
            self.date2.unwrap_or_else(|| today.to_string()),
        )
    }
}

async fn counters(State(state): State<ApiState>) -> Result<Json<CountersResponse>, MetrikaError> {
    let counters = state.client.counters().await?;
    Ok(Json(CountersResponse { counters }))
}

/// Per-source traffic summary for every configured counter; each batch is
/// also persisted for later inspection.
async fn traffic_summary(
    State(state): State<ApiState>,
    Query(range): Query<DateRange>,
) -> Result<Json<BTreeMap<u64, Vec<TrafficSummary>>>, MetrikaError> {
    let (date1, date2) = range.resolve();

    let mut results = BTreeMap::new();
    for &counter_id in state.client.counter_ids() {
        let rows = state
            .client
            .traffic_stats(counter_id, &date1, &date2, false)
            .await?;
        let summary = summary::summarize(&rows);
        state.store.save_summary(counter_id, &summary).await?;
        results.insert(counter_id, summary);
    }

    Ok(Json(results))
}

/// Per-day rows for the chart view, chronological within each counter.
async fn traffic_chart(
    State(state): State<ApiState>,
    Query(range): Query<DateRange>,
) -> Result<Json<BTreeMap<u64, Vec<ChartPoint>>>, MetrikaError> {
    let (date1, date2) = range.resolve();

    let mut results = BTreeMap::new();
    for &counter_id in state.client.counter_ids() {
        let rows = state
            .client
            .traffic_stats(counter_id, &date1, &date2, true)
            .await?;
        results.insert(counter_id, summary::chart_points(&rows));
    }

    Ok(Json(results))
}

impl IntoResponse for MetrikaError {
    fn into_response(self) -> Response {
        let status = match self {
            MetrikaError::Api { .. } => StatusCode::BAD_GATEWAY,
            MetrikaError::Transport(_) | MetrikaError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        tracing::error!("{self}");

        let body = Json(ApiErrorResponse {
            error_message: self.to_string(),
        });

        (status, body).into_response()
    }
}
