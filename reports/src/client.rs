//! Client for the remote reporting API. Report generation is asynchronous on
//! the server side: a submission either returns the finished tabular payload
//! right away or a queued status carrying the delay to wait before asking
//! again. The client re-issues the identical request until the report is
//! ready, a bounded number of times.

use crate::config::DirectApi;
use crate::errors::ReportError;
use crate::metrics_defs::REPORT_POLL_ATTEMPTS;
use crate::parser::{self, ReportRow};
use chrono::Utc;
use reqwest::{Response, StatusCode};
use serde::Serialize;
use shared::histogram;
use tokio::time::{Duration, sleep};

/// Poll attempts after the initial submission.
const MAX_POLL_ATTEMPTS: u32 = 20;
/// Wait between polls when the server does not dictate one.
const DEFAULT_RETRY_SECS: u64 = 60;
/// Server-supplied retry delay, in seconds.
const RETRY_HEADER: &str = "retryIn";
/// Server-side identifier of the queued report, logged for correlation.
const QUEUE_TOKEN_HEADER: &str = "RequestId";

const REPORT_FIELDS: &[&str] = &[
    "CampaignId",
    "Date",
    "CampaignName",
    "Impressions",
    "Clicks",
    "Cost",
    "BounceRate",
    "SessionDepth",
];

#[derive(Serialize)]
struct ReportRequest {
    params: ReportSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ReportSpec {
    report_name: String,
    selection_criteria: EmptySelection,
    field_names: Vec<String>,
    report_type: String,
    date_range_type: String,
    format: String,
    #[serde(rename = "IncludeVAT")]
    include_vat: String,
    include_discount: String,
}

#[derive(Serialize)]
struct EmptySelection {}

#[derive(Serialize)]
struct ApiCall {
    method: &'static str,
    params: serde_json::Value,
}

pub struct ReportClient {
    client: reqwest::Client,
    reports_url: String,
    campaigns_url: String,
    language: String,
}

impl ReportClient {
    /// The transport client is shared process-wide; construct it once at
    /// startup and clone it into every component.
    pub fn new(client: reqwest::Client, config: &DirectApi) -> Self {
        let base = config.base_url.as_str().trim_end_matches('/');
        ReportClient {
            client,
            reports_url: format!("{base}/reports"),
            campaigns_url: format!("{base}/campaigns"),
            language: config.language.clone(),
        }
    }

    /// A fresh report specification per fetch; the name is timestamped the
    /// way the platform expects report names to be unique per client.
    fn report_spec() -> ReportRequest {
        ReportRequest {
            params: ReportSpec {
                report_name: format!("report_{}", Utc::now().format("%Y%m%d%H%M%S")),
                selection_criteria: EmptySelection {},
                field_names: REPORT_FIELDS.iter().map(|f| (*f).to_string()).collect(),
                report_type: "CAMPAIGN_PERFORMANCE_REPORT".to_string(),
                date_range_type: "LAST_30_DAYS".to_string(),
                format: "TSV".to_string(),
                include_vat: "NO".to_string(),
                include_discount: "NO".to_string(),
            },
        }
    }

    async fn submit(
        &self,
        token: &str,
        login: &str,
        body: &ReportRequest,
    ) -> Result<Response, reqwest::Error> {
        self.client
            .post(&self.reports_url)
            .bearer_auth(token)
            .header("Client-Login", login)
            .header("Accept-Language", &self.language)
            .header("processingMode", "auto")
            .json(body)
            .send()
            .await
    }

    fn retry_delay(response: &Response) -> Duration {
        let secs = response
            .headers()
            .get(RETRY_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_RETRY_SECS);
        Duration::from_secs(secs)
    }

    fn is_queued(status: StatusCode) -> bool {
        status == StatusCode::CREATED || status == StatusCode::ACCEPTED
    }

    async fn remote_error(response: Response) -> ReportError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ReportError::RemoteApi { status, body }
    }

    /// Fetch the 30-day campaign performance report for an account. Exactly
    /// one network request per attempt; at most 1 + `MAX_POLL_ATTEMPTS`
    /// requests per call.
    pub async fn fetch_report(
        &self,
        token: &str,
        login: &str,
    ) -> Result<Vec<ReportRow>, ReportError> {
        let body = Self::report_spec();

        let response = self.submit(token, login, &body).await?;
        let status = response.status();
        if status == StatusCode::OK {
            return parser::parse(&response.text().await?);
        }
        if !Self::is_queued(status) {
            return Err(Self::remote_error(response).await);
        }

        let request_id = response
            .headers()
            .get(QUEUE_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let mut delay = Self::retry_delay(&response);
        tracing::info!(%request_id, delay_secs = delay.as_secs(), "report queued, polling");

        for attempt in 1..=MAX_POLL_ATTEMPTS {
            sleep(delay).await;

            let response = self.submit(token, login, &body).await?;
            let status = response.status();
            if status == StatusCode::OK {
                histogram!(REPORT_POLL_ATTEMPTS).record(f64::from(attempt));
                return parser::parse(&response.text().await?);
            }
            if Self::is_queued(status) {
                delay = Self::retry_delay(&response);
                tracing::debug!(
                    %request_id,
                    attempt,
                    delay_secs = delay.as_secs(),
                    "report still queued"
                );
            } else {
                return Err(Self::remote_error(response).await);
            }
        }

        Err(ReportError::Timeout {
            attempts: MAX_POLL_ATTEMPTS,
        })
    }

    /// Pass-through listing of the account's campaigns.
    pub async fn list_campaigns(&self, token: &str) -> Result<serde_json::Value, ReportError> {
        let body = ApiCall {
            method: "get",
            params: serde_json::json!({
                "SelectionCriteria": {},
                "FieldNames": ["Id", "Name", "Status"],
            }),
        };

        let response = self
            .client
            .post(&self.campaigns_url)
            .bearer_auth(token)
            .header("Accept-Language", &self.language)
            .json(&body)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::remote_error(response).await);
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TSV_BODY: &str =
        "banner\nCampaignId\tClicks\n1\t10\n2\t3\nTotal\t13";

    fn client_for(server: &MockServer) -> ReportClient {
        let config = crate::config::DirectApi {
            base_url: url::Url::parse(&server.uri()).unwrap(),
            language: "ru".to_string(),
        };
        ReportClient::new(reqwest::Client::new(), &config)
    }

    #[tokio::test]
    async fn immediate_report_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reports"))
            .and(header("Client-Login", "shop"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TSV_BODY))
            .mount(&server)
            .await;

        let rows = client_for(&server)
            .fetch_report("token", "shop")
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["CampaignId"], "1");
        assert_eq!(rows[1]["Clicks"], "3");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn poll_loop_is_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reports"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("retryIn", "0")
                    .insert_header("RequestId", "q-1"),
            )
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_report("token", "shop").await;

        assert!(matches!(
            result,
            Err(ReportError::Timeout { attempts: 20 })
        ));
        // One submission plus the maximum number of polls, never more.
        assert_eq!(server.received_requests().await.unwrap().len(), 21);
    }

    #[tokio::test(start_paused = true)]
    async fn server_supplied_retry_delay_is_honored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reports"))
            .respond_with(ResponseTemplate::new(202).insert_header("retryIn", "5"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/reports"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TSV_BODY))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let started = tokio::time::Instant::now();
        let rows = client.fetch_report("token", "shop").await.unwrap();

        assert_eq!(rows.len(), 2);
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn error_status_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reports"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad field list"))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_report("token", "shop").await;

        match result {
            Err(ReportError::RemoteApi { status, body }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body, "bad field list");
            }
            other => panic!("expected RemoteApi error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_during_polling_stops_the_loop() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reports"))
            .respond_with(ResponseTemplate::new(202).insert_header("retryIn", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/reports"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_report("token", "shop").await;

        assert!(matches!(result, Err(ReportError::RemoteApi { .. })));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn campaigns_pass_through_returns_remote_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/campaigns"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": { "Campaigns": [{ "Id": 1, "Name": "spring", "Status": "ON" }] }
            })))
            .mount(&server)
            .await;

        let payload = client_for(&server).list_campaigns("token").await.unwrap();

        assert_eq!(payload["result"]["Campaigns"][0]["Name"], "spring");
    }
}
