use crate::config::Config;
use crate::errors::MetrikaError;
use serde::{Deserialize, Serialize};

/// Traffic metrics requested for every statistics query, in a fixed order
/// the shaping code relies on: visits, users, bounce rate, page depth,
/// average visit duration in seconds.
const TRAFFIC_METRICS: &str =
    "ym:s:visits,ym:s:users,ym:s:bounceRate,ym:s:pageDepth,ym:s:avgVisitDurationSeconds";

#[derive(Deserialize, Debug)]
pub struct StatRow {
    pub dimensions: Vec<Dimension>,
    pub metrics: Vec<f64>,
}

#[derive(Deserialize, Debug)]
pub struct Dimension {
    pub name: String,
}

#[derive(Deserialize)]
struct StatResponse {
    #[serde(default)]
    data: Vec<StatRow>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct Counter {
    pub id: u64,
    pub name: String,
    pub site: String,
}

#[derive(Deserialize)]
struct CountersResponse {
    #[serde(default)]
    counters: Vec<RawCounter>,
}

#[derive(Deserialize)]
struct RawCounter {
    id: u64,
    name: Option<String>,
    site: Option<String>,
}

#[derive(Clone)]
pub struct MetrikaClient {
    client: reqwest::Client,
    config: Config,
}

impl MetrikaClient {
    pub fn new(client: reqwest::Client, config: Config) -> Self {
        MetrikaClient { client, config }
    }

    pub fn counter_ids(&self) -> &[u64] {
        &self.config.counters
    }

    fn auth_header(&self) -> String {
        format!("OAuth {}", self.config.token)
    }

    async fn api_error(response: reqwest::Response) -> MetrikaError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        MetrikaError::Api { status, body }
    }

    /// Counters visible to the configured token.
    pub async fn counters(&self) -> Result<Vec<Counter>, MetrikaError> {
        let url = format!(
            "{}/counters",
            self.config.management_url.trim_end_matches('/')
        );
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let counters: CountersResponse = response.json().await?;
        Ok(counters
            .counters
            .into_iter()
            .map(|c| Counter {
                id: c.id,
                name: c.name.unwrap_or_else(|| "unnamed".to_string()),
                site: c.site.unwrap_or_else(|| "not set".to_string()),
            })
            .collect())
    }

    /// Traffic statistics for one counter over a date range, grouped either
    /// per traffic source or additionally per day.
    pub async fn traffic_stats(
        &self,
        counter_id: u64,
        date1: &str,
        date2: &str,
        by_day: bool,
    ) -> Result<Vec<StatRow>, MetrikaError> {
        let counter_id = counter_id.to_string();
        let mut params = vec![
            ("ids", counter_id.as_str()),
            ("date1", date1),
            ("date2", date2),
            ("metrics", TRAFFIC_METRICS),
            ("accuracy", "full"),
        ];
        if by_day {
            params.push(("dimensions", "ym:s:trafficSource,ym:s:date"));
            params.push(("group", "Day"));
            params.push(("limit", "100"));
        } else {
            params.push(("dimensions", "ym:s:trafficSource"));
        }

        let response = self
            .client
            .get(&self.config.stat_url)
            .query(&params)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let stats: StatResponse = response.json().await?;
        Ok(stats.data)
    }
}
