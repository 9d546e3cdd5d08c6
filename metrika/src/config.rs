use serde::Deserialize;

/// Analytics API access. The token is an application-level OAuth token; the
/// counters are the site counters this installation reports on.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub token: String,
    pub counters: Vec<u64>,
    #[serde(default = "default_stat_url")]
    pub stat_url: String,
    #[serde(default = "default_management_url")]
    pub management_url: String,
}

fn default_stat_url() -> String {
    "https://api-metrika.yandex.net/stat/v1/data".to_string()
}

fn default_management_url() -> String {
    "https://api-metrika.yandex.net/management/v1".to_string()
}
