use serde::Deserialize;

/// OAuth application settings for the platform login exchange. Endpoint
/// defaults point at the platform's public OAuth service; tests and
/// self-hosted installations override them.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_profile_url")]
    pub profile_url: String,
}

fn default_authorize_url() -> String {
    "https://oauth.yandex.ru/authorize".to_string()
}

fn default_token_url() -> String {
    "https://oauth.yandex.ru/token".to_string()
}

fn default_profile_url() -> String {
    "https://login.yandex.ru/info".to_string()
}
