//! The authorization-code exchange: build the consent URL, trade a code for
//! a token pair, and fetch the profile the tokens belong to. Token refresh
//! is deliberately not handled here.

use crate::config::OAuthConfig;
use crate::errors::AccountError;
use serde::Deserialize;

#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug)]
pub struct Profile {
    pub external_id: String,
    pub login: String,
    pub display_name: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct ProfileResponse {
    id: Option<String>,
    #[serde(default)]
    login: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Clone)]
pub struct OAuthClient {
    client: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(client: reqwest::Client, config: OAuthConfig) -> Self {
        OAuthClient { client, config }
    }

    /// URL the browser is sent to for the consent screen.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}",
            self.config.authorize_url, self.config.client_id, self.config.redirect_uri
        )
    }

    /// Exchange an authorization code for a token pair. Both tokens must be
    /// present; the platform issues them together on first consent.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenPair, AccountError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body, "token exchange rejected");
            return Err(AccountError::Exchange { status, body });
        }

        let tokens: TokenResponse = response.json().await?;
        let access_token = tokens
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AccountError::MissingField("access_token"))?;
        let refresh_token = tokens
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(AccountError::MissingField("refresh_token"))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Fetch the platform profile a freshly issued token belongs to.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<Profile, AccountError> {
        let response = self
            .client
            .get(&self.config.profile_url)
            .header("Authorization", format!("OAuth {access_token}"))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body, "profile fetch rejected");
            return Err(AccountError::Profile { status, body });
        }

        let profile: ProfileResponse = response.json().await?;
        let external_id = profile
            .id
            .filter(|id| !id.is_empty())
            .ok_or(AccountError::MissingField("id"))?;

        Ok(Profile {
            external_id,
            login: profile.login,
            display_name: profile.display_name,
        })
    }
}
