use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("token exchange failed with {status}: {body}")]
    Exchange {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("profile fetch failed with {status}: {body}")]
    Profile {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("platform response is missing the `{0}` field")]
    MissingField(&'static str),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
