use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetrikaError {
    #[error("analytics API returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
