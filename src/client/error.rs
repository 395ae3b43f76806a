use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("not found")]
    NotFound,

    #[error("authentication failed")]
    Unauthenticated,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),
}
