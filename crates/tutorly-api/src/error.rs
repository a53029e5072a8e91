use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid API token format")]
    InvalidToken,
}

impl ApiError {
    /// True for errors produced by the server answering with a non-2xx status
    pub fn is_status(&self) -> bool {
        matches!(self, ApiError::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
