use thiserror::Error;
use tutorly_api::ApiError;

use crate::state::ConnectionState;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to obtain socket credential: {0}")]
    Credential(#[from] ApiError),

    #[error("Invalid socket URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Frame encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Cannot send while {0:?}")]
    NotOpen(ConnectionState),

    #[error("Transport already {0:?}")]
    AlreadyActive(ConnectionState),

    #[error("Transport has been closed for this session")]
    TornDown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
