use thiserror::Error;
use tutorly_api::ApiError;
use tutorly_realtime::TransportError;
use tutorly_types::ThreadId;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Thread not found: {0}")]
    ThreadNotFound(ThreadId),

    #[error("Thread {0} is locked")]
    ThreadLocked(ThreadId),

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Session already started")]
    AlreadyStarted,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;
