pub mod client;
pub mod config;
pub mod error;
pub mod traits;

pub use client::HttpChatApi;
pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use traits::ChatApi;
