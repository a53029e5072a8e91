use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const DEFAULT_TOKEN_PARAM: &str = "token";
const DEFAULT_RECONNECT_DELAY_MS: u64 = 2_000;

/// Realtime connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Socket endpoint, e.g. "wss://api.example.com/ws/chat/"
    pub url: String,
    /// Query parameter carrying the ephemeral credential
    #[serde(default = "default_token_param")]
    pub token_param: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_token_param() -> String {
    DEFAULT_TOKEN_PARAM.to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

impl TransportConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token_param: default_token_param(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }

    pub fn with_token_param(mut self, param: impl Into<String>) -> Self {
        self.token_param = param.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Socket URL with the credential attached as a query parameter
    pub fn socket_url(&self, token: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.url)?;
        url.query_pairs_mut().append_pair(&self.token_param, token);
        Ok(url)
    }
}
