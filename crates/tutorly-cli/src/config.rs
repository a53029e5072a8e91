use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use tutorly_api::ApiConfig;
use tutorly_chat::{ChatConfig, TransportConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub realtime: TransportConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables, e.g. TUTORLY_API__BASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("TUTORLY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Secrets from ENV only (not in TOML)
        cfg.api.token = Some(std::env::var("TUTORLY_API_TOKEN").map_err(|_| {
            ConfigError::Message("TUTORLY_API_TOKEN environment variable is required".to_string())
        })?);

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [api]
            base_url = "https://api.tutorly.test/api/"

            [realtime]
            url = "wss://api.tutorly.test/ws/chat/"
            reconnect_delay_ms = 500

            [chat]
            page_size = 20

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.timeout_secs, 10);
        assert!(config.api.token.is_none());
        assert_eq!(config.realtime.token_param, "token");
        assert_eq!(config.realtime.reconnect_delay_ms, 500);
        assert_eq!(config.chat.page_size, 20);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_chat_section_is_optional() {
        let toml = r#"
            [api]
            base_url = "http://localhost:8000/api/"

            [realtime]
            url = "ws://localhost:8000/ws/chat/"

            [logging]
            level = "info"
            format = "pretty"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.chat.page_size, 10);
        assert_eq!(config.realtime.reconnect_delay().as_secs(), 2);
    }

    #[test]
    fn test_default_file_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::from_file(path).unwrap();
        assert_eq!(config.chat.page_size, 10);
        assert_eq!(config.logging.level, "info");
    }
}
