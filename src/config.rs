use serde::Deserialize;
use std::path::Path;

use crate::clock::ClockFormat;
use crate::partition::BucketLayout;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub layout: BucketLayout,
    #[serde(default)]
    pub clock: ClockFormat,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_database_url() -> String {
    "sqlite:headline_desk.db?mode=rwc".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub country: Option<String>,
    /// Upper bound on articles per request, sent as `max`
    #[serde(default)]
    pub max_articles: Option<u32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_endpoint() -> String {
    "https://gnews.io/api/v4/top-headlines".to_string()
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_api_key_env() -> String {
    "GNEWS_API_KEY".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            lang: default_lang(),
            country: None,
            max_articles: None,
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl ProviderConfig {
    /// Reads the API token from the configured environment variable.
    pub fn api_key(&self) -> anyhow::Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => anyhow::bail!(
                "environment variable {} must hold the news provider API key",
                self.api_key_env
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Freshness window in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{WeekdayStyle, YearStyle};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.database_url, "sqlite:headline_desk.db?mode=rwc");
        assert_eq!(config.provider.endpoint, "https://gnews.io/api/v4/top-headlines");
        assert_eq!(config.provider.lang, "en");
        assert_eq!(config.provider.api_key_env, "GNEWS_API_KEY");
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.cache.retry_attempts, 2);
        assert_eq!(config.layout.important, 3);
        assert_eq!(config.layout.latest, 4);
        assert_eq!(config.clock.weekday, WeekdayStyle::Long);
        assert!(!config.clock.hour12);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            bind_address = "127.0.0.1:8080"
            database_url = "sqlite:prefs.db?mode=rwc"

            [provider]
            endpoint = "http://localhost:9000/top-headlines"
            lang = "de"
            country = "at"
            max_articles = 25
            timeout_secs = 3

            [cache]
            ttl_secs = 60
            retry_attempts = 0

            [layout]
            important = 2
            latest = 5

            [clock]
            weekday = "short"
            year = "2-digit"
            hour12 = true
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert_eq!(config.provider.endpoint, "http://localhost:9000/top-headlines");
        assert_eq!(config.provider.lang, "de");
        assert_eq!(config.provider.country.as_deref(), Some("at"));
        assert_eq!(config.provider.max_articles, Some(25));
        assert_eq!(config.provider.timeout_secs, 3);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.retry_attempts, 0);
        assert_eq!(config.cache.retry_backoff_ms, 500); // Default value
        assert_eq!(config.layout.important, 2);
        assert_eq!(config.layout.latest, 5);
        assert_eq!(config.clock.weekday, WeekdayStyle::Short);
        assert_eq!(config.clock.year, YearStyle::TwoDigit);
        assert!(config.clock.hour12);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_clock_option_is_rejected() {
        let content = r#"
            [clock]
            weekday = "medium"
        "#;

        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_api_key_from_environment() {
        let provider = ProviderConfig {
            api_key_env: "HEADLINE_DESK_TEST_KEY_PRESENT".to_string(),
            ..ProviderConfig::default()
        };
        std::env::set_var("HEADLINE_DESK_TEST_KEY_PRESENT", "secret-token");

        assert_eq!(provider.api_key().unwrap(), "secret-token");
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let provider = ProviderConfig {
            api_key_env: "HEADLINE_DESK_TEST_KEY_ABSENT".to_string(),
            ..ProviderConfig::default()
        };

        let err = provider.api_key().unwrap_err();
        assert!(err.to_string().contains("HEADLINE_DESK_TEST_KEY_ABSENT"));
    }
}
