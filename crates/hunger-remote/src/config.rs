//! Remote endpoint configuration.

use std::time::Duration;

use reqwest::Client;
use tracing::info;

use hunger_core::{defaults, Error, Result};

/// Configuration shared by the search and annotation clients.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    /// Open Food Facts product search endpoint.
    pub off_search_url: String,
    /// By-identifier product endpoint base.
    pub off_product_url: String,
    /// Robotoff API base URL.
    pub robotoff_url: String,
    /// Language for question text.
    pub lang: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            off_search_url: defaults::OFF_SEARCH_URL.to_string(),
            off_product_url: defaults::OFF_PRODUCT_URL.to_string(),
            robotoff_url: defaults::ROBOTOFF_URL.to_string(),
            lang: defaults::LANG.to_string(),
            timeout_seconds: defaults::HTTP_TIMEOUT_SECS,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

impl RemoteConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OFF_SEARCH_URL` | `https://world.openfoodfacts.org/cgi/search.pl` |
    /// | `OFF_PRODUCT_URL` | `https://fr.openfoodfacts.org/api/v3/product` |
    /// | `ROBOTOFF_API_URL` | `https://robotoff.openfoodfacts.org/api/v1` |
    /// | `HUNGER_LANG` | `en` |
    /// | `HUNGER_HTTP_TIMEOUT` | `30` |
    /// | `HUNGER_USER_AGENT` | `hunger-games-rs/<version>` |
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            off_search_url: std::env::var("OFF_SEARCH_URL").unwrap_or(base.off_search_url),
            off_product_url: std::env::var("OFF_PRODUCT_URL").unwrap_or(base.off_product_url),
            robotoff_url: std::env::var("ROBOTOFF_API_URL").unwrap_or(base.robotoff_url),
            lang: std::env::var("HUNGER_LANG").unwrap_or(base.lang),
            timeout_seconds: std::env::var("HUNGER_HTTP_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.timeout_seconds),
            user_agent: std::env::var("HUNGER_USER_AGENT").unwrap_or(base.user_agent),
        }
    }

    /// Point every endpoint at one base URL (mock servers, staging).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        self.off_search_url = format!("{base}/cgi/search.pl");
        self.off_product_url = format!("{base}/api/v3/product");
        self.robotoff_url = format!("{base}/api/v1");
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Build the shared HTTP client.
    pub(crate) fn build_client(&self) -> Result<Client> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            search = %self.off_search_url,
            robotoff = %self.robotoff_url,
            timeout_seconds = self.timeout_seconds,
            "Initializing remote client"
        );
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_public_endpoints() {
        let config = RemoteConfig::default();
        assert!(config.off_search_url.starts_with("https://world.openfoodfacts.org"));
        assert!(config.robotoff_url.ends_with("/api/v1"));
        assert_eq!(config.lang, "en");
        assert_eq!(config.timeout_seconds, defaults::HTTP_TIMEOUT_SECS);
    }

    #[test]
    fn test_with_base_url_rewrites_all_endpoints() {
        let config = RemoteConfig::default().with_base_url("http://127.0.0.1:9000/");
        assert_eq!(config.off_search_url, "http://127.0.0.1:9000/cgi/search.pl");
        assert_eq!(config.off_product_url, "http://127.0.0.1:9000/api/v3/product");
        assert_eq!(config.robotoff_url, "http://127.0.0.1:9000/api/v1");
    }

    #[test]
    fn test_builder_chaining() {
        let config = RemoteConfig::default().with_lang("fr").with_timeout(5);
        assert_eq!(config.lang, "fr");
        assert_eq!(config.timeout_seconds, 5);
    }

    #[test]
    fn test_build_client() {
        assert!(RemoteConfig::default().build_client().is_ok());
    }
}
