//! Client configuration
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the admissions API (without the `/v1` prefix)
    pub api_base_url: String,
    /// Bearer token sent with every request, if any
    pub api_token: Option<String>,
    /// Overall request timeout; `None` leaves it to the HTTP client
    pub request_timeout: Option<Duration>,
    /// Grace period between a successful submit and navigating away
    pub navigation_delay: Duration,
    /// Largest attachment the upload hints accept, in bytes
    pub max_upload_size: usize,
    /// Environment (development/production)
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            api_token: None,
            request_timeout: None,
            navigation_delay: Duration::from_millis(1500),
            max_upload_size: 10 * 1024 * 1024,
            environment: Environment::Development,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let environment = match lookup("ENVIRONMENT")
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        let api_base_url = lookup("API_BASE_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "API_BASE_URL must start with http:// or https:// (got '{}')",
                api_base_url
            )));
        }

        let request_timeout = parse_number::<u64>(&lookup, "REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs);
        let navigation_delay = parse_number::<u64>(&lookup, "NAVIGATION_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.navigation_delay);
        let max_upload_size =
            parse_number::<usize>(&lookup, "MAX_UPLOAD_SIZE")?.unwrap_or(defaults.max_upload_size);

        Ok(Config {
            api_base_url,
            api_token: lookup("API_TOKEN").filter(|t| !t.trim().is_empty()),
            request_timeout,
            navigation_delay,
            max_upload_size,
            environment,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{} must be a number (got '{}')", key, raw))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000/api");
        assert_eq!(config.navigation_delay, Duration::from_millis(1500));
        assert!(config.request_timeout.is_none());
        assert!(config.api_token.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("API_BASE_URL", "https://portal.example.org/api/"),
            ("API_TOKEN", "secret"),
            ("REQUEST_TIMEOUT_SECS", "30"),
            ("NAVIGATION_DELAY_MS", "0"),
            ("ENVIRONMENT", "prod"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://portal.example.org/api");
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.navigation_delay, Duration::ZERO);
        assert!(config.is_production());
    }

    #[test]
    fn test_invalid_number() {
        let result = Config::from_lookup(lookup_from(&[("NAVIGATION_DELAY_MS", "soon")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = Config::from_lookup(lookup_from(&[("API_BASE_URL", "localhost:8000")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
