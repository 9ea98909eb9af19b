use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,
    /// Ignore proxy settings from the environment
    pub no_proxy: bool,
    pub request_timeout_seconds: u64,
    /// Upper bound on a single refresh call. `0` disables the bound.
    pub refresh_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory holding the session database
    pub data_dir: String,
    /// Where the client is sent when the session cannot be renewed
    pub signin_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            no_proxy: false,
            request_timeout_seconds: 10,
            refresh_timeout_seconds: 15,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            signin_path: "/signin".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let base_url = std::env::var("API_URL").unwrap_or(defaults.base_url);

        let no_proxy = std::env::var("API_NO_PROXY")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.no_proxy);

        let request_timeout_seconds = std::env::var("REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.request_timeout_seconds);

        let refresh_timeout_seconds = std::env::var("REFRESH_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.refresh_timeout_seconds);

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let signin_path = std::env::var("SIGNIN_PATH").unwrap_or_else(|_| "/signin".to_string());

        let config = Config {
            api: ApiConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                no_proxy,
                request_timeout_seconds,
                refresh_timeout_seconds,
            },
            session: SessionConfig {
                data_dir,
                signin_path,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::ValidationError(format!("API_URL is not a valid URL: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "API_URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.session.data_dir.is_empty() {
            return Err(ConfigError::ValidationError(
                "DATA_DIR cannot be empty".to_string(),
            ));
        }

        if !self.session.signin_path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "SIGNIN_PATH must be an absolute path".to_string(),
            ));
        }

        if self.api.request_timeout_seconds == 0 {
            tracing::warn!("REQUEST_TIMEOUT_SECONDS is 0; requests will never time out");
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.api.request_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Bound applied to each refresh call, if any.
    pub fn refresh_timeout(&self) -> Option<Duration> {
        match self.api.refresh_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_config;

    #[test]
    fn test_default_config_is_valid() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let mut config = test_config();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_relative_signin_path() {
        let mut config = test_config();
        config.session.signin_path = "signin".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_refresh_timeout_disables_bound() {
        let mut config = test_config();
        config.api.refresh_timeout_seconds = 0;
        assert!(config.refresh_timeout().is_none());

        config.api.refresh_timeout_seconds = 15;
        assert_eq!(config.refresh_timeout(), Some(Duration::from_secs(15)));
    }
}
