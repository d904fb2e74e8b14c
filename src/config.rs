use dotenvy::dotenv;
use once_cell::sync::Lazy;
use reqwest::Url;
use std::env;
use std::time::Duration;

pub const DEFAULT_SERVER_HOST: &str = "http://localhost:8000";
pub const DEFAULT_ENDPOINT: &str = "/hybrid_search";
pub const DEFAULT_TIMEOUT_SECS: &str = "30";

/// Raw values from the environment (and `.env`, if present).
pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        server_host: get_env_or_default("SEARCH_SERVER_HOST", DEFAULT_SERVER_HOST),
        endpoint: get_env_or_default("SEARCH_ENDPOINT", DEFAULT_ENDPOINT),
        timeout_secs: get_env_or_default("SEARCH_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
    }
});

pub struct Config {
    pub server_host: String,
    pub endpoint: String,
    pub timeout_secs: String,
}

/// Validated settings the search client runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_host: Url,
    pub endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid search server url {value:?}: {reason}")]
    InvalidServer { value: String, reason: String },

    #[error("invalid timeout {0:?}, expected a whole number of seconds")]
    InvalidTimeout(String),
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server_host: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn resolve(&self, overrides: &Overrides) -> Result<ClientSettings, ConfigError> {
        let server = overrides.server_host.as_deref().unwrap_or(&self.server_host);
        let server_host = Url::parse(server).map_err(|e| ConfigError::InvalidServer {
            value: server.to_string(),
            reason: e.to_string(),
        })?;
        if server_host.cannot_be_a_base() {
            return Err(ConfigError::InvalidServer {
                value: server.to_string(),
                reason: "not a base url".to_string(),
            });
        }

        let endpoint = overrides.endpoint.as_deref().unwrap_or(&self.endpoint);
        let endpoint = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{endpoint}")
        };

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => secs,
            None => self
                .timeout_secs
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(self.timeout_secs.clone()))?,
        };

        Ok(ClientSettings {
            server_host,
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
fn sample() -> Config {
    Config {
        server_host: "http://search.internal:9000".to_string(),
        endpoint: "hybrid_search".to_string(),
        timeout_secs: "5".to_string(),
    }
}

#[test]
fn test_resolve_uses_environment_values() {
    let settings = sample().resolve(&Overrides::default()).unwrap();
    assert_eq!(settings.server_host.as_str(), "http://search.internal:9000/");
    assert_eq!(settings.endpoint, "/hybrid_search");
    assert_eq!(settings.timeout, Duration::from_secs(5));
}

#[test]
fn test_resolve_prefers_overrides() {
    let overrides = Overrides {
        server_host: Some("https://example.org".to_string()),
        endpoint: Some("/v2/search".to_string()),
        timeout_secs: Some(1),
    };
    let settings = sample().resolve(&overrides).unwrap();
    assert_eq!(settings.server_host.host_str(), Some("example.org"));
    assert_eq!(settings.endpoint, "/v2/search");
    assert_eq!(settings.timeout, Duration::from_secs(1));
}

#[test]
fn test_resolve_rejects_bad_values() {
    let mut config = sample();
    config.timeout_secs = "soon".to_string();
    assert!(matches!(
        config.resolve(&Overrides::default()),
        Err(ConfigError::InvalidTimeout(_))
    ));

    let overrides = Overrides {
        server_host: Some("not a url".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        sample().resolve(&overrides),
        Err(ConfigError::InvalidServer { .. })
    ));
}
