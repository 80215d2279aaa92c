use std::{convert::Infallible, ops::Deref, str::FromStr, time::Duration};

use envconfig::Envconfig;
use thiserror::Error;

/// Timeout for establishing a store connection unless configured otherwise
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Immutable connection settings of a [`crate::KvSink`].
///
/// Can be built in code with [`SinkConfig::new`] or read from the environment
/// with [`SinkConfig::from_env`].
#[derive(Envconfig, Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Comma separated URLs of the store endpoints, tried in order
    #[envconfig(from = "SLUICE_KV_BOOTSTRAP_URLS")]
    bootstrap_urls: BootstrapUrls,

    /// Name of the store all fields are written to
    #[envconfig(from = "SLUICE_KV_STORE")]
    store: String,

    /// Timeout for connecting to an endpoint in milliseconds
    #[envconfig(from = "SLUICE_KV_CONNECT_TIMEOUT_MS", default = "5000")]
    connect_timeout_ms: u64,
}

impl SinkConfig {
    /// Create a config from its parts. The config is not validated until
    /// the sink is initialized.
    pub fn new(
        bootstrap_urls: Vec<String>,
        store: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            bootstrap_urls: BootstrapUrls(bootstrap_urls),
            store: store.into(),
            connect_timeout_ms: connect_timeout.as_millis().try_into().unwrap_or(u64::MAX),
        }
    }

    /// Read the config from the `SLUICE_KV_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::init_from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Check all settings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bootstrap_urls.is_empty() {
            return Err(ConfigError::NoBootstrapUrl);
        }
        if self.bootstrap_urls.iter().any(|u| u.trim().is_empty()) {
            return Err(ConfigError::EmptyBootstrapUrl);
        }
        if self.store.trim().is_empty() {
            return Err(ConfigError::EmptyStore);
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Endpoint URLs in the order they are tried
    pub fn bootstrap_urls(&self) -> &[String] {
        &self.bootstrap_urls
    }

    /// Name of the target store
    pub fn store(&self) -> &str {
        &self.store
    }

    /// Timeout for connecting to a single endpoint
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// List of endpoint URLs, parsed from a comma separated string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapUrls(Vec<String>);

impl FromStr for BootstrapUrls {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(
            s.split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from)
                .collect(),
        ))
    }
}

impl Deref for BootstrapUrls {
    type Target = [String];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Invalid sink configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Not a single endpoint was given
    #[error("At least one bootstrap URL is required")]
    NoBootstrapUrl,
    /// One of the endpoints is an empty string
    #[error("Bootstrap URLs must not be empty")]
    EmptyBootstrapUrl,
    /// The store name is empty
    #[error("Store name must not be empty")]
    EmptyStore,
    /// Connecting could never succeed
    #[error("Connect timeout must be greater than zero")]
    ZeroTimeout,
    /// Environment variables are missing or can not be parsed
    #[error("Failed to read config from environment")]
    Env(#[from] envconfig::Error),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_url_list() {
        let urls: BootstrapUrls = " redis://a:6379 ,,redis://b:6379,".parse().unwrap();
        assert_eq!(&*urls, &["redis://a:6379", "redis://b:6379"]);
    }

    #[test]
    fn from_environment() {
        let config = SinkConfig::init_from_hashmap(&env(&[
            ("SLUICE_KV_BOOTSTRAP_URLS", "redis://a:6379,redis://b:6379"),
            ("SLUICE_KV_STORE", "scores"),
        ]))
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.bootstrap_urls(), &["redis://a:6379", "redis://b:6379"]);
        assert_eq!(config.store(), "scores");
        assert_eq!(config.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn missing_store_in_environment() {
        let err = SinkConfig::init_from_hashmap(&env(&[(
            "SLUICE_KV_BOOTSTRAP_URLS",
            "redis://a:6379",
        )]))
        .unwrap_err();
        assert!(matches!(err, envconfig::Error::EnvVarMissing { name: "SLUICE_KV_STORE" }));
    }

    #[test]
    fn empty_url_list_is_invalid() {
        let config = SinkConfig::init_from_hashmap(&env(&[
            ("SLUICE_KV_BOOTSTRAP_URLS", " , "),
            ("SLUICE_KV_STORE", "scores"),
        ]))
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::NoBootstrapUrl)));
    }

    #[test]
    fn validation() {
        let ok = SinkConfig::new(vec!["mem://a".into()], "s", DEFAULT_CONNECT_TIMEOUT);
        assert!(ok.validate().is_ok());

        let no_url = SinkConfig::new(vec![], "s", DEFAULT_CONNECT_TIMEOUT);
        assert!(matches!(no_url.validate(), Err(ConfigError::NoBootstrapUrl)));

        let blank_url = SinkConfig::new(
            vec!["mem://a".into(), " ".into()],
            "s",
            DEFAULT_CONNECT_TIMEOUT,
        );
        assert!(matches!(blank_url.validate(), Err(ConfigError::EmptyBootstrapUrl)));

        let no_store = SinkConfig::new(vec!["mem://a".into()], "", DEFAULT_CONNECT_TIMEOUT);
        assert!(matches!(no_store.validate(), Err(ConfigError::EmptyStore)));

        let no_timeout = SinkConfig::new(vec!["mem://a".into()], "s", Duration::ZERO);
        assert!(matches!(no_timeout.validate(), Err(ConfigError::ZeroTimeout)));
    }
}
