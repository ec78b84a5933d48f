//! Client configuration read from the environment.
//!
//! Every Dispo client (CLI, embedded apps) resolves the same set of
//! `DISPO_*` variables into a [`ClientConfig`], then asks it for the remote
//! backend and reachability probe to wire into a
//! [`DispositionService`](crate::services::DispositionService).

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::reachability::{
    HttpReachability, ManualReachability, Reachability, ReachabilityError,
};
use crate::remote::{ClientOptions, Credentials, HttpDispositionClient, RemoteBackend, SimulatedRemote};
use crate::sync::DEFAULT_SYNC_INTERVAL;
use crate::util::{is_http_url, normalize_text_option};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Reachability(#[from] ReachabilityError),
}

#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    /// Local store location; clients pick a platform default when unset
    pub db_path: Option<PathBuf>,
    /// Remote endpoint; the simulated backend is used when unset
    pub api_base_url: Option<String>,
    pub access_token: Option<String>,
    pub health_url: Option<String>,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub sync_interval: Duration,
    pub simulated_success_rate: f64,
    pub simulated_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let options = ClientOptions::default();
        let simulated = SimulatedRemote::default();
        Self {
            db_path: None,
            api_base_url: None,
            access_token: None,
            health_url: None,
            request_timeout: options.timeout,
            max_retries: options.max_retries,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            simulated_success_rate: simulated.success_rate(),
            simulated_delay: Duration::from_secs(1),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("db_path", &self.db_path)
            .field("api_base_url", &self.api_base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("health_url", &self.health_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .field("sync_interval", &self.sync_interval)
            .field("simulated_success_rate", &self.simulated_success_rate)
            .field("simulated_delay", &self.simulated_delay)
            .finish()
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = optional_trimmed(&lookup, "DISPO_DB_PATH").map(PathBuf::from);

        let api_base_url = optional_http_url(&lookup, "DISPO_API_BASE_URL")?;
        let access_token = optional_trimmed(&lookup, "DISPO_ACCESS_TOKEN");
        let health_url = optional_http_url(&lookup, "DISPO_HEALTH_URL")?;

        let request_timeout_secs =
            bounded_integer(&lookup, "DISPO_REQUEST_TIMEOUT_SECS", 10, 1..=120)?;
        let max_retries = bounded_integer(&lookup, "DISPO_MAX_RETRIES", 3, 0..=10)?;
        let sync_interval_secs = bounded_integer(&lookup, "DISPO_SYNC_INTERVAL_SECS", 5, 1..=3_600)?;

        let simulated_success_rate =
            value_or_default(&lookup, "DISPO_SIMULATED_SUCCESS_RATE", "0.9")
                .parse::<f64>()
                .map_err(|_| {
                    ConfigError::Invalid(
                        "DISPO_SIMULATED_SUCCESS_RATE must be a number in [0.0, 1.0]".to_string(),
                    )
                })?;
        if !(0.0..=1.0).contains(&simulated_success_rate) {
            return Err(ConfigError::Invalid(
                "DISPO_SIMULATED_SUCCESS_RATE must be in [0.0, 1.0]".to_string(),
            ));
        }

        let simulated_delay_ms = value_or_default(&lookup, "DISPO_SIMULATED_DELAY_MS", "1000")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "DISPO_SIMULATED_DELAY_MS must be a non-negative integer".to_string(),
                )
            })?;

        Ok(Self {
            db_path,
            api_base_url,
            access_token,
            health_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_retries: u32::try_from(max_retries).map_err(|_| {
                ConfigError::Invalid("DISPO_MAX_RETRIES is out of range".to_string())
            })?,
            sync_interval: Duration::from_secs(sync_interval_secs),
            simulated_success_rate,
            simulated_delay: Duration::from_millis(simulated_delay_ms),
        })
    }

    /// Whether submissions go to the simulated backend.
    pub const fn is_simulated(&self) -> bool {
        self.api_base_url.is_none()
    }

    /// Health URL to probe: the explicit one, else `<base>/healthz`.
    pub fn effective_health_url(&self) -> Option<String> {
        self.health_url.clone().or_else(|| {
            self.api_base_url
                .as_deref()
                .map(|base| format!("{}/healthz", base.trim_end_matches('/')))
        })
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: self.request_timeout,
            max_retries: self.max_retries,
            ..ClientOptions::default()
        }
    }

    pub fn credentials(&self) -> Credentials {
        self.access_token
            .as_deref()
            .map_or_else(Credentials::anonymous, Credentials::bearer)
    }

    /// Build the configured remote backend.
    pub fn remote_backend(&self) -> Result<RemoteBackend, ConfigError> {
        match self.api_base_url.as_deref() {
            Some(base_url) => {
                HttpDispositionClient::new(base_url, self.credentials(), self.client_options())
                    .map(RemoteBackend::Http)
                    .map_err(|error| ConfigError::Invalid(error.to_string()))
            }
            None => Ok(RemoteBackend::Simulated(SimulatedRemote::new(
                self.simulated_delay,
                self.simulated_success_rate,
            ))),
        }
    }

    /// Build the configured reachability probe.
    ///
    /// Without a health URL to poll the client is assumed online and relies
    /// on remote failures to queue records.
    pub fn reachability(&self) -> Result<Reachability, ConfigError> {
        match self.effective_health_url() {
            Some(url) => Ok(Reachability::Http(HttpReachability::new(url)?)),
            None => Ok(Reachability::Manual(ManualReachability::online())),
        }
    }
}

fn bounded_integer(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
    range: std::ops::RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    let message = || {
        format!(
            "{name} must be an integer in [{}, {}]",
            range.start(),
            range.end()
        )
    };
    let value = match optional_trimmed(lookup, name) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid(message()))?,
        None => default,
    };
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(message()))
    }
}

fn optional_http_url(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<String>, ConfigError> {
    let Some(value) = optional_trimmed(lookup, name) else {
        return Ok(None);
    };
    if is_http_url(&value) {
        Ok(Some(value.trim_end_matches('/').to_string()))
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must start with http:// or https://"
        )))
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ClientConfig::from_lookup(|name| map.get(name).map(|value| (*value).to_string()))
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(config.is_simulated());
        assert_eq!(config.effective_health_url(), None);
        assert_eq!(config.sync_interval, Duration::from_secs(5));
    }

    #[test]
    fn reads_remote_settings() {
        let config = config_from(&[
            ("DISPO_DB_PATH", " /tmp/dispo.db "),
            ("DISPO_API_BASE_URL", "https://api.example.com/"),
            ("DISPO_ACCESS_TOKEN", "secret-token"),
            ("DISPO_REQUEST_TIMEOUT_SECS", "30"),
            ("DISPO_MAX_RETRIES", "0"),
            ("DISPO_SYNC_INTERVAL_SECS", "60"),
        ])
        .unwrap();

        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/dispo.db")));
        assert_eq!(config.api_base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(
            config.effective_health_url().as_deref(),
            Some("https://api.example.com/healthz")
        );
        assert_eq!(config.client_options().timeout, Duration::from_secs(30));
        assert_eq!(config.client_options().max_retries, 0);
        assert_eq!(config.credentials().access_token(), Some("secret-token"));
        assert!(!config.is_simulated());
        assert!(matches!(
            config.remote_backend().unwrap(),
            RemoteBackend::Http(_)
        ));
        assert!(matches!(config.reachability().unwrap(), Reachability::Http(_)));
    }

    #[test]
    fn simulated_mode_assumes_online() {
        let config = config_from(&[
            ("DISPO_SIMULATED_SUCCESS_RATE", "1"),
            ("DISPO_SIMULATED_DELAY_MS", "0"),
        ])
        .unwrap();

        assert!(matches!(
            config.remote_backend().unwrap(),
            RemoteBackend::Simulated(_)
        ));
        assert!(matches!(
            config.reachability().unwrap(),
            Reachability::Manual(_)
        ));
    }

    #[test]
    fn rejects_out_of_range_values() {
        for (name, value) in [
            ("DISPO_REQUEST_TIMEOUT_SECS", "0"),
            ("DISPO_REQUEST_TIMEOUT_SECS", "121"),
            ("DISPO_MAX_RETRIES", "11"),
            ("DISPO_SYNC_INTERVAL_SECS", "soon"),
            ("DISPO_SIMULATED_SUCCESS_RATE", "1.5"),
            ("DISPO_SIMULATED_DELAY_MS", "-1"),
            ("DISPO_API_BASE_URL", "api.example.com"),
            ("DISPO_HEALTH_URL", "ftp://example.com"),
        ] {
            let error = config_from(&[(name, value)]).unwrap_err();
            assert!(error.to_string().contains(name), "{name}={value}: {error}");
        }
    }

    #[test]
    fn unusable_health_url_is_a_typed_error() {
        let config = ClientConfig {
            health_url: Some("localhost/healthz".to_string()),
            ..ClientConfig::default()
        };

        let error = config.reachability().unwrap_err();
        assert!(matches!(
            &error,
            ConfigError::Reachability(ReachabilityError::InvalidUrl(url)) if url == "localhost/healthz"
        ));
        assert!(error.to_string().contains("localhost/healthz"));
    }

    #[test]
    fn debug_redacts_access_token() {
        let config = config_from(&[("DISPO_ACCESS_TOKEN", "secret-token")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
