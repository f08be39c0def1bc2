//! Gateway configuration, read once from the environment at startup.

use std::time::Duration;

use crate::error::ConfigError;

/// Default Telegram Bot API base URL.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Path of the libSQL database holding posts.
    pub db_path: String,
    /// Base URL Discord webhook paths are resolved against. `None` when unset.
    pub publisher_endpoint: Option<String>,
    /// Telegram Bot API base URL, without trailing slash.
    pub telegram_api_base: String,
    /// Deadline applied to every outbound provider call.
    pub request_timeout: Duration,
    /// Maximum number of sends in flight for one batch.
    pub dispatch_concurrency: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            db_path: "./data/synk-gateway.db".to_string(),
            publisher_endpoint: None,
            telegram_api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            request_timeout: Duration::from_secs(10),
            dispatch_concurrency: 1,
        }
    }
}

impl GatewayConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let request_timeout = match lookup("GATEWAY_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("GATEWAY_REQUEST_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };

        let dispatch_concurrency = match lookup("GATEWAY_DISPATCH_CONCURRENCY") {
            Some(raw) => {
                let n: usize = parse_number("GATEWAY_DISPATCH_CONCURRENCY", &raw)?;
                if n == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "GATEWAY_DISPATCH_CONCURRENCY".into(),
                        message: "must be at least 1".into(),
                    });
                }
                n
            }
            None => defaults.dispatch_concurrency,
        };

        Ok(Self {
            bind_addr: lookup("GATEWAY_BIND_ADDR").unwrap_or(defaults.bind_addr),
            db_path: lookup("GATEWAY_DB_PATH").unwrap_or(defaults.db_path),
            publisher_endpoint: lookup("PUBLISHER_ENDPOINT").and_then(|v| normalize_endpoint(&v)),
            telegram_api_base: lookup("TELEGRAM_API_BASE")
                .and_then(|v| normalize_endpoint(&v))
                .unwrap_or(defaults.telegram_api_base),
            request_timeout,
            dispatch_concurrency,
        })
    }

    /// Set the publisher endpoint, applying the same normalization as `from_env`.
    pub fn with_publisher_endpoint(mut self, endpoint: impl AsRef<str>) -> Self {
        self.publisher_endpoint = normalize_endpoint(endpoint.as_ref());
        self
    }

    /// The publisher endpoint, or the configuration error for its absence.
    pub fn require_publisher_endpoint(&self) -> Result<&str, ConfigError> {
        self.publisher_endpoint
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "PUBLISHER_ENDPOINT".into(),
                hint: "Set PUBLISHER_ENDPOINT to the Discord API base URL.".into(),
            })
    }
}

/// Trim whitespace and a trailing `/`; empty means unset.
fn normalize_endpoint(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("expected a non-negative integer, got {raw:?}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = GatewayConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.publisher_endpoint, None);
        assert_eq!(config.telegram_api_base, DEFAULT_TELEGRAM_API_BASE);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.dispatch_concurrency, 1);
    }

    #[test]
    fn publisher_endpoint_trailing_slash_stripped() {
        let config =
            GatewayConfig::from_lookup(lookup_from(&[("PUBLISHER_ENDPOINT", " https://discord.com/api/ ")]))
                .unwrap();
        assert_eq!(
            config.publisher_endpoint.as_deref(),
            Some("https://discord.com/api")
        );
    }

    #[test]
    fn blank_publisher_endpoint_is_unset() {
        let config = GatewayConfig::from_lookup(lookup_from(&[("PUBLISHER_ENDPOINT", "/")])).unwrap();
        assert!(config.publisher_endpoint.is_none());
        assert!(config.require_publisher_endpoint().is_err());
    }

    #[test]
    fn numeric_overrides_parsed() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("GATEWAY_REQUEST_TIMEOUT_SECS", "3"),
            ("GATEWAY_DISPATCH_CONCURRENCY", "4"),
        ]))
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.dispatch_concurrency, 4);
    }

    #[test]
    fn invalid_timeout_rejected() {
        let err = GatewayConfig::from_lookup(lookup_from(&[("GATEWAY_REQUEST_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "GATEWAY_REQUEST_TIMEOUT_SECS"));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let err = GatewayConfig::from_lookup(lookup_from(&[("GATEWAY_DISPATCH_CONCURRENCY", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn with_publisher_endpoint_normalizes() {
        let config = GatewayConfig::default().with_publisher_endpoint("http://127.0.0.1:9000/");
        assert_eq!(config.require_publisher_endpoint().unwrap(), "http://127.0.0.1:9000");
    }
}
