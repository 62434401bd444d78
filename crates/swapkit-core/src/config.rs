//! Externally supplied constants for the swap widget.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::exchange::AmountFormat;
use crate::ConfigError;

const ENV_PREFIX: &str = "SWAPKIT_";

/// Runtime configuration for the price service and the swap flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    /// Endpoint returning the JSON array of price records.
    pub price_feed_url: String,
    /// Base URL for token icons; `{base}/{symbol}.svg`.
    pub icon_base_url: String,
    pub cache_ttl_ms: u64,
    pub debounce_ms: u64,
    pub request_timeout_ms: u64,
    /// Smallest non-zero amount shown as a number; below it the display
    /// reads `< {min_amount}`.
    pub min_amount: f64,
    pub max_decimals: u8,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            price_feed_url: String::from("https://interview.switcheo.com/prices.json"),
            icon_base_url: String::from(
                "https://raw.githubusercontent.com/Switcheo/token-icons/main/tokens",
            ),
            cache_ttl_ms: 60_000,
            debounce_ms: 300,
            request_timeout_ms: 5_000,
            min_amount: 0.000_001,
            max_decimals: 8,
        }
    }
}

impl SwapConfig {
    /// Defaults overridden by `SWAPKIT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through an arbitrary key lookup (keys carry the
    /// `SWAPKIT_` prefix).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(value) = get("PRICE_FEED_URL") {
            config.price_feed_url = value;
        }
        if let Some(value) = get("ICON_BASE_URL") {
            config.icon_base_url = value;
        }
        if let Some(value) = get("CACHE_TTL_MS") {
            config.cache_ttl_ms = parse_value("cache_ttl_ms", &value)?;
        }
        if let Some(value) = get("DEBOUNCE_MS") {
            config.debounce_ms = parse_value("debounce_ms", &value)?;
        }
        if let Some(value) = get("REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = parse_value("request_timeout_ms", &value)?;
        }
        if let Some(value) = get("MIN_AMOUNT") {
            config.min_amount = parse_value("min_amount", &value)?;
        }
        if let Some(value) = get("MAX_DECIMALS") {
            config.max_decimals = parse_value("max_decimals", &value)?;
        }

        config.validate()?;
        debug!(?config, "loaded swap config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("price_feed_url", &self.price_feed_url)?;
        validate_http_url("icon_base_url", &self.icon_base_url)?;

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_ms",
                value: self.request_timeout_ms.to_string(),
            });
        }
        if !self.min_amount.is_finite() || self.min_amount < 0.0 {
            return Err(ConfigError::Invalid {
                key: "min_amount",
                value: self.min_amount.to_string(),
            });
        }
        // Beyond 17 places an f64 prints noise.
        if self.max_decimals > 17 {
            return Err(ConfigError::Invalid {
                key: "max_decimals",
                value: self.max_decimals.to_string(),
            });
        }

        Ok(())
    }

    pub fn with_price_feed_url(mut self, url: impl Into<String>) -> Self {
        self.price_feed_url = url.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_ms = duration_millis(ttl);
        self
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_ms = duration_millis(delay);
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn amount_format(&self) -> AmountFormat {
        AmountFormat {
            max_decimals: usize::from(self.max_decimals),
            min_amount: self.min_amount,
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_owned(),
    })
}

fn validate_http_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty { key });
    }
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(ConfigError::NotHttpUrl {
            key,
            value: value.to_owned(),
        });
    }
    Ok(())
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_widget_constants() {
        let config = SwapConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.debounce_delay(), Duration::from_millis(300));
        assert_eq!(config.max_decimals, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = SwapConfig::from_lookup(lookup(&[
            ("SWAPKIT_CACHE_TTL_MS", "1500"),
            ("SWAPKIT_DEBOUNCE_MS", " 50 "),
            ("SWAPKIT_MAX_DECIMALS", "4"),
        ]))
        .expect("config should load");

        assert_eq!(config.cache_ttl(), Duration::from_millis(1500));
        assert_eq!(config.debounce_delay(), Duration::from_millis(50));
        assert_eq!(config.amount_format().max_decimals, 4);
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let err = SwapConfig::from_lookup(lookup(&[("SWAPKIT_CACHE_TTL_MS", "soon")]))
            .expect_err("must fail");
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "cache_ttl_ms",
                value: String::from("soon"),
            }
        );
    }

    #[test]
    fn rejects_non_http_feed_url() {
        let err = SwapConfig::from_lookup(lookup(&[("SWAPKIT_PRICE_FEED_URL", "ftp://x")]))
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::NotHttpUrl { key: "price_feed_url", .. }));

        let err = SwapConfig::default()
            .with_price_feed_url("  ")
            .validate()
            .expect_err("must fail");
        assert_eq!(err, ConfigError::Empty { key: "price_feed_url" });
    }

    #[test]
    fn deserializes_partial_json() {
        let config: SwapConfig =
            serde_json::from_str(r#"{"debounce_ms": 10}"#).expect("config should decode");
        assert_eq!(config.debounce_ms, 10);
        assert_eq!(config.cache_ttl_ms, 60_000);
    }
}
