//! Configuration module for the trailing-stop engine.
//!
//! Loads YAML with environment variable interpolation and validates the
//! result before any adapter is built.
//!
//! # Usage
//!
//! ```rust,ignore
//! use trailing_stop_engine::config::{config_path, load_config};
//!
//! let config = load_config(Some(&config_path()))?;
//! println!("queue: {}", config.engine.queue_name);
//! ```

mod broker;
mod engine;
mod market;
mod observability;
mod price_feed;
mod retry;

use std::net::SocketAddr;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::use_cases::TickSettings;

pub use broker::BrokerConfig;
pub use engine::EngineConfig;
pub use market::MarketConfig;
pub use observability::{LoggingConfig, MetricsSettings, ObservabilityConfig, OtelConfig};
pub use price_feed::PriceFeedConfig;
pub use retry::{RetryConfig, RetrySettings};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "TRAIL_ENGINE_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Queue and cadence.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Remote call retry policies.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Exchange session.
    #[serde(default)]
    pub market: MarketConfig,
    /// Leg price source.
    #[serde(default)]
    pub price_feed: PriceFeedConfig,
    /// Square-off account.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Logging, metrics and tracing export.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Settings for the tick use case.
    #[must_use]
    pub fn tick_settings(&self) -> TickSettings {
        TickSettings {
            heartbeat_retry: self.retry.heartbeat.to_policy(),
            price_retry: self.retry.price_fetch.to_policy(),
            persistence_retry: self.retry.persistence.to_policy(),
            tick_interval: self.engine.tick_interval(),
        }
    }

    /// Exchange timezone.
    pub fn market_timezone(&self) -> Result<Tz, ConfigError> {
        self.market.timezone.parse().map_err(|_| {
            ConfigError::ValidationError(format!(
                "market.timezone '{}' is not an IANA timezone",
                self.market.timezone
            ))
        })
    }

    /// Exchange-local close time.
    pub fn market_close_time(&self) -> Result<NaiveTime, ConfigError> {
        let raw = self.market.close_time.as_str();
        NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .map_err(|_| {
                ConfigError::ValidationError(format!(
                    "market.close_time '{raw}' must be HH:MM or HH:MM:SS"
                ))
            })
    }

    /// Prometheus listener address.
    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = &self.observability.metrics.listen_addr;
        raw.parse().map_err(|_| {
            ConfigError::ValidationError(format!(
                "observability.metrics.listen_addr '{raw}' is not a socket address"
            ))
        })
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Config file path from `TRAIL_ENGINE_CONFIG`, defaulting to `config.yaml`.
#[must_use]
pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "config.yaml".to_string())
}

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

fn validate_retry(name: &str, settings: &RetrySettings) -> Result<(), ConfigError> {
    if settings.max_attempts == 0 {
        return Err(ConfigError::ValidationError(format!(
            "retry.{name}.max_attempts must be at least 1"
        )));
    }

    if settings.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(format!(
            "retry.{name}.backoff_multiplier must be >= 1.0"
        )));
    }

    if !(0.0..=1.0).contains(&settings.jitter_factor) {
        return Err(ConfigError::ValidationError(format!(
            "retry.{name}.jitter_factor must be between 0.0 and 1.0"
        )));
    }

    if settings.initial_backoff_ms > settings.max_backoff_ms {
        return Err(ConfigError::ValidationError(format!(
            "retry.{name}.initial_backoff_ms must not exceed max_backoff_ms"
        )));
    }

    Ok(())
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.engine.queue_name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "engine.queue_name must not be empty".to_string(),
        ));
    }

    if config.engine.tick_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "engine.tick_interval_ms must be positive".to_string(),
        ));
    }

    validate_retry("heartbeat", &config.retry.heartbeat)?;
    validate_retry("price_fetch", &config.retry.price_fetch)?;
    validate_retry("persistence", &config.retry.persistence)?;

    config.market_timezone()?;
    config.market_close_time()?;

    if config.price_feed.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "price_feed.timeout_ms must be positive".to_string(),
        ));
    }

    if config.broker.account_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "broker.account_id must not be empty".to_string(),
        ));
    }

    let valid_formats = ["json", "pretty"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }

    if config.observability.metrics.enabled {
        config.metrics_addr()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::price_source::PriceBasis;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.engine.queue_name, "trailing-stops");
        assert_eq!(config.engine.tick_interval(), Duration::from_secs(5));
        assert_eq!(config.retry.price_fetch.max_attempts, 3);
        assert_eq!(config.market_timezone().unwrap(), chrono_tz::America::New_York);
        assert_eq!(
            config.market_close_time().unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap()
        );
        assert_eq!(config.price_feed.price_basis, PriceBasis::Mid);
        assert!(!config.observability.metrics.enabled);
    }

    #[test]
    fn test_load_empty_config_uses_defaults() {
        let config = match load_config_from_string("{}") {
            Ok(c) => c,
            Err(e) => panic!("should load empty config: {e}"),
        };
        assert_eq!(config.broker.account_id, "paper");
        assert_eq!(config.observability.logging.format, "json");
    }

    #[test]
    fn test_tick_settings_from_retry_section() {
        let yaml = r"
engine:
  tick_interval_ms: 1500
retry:
  heartbeat:
    max_attempts: 1
  price_fetch:
    max_attempts: 4
    initial_backoff_ms: 50
    max_backoff_ms: 400
";
        let config = load_config_from_string(yaml).unwrap();
        let settings = config.tick_settings();

        assert_eq!(settings.tick_interval, Duration::from_millis(1500));
        assert_eq!(settings.heartbeat_retry.max_attempts, 1);
        assert_eq!(settings.price_retry.max_attempts, 4);
        assert_eq!(settings.price_retry.initial_backoff, Duration::from_millis(50));
        assert_eq!(settings.price_retry.max_backoff, Duration::from_millis(400));
        assert_eq!(settings.persistence_retry.max_attempts, 3);
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "queue_name: ${TRAIL_ENGINE_TEST_NONEXISTENT_VAR:-stops}";
        assert_eq!(interpolate_env_vars(input), "queue_name: stops");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_with_default_uses_existing() {
        let input = "path: ${PATH:-default}";
        let result = interpolate_env_vars(input);

        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "api_key: ${TRAIL_ENGINE_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "api_key: ");
    }

    #[test]
    fn test_validation_zero_attempts() {
        let yaml = r"
retry:
  price_fetch:
    max_attempts: 0
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for zero attempts");
        };
        assert!(err.to_string().contains("retry.price_fetch.max_attempts"));
    }

    #[test]
    fn test_validation_unknown_timezone() {
        let yaml = r"
market:
  timezone: Mars/Olympus_Mons
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for unknown timezone");
        };
        assert!(err.to_string().contains("market.timezone"));
    }

    #[test]
    fn test_validation_bad_close_time() {
        let yaml = r#"
market:
  close_time: "4pm"
"#;
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for bad close time");
        };
        assert!(err.to_string().contains("market.close_time"));
    }

    #[test]
    fn test_close_time_with_seconds() {
        let yaml = r#"
market:
  timezone: "America/Chicago"
  close_time: "15:15:30"
"#;
        let config = load_config_from_string(yaml).unwrap();
        assert_eq!(
            config.market_close_time().unwrap(),
            NaiveTime::from_hms_opt(15, 15, 30).unwrap()
        );
    }

    #[test]
    fn test_validation_invalid_log_format() {
        let yaml = r"
observability:
  logging:
    format: xml
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for invalid format");
        };
        assert!(err.to_string().contains("format"));
    }

    #[test]
    fn test_validation_metrics_addr_only_when_enabled() {
        let disabled = r#"
observability:
  metrics:
    listen_addr: "not-an-addr"
"#;
        assert!(load_config_from_string(disabled).is_ok());

        let enabled = r#"
observability:
  metrics:
    enabled: true
    listen_addr: "not-an-addr"
"#;
        assert!(load_config_from_string(enabled).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
engine:
  queue_name: "stops-eu"
price_feed:
  api_key: "key"
  api_secret: "${{TRAIL_ENGINE_TEST_MISSING_SECRET:-secret}}"
  price_basis: ask
  feed: opra
broker:
  account_id: "PA123"
"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.engine.queue_name, "stops-eu");
        assert_eq!(config.broker.account_id, "PA123");
        assert!(config.price_feed.has_credentials());
        let alpaca = config.price_feed.to_alpaca();
        assert_eq!(alpaca.api_secret, "secret");
        assert_eq!(alpaca.price_basis, PriceBasis::Ask);
        assert_eq!(alpaca.feed.as_deref(), Some("opra"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let Err(err) = load_config(Some(&path.to_string_lossy())) else {
            panic!("expected read error");
        };
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
