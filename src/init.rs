use crate::client::Logmonitor;
use crate::env::{
    env_or, LOGMONITOR_BATCH_PERIOD_MS_ENV, LOGMONITOR_BATCH_SIZE_ENV, LOGMONITOR_ENDPOINT_ENV,
    LOGMONITOR_ENV,
};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Number of buffered records that triggers an immediate flush.
pub const MAX_BATCH_SIZE: usize = 20;

/// Interval of the periodic flush.
pub const BATCH_PERIOD: Duration = Duration::from_secs(15);

/// Default collection endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://aromatic-duck-387.convex.site/api/v1/logs";

/// Deployment mode of the host.
///
/// Only `Production` switches capture on; in every other mode `init` just
/// records configuration, so local development is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeploymentMode {
    Production,
    #[default]
    Development,
}

impl DeploymentMode {
    /// `production` / `prod` (any case) is Production, anything else is
    /// Development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => DeploymentMode::Production,
            _ => DeploymentMode::Development,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(&env_or(LOGMONITOR_ENV, "development"))
    }

    pub fn is_production(&self) -> bool {
        matches!(self, DeploymentMode::Production)
    }
}

/// Configuration of the client.
///
/// **Fields**
/// - `endpoint`: URL batches are POSTed to.
/// - `batch_size`: buffered record count that forces a flush.
/// - `batch_period`: interval of the periodic flush.
/// - `request_timeout`: upper bound of one delivery attempt.
/// - `mode`: [`DeploymentMode`]; capture is inert outside production.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub endpoint: String,
    pub batch_size: usize,
    pub batch_period: Duration,
    pub request_timeout: Duration,
    pub mode: DeploymentMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            batch_size: MAX_BATCH_SIZE,
            batch_period: BATCH_PERIOD,
            request_timeout: Duration::from_secs(10),
            mode: DeploymentMode::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by the variables listed in [`crate::env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let batch_size = match std::env::var(LOGMONITOR_BATCH_SIZE_ENV) {
            Ok(raw) => parse_number(LOGMONITOR_BATCH_SIZE_ENV, &raw)? as usize,
            Err(_) => defaults.batch_size,
        };
        let batch_period = match std::env::var(LOGMONITOR_BATCH_PERIOD_MS_ENV) {
            Ok(raw) => Duration::from_millis(parse_number(LOGMONITOR_BATCH_PERIOD_MS_ENV, &raw)?),
            Err(_) => defaults.batch_period,
        };

        Ok(Self {
            endpoint: env_or(LOGMONITOR_ENDPOINT_ENV, &defaults.endpoint),
            batch_size,
            batch_period,
            mode: DeploymentMode::from_env(),
            ..defaults
        })
    }

    /// Shorthand for a production config, used by hosts that decide the
    /// mode themselves.
    pub fn production() -> Self {
        Self {
            mode: DeploymentMode::Production,
            ..Self::default()
        }
    }
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        }),
        Ok(n) => Ok(n),
    }
}

/// Error type returned when building configuration or installing the
/// global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("failed to install global subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install a global `tracing` subscriber whose events are mirrored into
/// `client`.
///
/// **Parameters**
/// - `client`: the [`Logmonitor`] that receives captured events.
/// - `enable_stdout`: if `true`, a `fmt` layer also prints every event, so
///   the host keeps its normal console output.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with the client's
/// [`CaptureLayer`](crate::layer::CaptureLayer) as the global default
/// subscriber. Capture stays inert until the client is initialized in
/// production mode.
pub fn init_tracing(client: &Logmonitor, enable_stdout: bool) -> Result<(), ConfigError> {
    let layer = client.layer();

    // Two branches so each subscriber keeps a concrete type.
    if enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_production_values_activate() {
        assert_eq!(DeploymentMode::parse("production"), DeploymentMode::Production);
        assert_eq!(DeploymentMode::parse(" PROD "), DeploymentMode::Production);
        assert_eq!(DeploymentMode::parse("staging"), DeploymentMode::Development);
        assert_eq!(DeploymentMode::parse(""), DeploymentMode::Development);
    }

    #[test]
    fn defaults_match_collector_contract() {
        let config = ClientConfig::default();
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.batch_period, Duration::from_secs(15));
        assert!(!config.mode.is_production());
        assert!(ClientConfig::production().mode.is_production());
    }

    #[test]
    fn rejects_non_positive_numbers() {
        assert!(parse_number(LOGMONITOR_BATCH_SIZE_ENV, "0").is_err());
        assert!(parse_number(LOGMONITOR_BATCH_SIZE_ENV, "abc").is_err());
        assert_eq!(parse_number(LOGMONITOR_BATCH_SIZE_ENV, " 50 ").unwrap(), 50);
    }
}
