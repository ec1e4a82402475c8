//! Environment variable names used by [`ClientConfig::from_env`].
//!
//! These are purely helpers; the client itself only ever sees a
//! [`ClientConfig`] value.
//!
//! [`ClientConfig`]: crate::init::ClientConfig
//! [`ClientConfig::from_env`]: crate::init::ClientConfig::from_env

/// Deployment mode. Capture is only switched on when this is `production`.
pub const LOGMONITOR_ENV: &str = "LOGMONITOR_ENV";

/// Collection endpoint URL override.
pub const LOGMONITOR_ENDPOINT_ENV: &str = "LOGMONITOR_ENDPOINT";

/// Number of buffered records that triggers an immediate flush.
pub const LOGMONITOR_BATCH_SIZE_ENV: &str = "LOGMONITOR_BATCH_SIZE";

/// Periodic flush interval in milliseconds.
pub const LOGMONITOR_BATCH_PERIOD_MS_ENV: &str = "LOGMONITOR_BATCH_PERIOD_MS";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
