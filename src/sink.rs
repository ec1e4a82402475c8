use crate::record::LogRecord;
use async_trait::async_trait;
use std::fmt;

/// Credential sent with every batch.
///
/// `Debug` never prints the key itself so it cannot leak through the
/// client's own diagnostics.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Error returned by a [`LogSink`] when a batch was not accepted.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("request to collector failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("collector answered with status {0}, expected 202")]
    UnexpectedStatus(u16),

    #[error("failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Asynchronous destination for batches of [`LogRecord`]s.
///
/// Implementations carry a whole batch in one delivery attempt. The client
/// calls `send` from a background task, never from the thread that
/// captured the records.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver one batch.
    ///
    /// **Parameters**
    /// - `api_key`: credential the batch is attributed to.
    /// - `batch`: records in capture order.
    ///
    /// **Returns**
    /// - `Ok(())` if the collector accepted the batch.
    /// - `Err(..)` for any other outcome. The client puts the batch back
    ///   at the head of its buffer and retries on the next flush trigger.
    async fn send(&self, api_key: &ApiKey, batch: &[LogRecord]) -> Result<(), SinkError>;
}
