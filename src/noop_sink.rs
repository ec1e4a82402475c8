use crate::record::LogRecord;
use crate::sink::{ApiKey, LogSink, SinkError};
use async_trait::async_trait;

/// A sink that accepts and drops every batch.
///
/// Useful for measuring the overhead of capture and batching without any
/// network I/O, and for tests that only care about buffering.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _api_key: &ApiKey, _batch: &[LogRecord]) -> Result<(), SinkError> {
        Ok(())
    }
}
