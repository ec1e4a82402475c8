use crate::init::DEFAULT_ENDPOINT;
use crate::record::LogRecord;
use crate::sink::{ApiKey, LogSink, SinkError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Header that carries the credential. The key is never put in the URL or
/// the body.
pub const API_KEY_HEADER: &str = "X-Logmonitor-Api-Key";

/// The only status that counts as delivered: the collector queued the batch
/// for asynchronous processing.
pub const ACCEPTED: StatusCode = StatusCode::ACCEPTED;

/// Configuration for [`HttpSink`].
#[derive(Clone, Debug)]
pub struct HttpSinkConfig {
    /// Full URL batches are POSTed to.
    pub endpoint: String,
    /// Upper bound for a single delivery attempt.
    pub timeout: Duration,
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Collector implementation of [`LogSink`] over HTTP.
///
/// Each batch is one `POST` with a JSON array body.
#[derive(Clone)]
pub struct HttpSink {
    client: Client,
    config: HttpSinkConfig,
}

impl HttpSink {
    /// Construct a sink posting to `config.endpoint`.
    ///
    /// **Parameters**
    /// - `config`: [`HttpSinkConfig`] with the endpoint and request timeout.
    ///
    /// **Returns**
    /// - A ready-to-use [`HttpSink`], or the builder error if the TLS
    ///   backend could not be initialized.
    pub fn new(config: HttpSinkConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(transport)?;
        Ok(Self { client, config })
    }
}

fn transport(e: reqwest::Error) -> SinkError {
    SinkError::Transport(Box::new(e))
}

#[async_trait]
impl LogSink for HttpSink {
    async fn send(&self, api_key: &ApiKey, batch: &[LogRecord]) -> Result<(), SinkError> {
        let body = serde_json::to_vec(batch)?;
        let resp = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json")
            .header(API_KEY_HEADER, api_key.expose())
            .body(body)
            .send()
            .await
            .map_err(transport)?;

        if resp.status() == ACCEPTED {
            Ok(())
        } else {
            Err(SinkError::UnexpectedStatus(resp.status().as_u16()))
        }
    }
}
