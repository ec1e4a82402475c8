use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use logmonitor::{
    init::init_tracing, ApiKey, ClientConfig, InitOptions, LogRecord, LogSink, Logmonitor,
    SinkError,
};

/// Example of delivering batches somewhere other than the HTTP collector
/// by implementing the `LogSink` trait directly. Here batches are printed
/// as the JSON array the collector would receive.
struct StdoutJsonSink;

#[async_trait]
impl LogSink for StdoutJsonSink {
    async fn send(&self, _api_key: &ApiKey, batch: &[LogRecord]) -> Result<(), SinkError> {
        println!("[batch] {}", serde_json::to_string(batch)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Logmonitor::new(ClientConfig::production(), Arc::new(StdoutJsonSink));
    init_tracing(&client, true)?;
    client.init(InitOptions::new("demo-key"));

    info!("custom sink example started");
    client.set_user("user-42");
    error!(db = "orders", "simulated error sent via custom sink");

    client.dispose().await;
    Ok(())
}
