use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::error;

use logmonitor::init::init_tracing;
use logmonitor::noop_sink::NoopSink;
use logmonitor::{ClientConfig, InitOptions, Logmonitor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Logmonitor::new(ClientConfig::production(), Arc::new(NoopSink));
    init_tracing(&client, false)?;
    client.init(InitOptions::new("load-test"));

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: captured {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give in-flight batches a little time to finish
    sleep(Duration::from_millis(200)).await;
    client.dispose().await;
    println!("stats: {:?}", client.stats());
    Ok(())
}
