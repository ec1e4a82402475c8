use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};

use logmonitor::noop_sink::NoopSink;
use logmonitor::{ClientConfig, Console, InitOptions, LogValue, Logmonitor, StdConsole};

/// Console calls through an intercepted console with a larger batch size.
#[tokio::main]
async fn main() {
    let config = ClientConfig {
        batch_size: 1_000,
        batch_period: Duration::from_millis(200),
        ..ClientConfig::production()
    };
    let client = Logmonitor::new(config, Arc::new(NoopSink));
    client.init(InitOptions::new("load-test"));

    // Nothing is printed; only the capture path is measured.
    struct Silent;
    impl Console for Silent {
        fn write(&self, _level: logmonitor::LogLevel, _args: &[LogValue]) {}
    }
    let console = client.intercept(Silent);

    let n: i64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        console.warn(&[LogValue::from("custom load test warning"), LogValue::from(i)]);
    }

    let elapsed = start.elapsed();
    StdConsole.info(&[LogValue::from(format!(
        "custom config: captured {} calls in {:?} (~{:.0} calls/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    ))]);

    sleep(Duration::from_millis(500)).await;
    client.dispose().await;
}
