use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use logmonitor::init::init_tracing;
use logmonitor::{ClientConfig, InitOptions, Logmonitor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig {
        batch_period: Duration::from_secs(2),
        ..ClientConfig::from_env()?
    };
    let client = Logmonitor::with_http(config)?;
    init_tracing(&client, true)?;
    client.init(InitOptions::new(
        std::env::var("LOGMONITOR_API_KEY").unwrap_or_else(|_| "YOUR_LOGMONITOR_API_KEY".into()),
    ));

    info!("starting service");
    client.set_user("user_7");
    warn!(order_id = 123, "payment retry");
    error!(reason = "card declined", "order failed");

    // Let the periodic flush pick the events up.
    sleep(Duration::from_secs(3)).await;
    client.dispose().await;
    Ok(())
}
