use std::collections::BTreeMap;

use logmonitor::{ClientConfig, Console, InitOptions, LogValue, Logmonitor, StdConsole};

/// Walks through a login / action / error / logout session with an
/// intercepted console. Set `LOGMONITOR_ENV=production` and
/// `LOGMONITOR_ENDPOINT` to actually ship the captured calls.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Logmonitor::with_http(ClientConfig::from_env()?)?;
    client.init(InitOptions::new(
        std::env::var("LOGMONITOR_API_KEY").unwrap_or_else(|_| "YOUR_LOGMONITOR_API_KEY".into()),
    ));
    let console = client.intercept(StdConsole);

    console.log(&[LogValue::from("App started successfully!")]);

    let user_id = format!("user_{}", std::process::id() % 1000);
    client.set_user(user_id.clone());
    console.log(&[LogValue::from(format!("User {} has been identified.", user_id))]);

    let mut details = BTreeMap::new();
    details.insert("buttonId".to_string(), LogValue::from("action-btn"));
    details.insert(
        "timestamp".to_string(),
        LogValue::from(chrono::Utc::now().to_rfc3339()),
    );
    console.warn(&[
        LogValue::from("A user performed an important action."),
        LogValue::Map(details),
    ]);

    let err = std::io::Error::new(
        std::io::ErrorKind::Other,
        "This is a simulated production error!",
    );
    console.error(&[
        LogValue::from("A critical error occurred:"),
        LogValue::opaque(&err),
    ]);

    console.info(&[LogValue::from("User is logging out.")]);
    client.clear_user();

    client.dispose().await;
    println!("buffered after dispose: {}, stats: {:?}", client.buffered_len(), client.stats());
    Ok(())
}
