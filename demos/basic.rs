use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::EnvFilter;
use webhook_fanout::{DispatchMode, Dispatcher, DispatcherConfig, EndpointRegistration};

const CONFIG: &str = r#"{
    "default_secret": "bp_monitor_webhook_secret",
    "default_endpoints": {
        "bp_reading": ["http://localhost:5174/api/webhooks/bp-reading"],
        "alert": ["http://localhost:5174/api/webhooks/alert"]
    }
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = DispatcherConfig::from_json(CONFIG)?;
    let dispatcher = Arc::new(Dispatcher::new(config));
    dispatcher.load_default_endpoints().await;

    dispatcher
        .register_endpoint(
            EndpointRegistration::new("pager", "https://example.com/webhook", ["alert"])
                .with_secret("supersecret")
                .with_max_retries(1)
                .with_header("X-Team", "cardiology"),
        )
        .await;

    let event = dispatcher.create_event(
        "alert",
        json!({"alert_type": "bp_critical", "message": "Reading above 180/120", "severity": "high"}),
        None,
    );
    let report = dispatcher.dispatch(&event, DispatchMode::Concurrent).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("{}", serde_json::to_string_pretty(&dispatcher.stats().await)?);
    Ok(())
}
