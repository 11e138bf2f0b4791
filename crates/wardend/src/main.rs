use anyhow::Result;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod engine;

use dbus_interface::{WardenService, BUS_NAME, OBJECT_PATH};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::Config::from_env();
    tracing::info!(
        officer = %config.officer,
        prison = %config.prison,
        location = %config.location,
        "wardend starting"
    );

    let engine = engine::spawn_engine(&config)?;
    let service = WardenService::new(engine.clone(), &config);

    let builder = if config.system_bus {
        zbus::connection::Builder::system()?
    } else {
        zbus::connection::Builder::session()?
    };
    let _connection = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, service)?
        .build()
        .await?;

    tracing::info!(
        bus = if config.system_bus { "system" } else { "session" },
        name = BUS_NAME,
        "wardend ready"
    );

    if config.summary_interval_secs > 0 {
        let summary_engine = engine.clone();
        let period = Duration::from_secs(config.summary_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = summary_engine.post_summary().await {
                    tracing::warn!(error = %e, "stopping daily summary timer");
                    break;
                }
            }
        });
    }

    // Keep running until signaled
    tokio::signal::ctrl_c().await?;
    tracing::info!("wardend shutting down");

    Ok(())
}
