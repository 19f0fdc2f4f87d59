use std::time::Duration;

use log::{error, info};

use seniorlink_core::config::SyncConfig;
use seniorlink_runtime::build_service_context;
use seniorlink_runtime::commands::sync;

const USAGE: &str = "usage: seniorlink [sync|status|reset|watch]";
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "sync".to_string());
    let config = SyncConfig::from_env()?;
    info!(
        "Starting SeniorLink sync core (host: {:?}, data dir: {})",
        config.host,
        config.data_dir.display()
    );
    let context = build_service_context(config).await?;

    match command.as_str() {
        "sync" => {
            let response = sync::run_sync(context.clone()).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        "status" => {}
        "watch" => {
            // The listener drains the queue whenever a health check flips the host online.
            sync::start_reconnect_listener(context.clone()).await;
            let mut health_check = tokio::time::interval(HEALTH_CHECK_INTERVAL);
            info!("Watching connectivity; press Ctrl-C to stop");
            loop {
                tokio::select! {
                    _ = health_check.tick() => {
                        sync::check_connectivity(context.clone()).await;
                    }
                    signal = tokio::signal::ctrl_c() => {
                        signal?;
                        break;
                    }
                }
            }
            sync::stop_reconnect_listener(context.clone()).await;
        }
        "reset" => sync::reset_local_cache(context.clone())
            .await
            .map_err(anyhow::Error::msg)?,
        other => {
            error!("Unknown command '{}'", other);
            anyhow::bail!(USAGE);
        }
    }

    let status = sync::sync_status(context)
        .await
        .map_err(anyhow::Error::msg)?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
