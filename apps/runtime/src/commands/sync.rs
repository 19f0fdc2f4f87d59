//! Sync commands exposed to the host shell.

use std::sync::Arc;

use log::{debug, info};

use seniorlink_core::sync::{GatewayResponse, SyncStatus, SyncSummary};

use crate::context::ServiceContext;

/// Runs one sync pass. Offline hosts get an unsuccessful envelope, not an error.
pub async fn run_sync(context: Arc<ServiceContext>) -> GatewayResponse<SyncSummary> {
    context.sync_orchestrator().sync_pending().await
}

pub async fn sync_status(context: Arc<ServiceContext>) -> Result<SyncStatus, String> {
    context
        .sync_orchestrator()
        .status()
        .await
        .map_err(|e| format!("Failed to read sync status: {}", e))
}

/// Host network-status callback.
pub fn set_online(context: Arc<ServiceContext>, online: bool) {
    context.connectivity().set_online(online);
}

/// Probes the remote health endpoint and records the answer as the host's
/// connectivity. Without a configured remote the host stays offline.
pub async fn check_connectivity(context: Arc<ServiceContext>) -> bool {
    let online = match context.remote_client() {
        Some(client) => match client.ping().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        },
        None => false,
    };
    context.connectivity().set_online(online);
    online
}

pub async fn start_reconnect_listener(context: Arc<ServiceContext>) {
    context
        .sync_orchestrator()
        .ensure_reconnect_listener_started()
        .await;
}

pub async fn stop_reconnect_listener(context: Arc<ServiceContext>) {
    context
        .sync_orchestrator()
        .ensure_reconnect_listener_stopped()
        .await;
}

/// Drops every cached record, queued mutation and preference.
pub async fn reset_local_cache(context: Arc<ServiceContext>) -> Result<(), String> {
    context
        .local_store()
        .clear_all_data()
        .await
        .map_err(|e| format!("Failed to clear local data: {}", e))?;
    info!("Local cache reset");
    Ok(())
}
