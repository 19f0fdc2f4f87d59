//! Sync Orchestrator: drains the sync queue against the remote API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::errors::{Error, Result};

use super::connectivity::ConnectivityMonitor;
use super::gateway::{EntityGateway, ReplayOutcome};
use super::local_store::LocalStore;
use super::sync_model::{
    is_temp_id, GatewayResponse, SyncEntity, SyncOperation, SyncQueueItem, SyncStatus,
    SyncSummary, LAST_SYNC_TIME_KEY,
};

pub const OFFLINE_SYNC_ERROR: &str = "Cannot sync while offline";

pub struct SyncOrchestrator {
    store: Arc<dyn LocalStore>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    gateways: HashMap<SyncEntity, Arc<EntityGateway>>,
    cycle_mutex: Mutex<()>,
    background_task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncOrchestrator {
    pub fn new(store: Arc<dyn LocalStore>, connectivity: Arc<dyn ConnectivityMonitor>) -> Self {
        Self {
            store,
            connectivity,
            gateways: HashMap::new(),
            cycle_mutex: Mutex::new(()),
            background_task: Mutex::new(None),
        }
    }

    /// Registers the gateway that replays queue items of its entity.
    pub fn with_gateway(mut self, gateway: Arc<EntityGateway>) -> Self {
        self.gateways.insert(gateway.entity(), gateway);
        self
    }

    pub fn gateway(&self, entity: SyncEntity) -> Option<Arc<EntityGateway>> {
        self.gateways.get(&entity).cloned()
    }

    /// Runs one sequential pass over the sync queue.
    ///
    /// Refuses to start while offline. A failing item is logged and kept; it
    /// never blocks the items behind it. The call succeeds even when items
    /// remain queued.
    pub async fn sync_pending(&self) -> GatewayResponse<SyncSummary> {
        if !self.connectivity.is_online() {
            return GatewayResponse::failure(OFFLINE_SYNC_ERROR, Some(true));
        }

        let _cycle_guard = self.cycle_mutex.lock().await;
        let started_at = Instant::now();

        let pending = match self.store.get_pending_sync_items().await {
            Ok(items) => items,
            Err(err) => {
                error!("[SyncOrchestrator] Failed to read sync queue: {}", err);
                return GatewayResponse::failure(
                    format!("Failed to read sync queue: {}", err),
                    Some(false),
                );
            }
        };

        let mut summary = SyncSummary::default();
        // temp id -> server id, carried across passes for ids the UI still holds
        let (mut resolved_ids, persist_resolved) = match self.store.resolved_temp_ids().await {
            Ok(ids) => (ids, true),
            Err(err) => {
                warn!("[SyncOrchestrator] Failed to read resolved ids: {}", err);
                (HashMap::new(), false)
            }
        };
        let resolved_before = resolved_ids.len();
        let mut kept: Vec<(Arc<EntityGateway>, SyncQueueItem, String)> = Vec::new();

        for item in pending {
            let Some(gateway) = self.gateways.get(&item.operation.entity) else {
                warn!(
                    "[SyncOrchestrator] No gateway registered for {}; leaving item {} queued",
                    item.operation, item.id
                );
                summary.skipped_items += 1;
                continue;
            };

            let target_id = resolved_ids
                .get(&item.entity_id)
                .cloned()
                .unwrap_or_else(|| item.entity_id.clone());

            if item.operation.op != SyncOperation::Create && is_temp_id(&target_id) {
                debug!(
                    "[SyncOrchestrator] Skipping {} for {}: its create has not synced yet",
                    item.operation, target_id
                );
                summary.skipped_items += 1;
                continue;
            }

            match gateway.replay(&item, &target_id).await {
                Ok(outcome) => {
                    if let ReplayOutcome::Created {
                        local_id,
                        server_id,
                    } = &outcome
                    {
                        if local_id != server_id {
                            resolved_ids.insert(local_id.clone(), server_id.clone());
                        }
                    }
                    summary.synced_items += 1;
                    if let Err(err) = self.store.remove_sync_item(&item.id).await {
                        // The remote already applied this item; it will be replayed again.
                        error!(
                            "[SyncOrchestrator] Replayed {} but could not dequeue item {}: {}",
                            item.operation, item.id, err
                        );
                    }
                }
                Err(err) => {
                    summary.failed_items += 1;
                    warn!(
                        "[SyncOrchestrator] Failed to replay {} ({}): {}",
                        item.operation, item.id, err
                    );
                    let item = self.keep_failed_item(item, &target_id, &err).await;
                    kept.push((Arc::clone(gateway), item, target_id));
                }
            }
        }

        // Replays that succeeded after a failed one mirrored canonical copies
        // that lack the failed mutation.
        for (gateway, item, target_id) in &kept {
            if let Err(err) = gateway.restore_pending(item, target_id).await {
                warn!(
                    "[SyncOrchestrator] Failed to restore local copy of {} for item {}: {}",
                    target_id, item.id, err
                );
            }
        }

        if persist_resolved && resolved_ids.len() != resolved_before {
            if let Err(err) = self.store.save_resolved_temp_ids(&resolved_ids).await {
                warn!("[SyncOrchestrator] Failed to persist resolved ids: {}", err);
            }
        }

        let now = Utc::now().to_rfc3339();
        if let Err(err) = self
            .store
            .save_preference(LAST_SYNC_TIME_KEY, Value::String(now))
            .await
        {
            warn!("[SyncOrchestrator] Failed to persist last sync time: {}", err);
        }

        info!(
            "[SyncOrchestrator] Sync pass finished in {}ms: synced={} failed={} skipped={}",
            started_at.elapsed().as_millis(),
            summary.synced_items,
            summary.failed_items,
            summary.skipped_items
        );

        GatewayResponse::online(Some(summary))
    }

    /// Leaves a failed item queued, retargeted at its server id when an
    /// earlier CREATE resolved it.
    async fn keep_failed_item(
        &self,
        mut item: SyncQueueItem,
        target_id: &str,
        err: &Error,
    ) -> SyncQueueItem {
        if item.entity_id != target_id {
            item.entity_id = target_id.to_string();
            if let Value::Object(data) = &mut item.data {
                data.insert("id".to_string(), Value::String(target_id.to_string()));
            }
            if let Err(store_err) = self.store.push_sync_item(item.clone()).await {
                warn!(
                    "[SyncOrchestrator] Failed to retarget queue item {}: {}",
                    item.id, store_err
                );
            }
        }

        let code = match err {
            Error::Remote(failure) => Some(failure.code()),
            _ => None,
        };
        if let Err(store_err) = self
            .store
            .record_sync_failure(&item.id, &err.to_string(), code)
            .await
        {
            warn!(
                "[SyncOrchestrator] Failed to record failure on queue item {}: {}",
                item.id, store_err
            );
        }
        item
    }

    pub async fn status(&self) -> Result<SyncStatus> {
        let pending_count = self.store.pending_sync_count().await?;
        let last_sync_time = self
            .store
            .get_preference(LAST_SYNC_TIME_KEY)
            .await?
            .and_then(|value| value.as_str().map(str::to_string));
        Ok(SyncStatus {
            is_online: self.connectivity.is_online(),
            pending_count,
            last_sync_time,
        })
    }

    /// Starts a background task that runs a sync pass on every
    /// offline→online transition. Calling it again while running is a no-op.
    pub async fn ensure_reconnect_listener_started(self: &Arc<Self>) {
        let mut task = self.background_task.lock().await;
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let orchestrator = Arc::clone(self);
        let mut online_rx = self.connectivity.subscribe();
        *task = Some(tokio::spawn(async move {
            let mut was_online = *online_rx.borrow_and_update();
            while online_rx.changed().await.is_ok() {
                let online = *online_rx.borrow_and_update();
                if online && !was_online {
                    info!("[SyncOrchestrator] Connectivity restored, draining sync queue");
                    let response = orchestrator.sync_pending().await;
                    if !response.success {
                        warn!(
                            "[SyncOrchestrator] Reconnect sync did not run: {}",
                            response.error.unwrap_or_default()
                        );
                    }
                }
                was_online = online;
            }
            debug!("[SyncOrchestrator] Connectivity channel closed, listener exiting");
        }));
        info!("[SyncOrchestrator] Reconnect listener started");
    }

    pub async fn ensure_reconnect_listener_stopped(&self) {
        if let Some(handle) = self.background_task.lock().await.take() {
            handle.abort();
            info!("[SyncOrchestrator] Reconnect listener stopped");
        }
    }
}
