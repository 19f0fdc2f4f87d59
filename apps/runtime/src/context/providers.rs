//! Builds the service graph from configuration.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use log::{error, info, warn};
use serde_json::{Map, Value};

use seniorlink_core::config::{HostPlatform, SyncConfig};
use seniorlink_core::seniors::SeniorCitizensGateway;
use seniorlink_core::sync::{
    ConnectivityState, EntityGateway, EntityRecord, EntityRemoteApi, LocalStore,
    MemoryLocalStore, RecordFilter, RemoteFailure, RemoteResult, SyncEntity, SyncOrchestrator,
};
use seniorlink_native_storage::{ImageStore, NativeStorageAdapter};
use seniorlink_remote_api::RemoteApiClient;
use seniorlink_storage_sqlite::SqliteLocalStore;

use super::ServiceContext;

/// Remote used when no API URL is configured; every call is unreachable.
pub struct UnconfiguredRemote;

fn not_configured() -> RemoteFailure {
    RemoteFailure::unreachable("Remote API is not configured")
}

#[async_trait]
impl EntityRemoteApi for UnconfiguredRemote {
    async fn create(
        &self,
        _entity: SyncEntity,
        _data: &Map<String, Value>,
        _idempotency_key: Option<&str>,
    ) -> RemoteResult<EntityRecord> {
        Err(not_configured())
    }

    async fn update(
        &self,
        _entity: SyncEntity,
        _id: &str,
        _data: &Map<String, Value>,
        _idempotency_key: Option<&str>,
    ) -> RemoteResult<EntityRecord> {
        Err(not_configured())
    }

    async fn delete(
        &self,
        _entity: SyncEntity,
        _id: &str,
        _idempotency_key: Option<&str>,
    ) -> RemoteResult<()> {
        Err(not_configured())
    }

    async fn get(&self, _entity: SyncEntity, _id: &str) -> RemoteResult<Option<EntityRecord>> {
        Err(not_configured())
    }

    async fn list(
        &self,
        _entity: SyncEntity,
        _filter: Option<&RecordFilter>,
    ) -> RemoteResult<Vec<EntityRecord>> {
        Err(not_configured())
    }
}

fn open_local_store(config: &SyncConfig) -> Arc<dyn LocalStore> {
    let durable: Arc<dyn LocalStore> = match SqliteLocalStore::open(&config.data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            // Data written now lives only as long as the process.
            error!(
                "Failed to open local store at {}: {}. Using an in-memory store.",
                config.data_dir.display(),
                e
            );
            Arc::new(MemoryLocalStore::new())
        }
    };

    match config.host {
        HostPlatform::Native => Arc::new(NativeStorageAdapter::new(&config.data_dir, durable)),
        HostPlatform::Web => durable,
    }
}

/// Wires stores, gateways and the orchestrator. The host starts offline when
/// the remote is not configured or does not answer its health check.
pub async fn build_service_context(config: SyncConfig) -> anyhow::Result<Arc<ServiceContext>> {
    let remote_client = RemoteApiClient::from_config(&config)
        .context("Failed to build remote API client")?;

    let initially_online = match &remote_client {
        Some(client) => match client.ping().await {
            Ok(health) => {
                info!("Remote API reachable at {} ({})", client.base_url(), health.status);
                true
            }
            Err(e) => {
                warn!("Remote API health check failed, starting offline: {}", e);
                false
            }
        },
        None => {
            warn!("Remote API is not configured; running offline only");
            false
        }
    };

    let remote_client = remote_client.map(Arc::new);
    let remote: Arc<dyn EntityRemoteApi> = match &remote_client {
        Some(client) => Arc::clone(client) as Arc<dyn EntityRemoteApi>,
        None => Arc::new(UnconfiguredRemote),
    };
    let local_store = open_local_store(&config);
    let connectivity = Arc::new(ConnectivityState::new(initially_online));

    let gateway_for = |entity: SyncEntity| {
        Arc::new(
            EntityGateway::new(
                entity,
                Arc::clone(&remote),
                Arc::clone(&local_store),
                connectivity.clone(),
            )
            .with_remote_timeout(config.remote_timeout),
        )
    };
    let seniors = gateway_for(SyncEntity::Senior);
    let announcements = gateway_for(SyncEntity::Announcement);

    let sync_orchestrator = Arc::new(
        SyncOrchestrator::new(Arc::clone(&local_store), connectivity.clone())
            .with_gateway(Arc::clone(&seniors))
            .with_gateway(Arc::clone(&announcements)),
    );
    let image_store = Arc::new(ImageStore::new(
        config.host,
        config.data_dir.clone(),
        Arc::clone(&local_store),
    ));

    Ok(Arc::new(ServiceContext {
        config,
        local_store,
        connectivity,
        remote_client,
        seniors_gateway: SeniorCitizensGateway::new(seniors),
        announcements_gateway: announcements,
        sync_orchestrator,
        image_store,
    }))
}
