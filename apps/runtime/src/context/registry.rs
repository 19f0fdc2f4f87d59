use std::sync::Arc;

use seniorlink_core::config::SyncConfig;
use seniorlink_core::seniors::SeniorCitizensGateway;
use seniorlink_core::sync::{ConnectivityState, EntityGateway, LocalStore, SyncOrchestrator};
use seniorlink_native_storage::ImageStore;
use seniorlink_remote_api::RemoteApiClient;

pub struct ServiceContext {
    pub config: SyncConfig,

    /// Local Store every gateway writes through (native adapter on native hosts).
    pub local_store: Arc<dyn LocalStore>,
    pub connectivity: Arc<ConnectivityState>,
    /// `None` when no API URL is configured.
    pub remote_client: Option<Arc<RemoteApiClient>>,

    // Services
    pub seniors_gateway: SeniorCitizensGateway,
    pub announcements_gateway: Arc<EntityGateway>,
    pub sync_orchestrator: Arc<SyncOrchestrator>,
    pub image_store: Arc<ImageStore>,
}

impl ServiceContext {
    pub fn local_store(&self) -> Arc<dyn LocalStore> {
        Arc::clone(&self.local_store)
    }

    pub fn connectivity(&self) -> Arc<ConnectivityState> {
        Arc::clone(&self.connectivity)
    }

    pub fn remote_client(&self) -> Option<Arc<RemoteApiClient>> {
        self.remote_client.clone()
    }

    pub fn seniors_gateway(&self) -> SeniorCitizensGateway {
        self.seniors_gateway.clone()
    }

    pub fn announcements_gateway(&self) -> Arc<EntityGateway> {
        Arc::clone(&self.announcements_gateway)
    }

    pub fn sync_orchestrator(&self) -> Arc<SyncOrchestrator> {
        Arc::clone(&self.sync_orchestrator)
    }

    pub fn image_store(&self) -> Arc<ImageStore> {
        Arc::clone(&self.image_store)
    }
}
