//! Remote API collaborator contract consumed by gateways.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::sync_model::{EntityRecord, RecordFilter, SyncEntity};
use super::sync_policy::RemoteFailure;

pub type RemoteResult<T> = std::result::Result<T, RemoteFailure>;

/// Per-entity CRUD calls against the hosted database.
///
/// `idempotency_key` is set when a queued mutation is replayed so the server
/// can deduplicate repeated deliveries of the same item.
#[async_trait]
pub trait EntityRemoteApi: Send + Sync {
    async fn create(
        &self,
        entity: SyncEntity,
        data: &Map<String, Value>,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<EntityRecord>;

    async fn update(
        &self,
        entity: SyncEntity,
        id: &str,
        data: &Map<String, Value>,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<EntityRecord>;

    async fn delete(
        &self,
        entity: SyncEntity,
        id: &str,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<()>;

    /// `Ok(None)` when the server reports the record as missing.
    async fn get(&self, entity: SyncEntity, id: &str) -> RemoteResult<Option<EntityRecord>>;

    async fn list(
        &self,
        entity: SyncEntity,
        filter: Option<&RecordFilter>,
    ) -> RemoteResult<Vec<EntityRecord>>;
}
