//! Entity Gateway: online-first CRUD with silent fallback to the Local Store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde_json::{Map, Value};
use tokio::time::timeout;

use crate::config::DEFAULT_REMOTE_TIMEOUT_SECS;
use crate::errors::{Error, Result};

use super::connectivity::ConnectivityMonitor;
use super::local_store::LocalStore;
use super::remote::{EntityRemoteApi, RemoteResult};
use super::sync_model::{
    apply_filter, generate_temp_id, is_temp_id, EntityRecord, GatewayResponse, RecordFilter, SyncEntity,
    SyncOperation, SyncOperationTag, SyncQueueItem, DEFAULT_SYNC_PRIORITY,
};
use super::sync_policy::RemoteFailure;

/// What a successful replay did to the local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// The record now lives under `server_id`; `local_id` is the id it was queued with.
    Created { local_id: String, server_id: String },
    Updated { id: String },
    Deleted { id: String },
}

fn clean_payload(data: &Map<String, Value>) -> Map<String, Value> {
    let mut payload = data.clone();
    payload.remove("id");
    payload.remove("offline");
    payload.remove("synced");
    payload
}

/// Per-entity façade that keeps one CRUD contract regardless of connectivity.
///
/// The UI never reaches the Local Store or the remote API directly; every
/// failure is turned into a [`GatewayResponse`] instead of an error.
pub struct EntityGateway {
    entity: SyncEntity,
    remote: Arc<dyn EntityRemoteApi>,
    store: Arc<dyn LocalStore>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    remote_timeout: Duration,
}

impl EntityGateway {
    pub fn new(
        entity: SyncEntity,
        remote: Arc<dyn EntityRemoteApi>,
        store: Arc<dyn LocalStore>,
        connectivity: Arc<dyn ConnectivityMonitor>,
    ) -> Self {
        Self {
            entity,
            remote,
            store,
            connectivity,
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
        }
    }

    /// Deadline applied to every remote call made by this gateway.
    pub fn with_remote_timeout(mut self, remote_timeout: Duration) -> Self {
        self.remote_timeout = remote_timeout;
        self
    }

    pub fn entity(&self) -> SyncEntity {
        self.entity
    }

    fn collection(&self) -> &'static str {
        self.entity.collection()
    }

    fn not_found_message(&self) -> String {
        format!("{} not found", self.entity.label())
    }

    /// Runs a remote call under the gateway deadline. Dropping the call on
    /// expiry cancels it.
    async fn call_remote<T, F>(&self, call: F) -> RemoteResult<T>
    where
        F: Future<Output = RemoteResult<T>>,
    {
        match timeout(self.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteFailure::TimedOut),
        }
    }

    fn log_degrade(&self, action: &str, failure: &RemoteFailure) {
        if failure.is_transient() {
            debug!(
                "[Gateway] {} {} fell back to local store ({}): {}",
                self.entity.label(),
                action,
                failure.code(),
                failure
            );
        } else {
            warn!(
                "[Gateway] {} {} rejected remotely, falling back to local store ({}): {}",
                self.entity.label(),
                action,
                failure.code(),
                failure
            );
        }
    }

    /// Mirrors a canonical record; a mirror failure never fails the call.
    async fn mirror_save(&self, record: EntityRecord) {
        if let Err(err) = self.store.save(self.collection(), record).await {
            warn!(
                "[Gateway] Failed to mirror {} into local store: {}",
                self.entity.label(),
                err
            );
        }
    }

    /// Mirrors a record read from the server unless the local copy still
    /// holds offline changes that have not been replayed.
    async fn mirror_read(&self, record: EntityRecord) {
        match self.store.get(self.collection(), &record.id).await {
            Ok(Some(existing)) if existing.offline => {
                debug!(
                    "[Gateway] Keeping pending local copy of {} {}",
                    self.entity.label(),
                    record.id
                );
            }
            Ok(_) => self.mirror_save(record).await,
            Err(err) => warn!(
                "[Gateway] Failed to read local copy of {} {}: {}",
                self.entity.label(),
                record.id,
                err
            ),
        }
    }

    async fn mirror_delete(&self, id: &str) {
        if let Err(err) = self.store.delete(self.collection(), id).await {
            warn!(
                "[Gateway] Failed to remove {} {} from local store: {}",
                self.entity.label(),
                id,
                err
            );
        }
    }

    /// A temporary id whose CREATE already synced in an earlier pass maps to
    /// its server id; any other id is returned as is.
    async fn resolve_id(&self, id: &str) -> String {
        if !is_temp_id(id) {
            return id.to_string();
        }
        if let Ok(Some(_)) = self.store.get(self.collection(), id).await {
            return id.to_string();
        }
        match self.store.resolved_temp_ids().await {
            Ok(ids) => ids.get(id).cloned().unwrap_or_else(|| id.to_string()),
            Err(err) => {
                warn!(
                    "[Gateway] Failed to read resolved ids for {} {}: {}",
                    self.entity.label(),
                    id,
                    err
                );
                id.to_string()
            }
        }
    }

    async fn enqueue(&self, op: SyncOperation, data: Value) -> Result<SyncQueueItem> {
        self.store
            .add_to_sync_queue(
                SyncOperationTag::new(op, self.entity),
                data,
                DEFAULT_SYNC_PRIORITY,
            )
            .await
    }

    pub async fn create(&self, data: &Map<String, Value>) -> GatewayResponse<EntityRecord> {
        let payload = clean_payload(data);

        if self.connectivity.is_online() {
            match self
                .call_remote(self.remote.create(self.entity, &payload, None))
                .await
            {
                Ok(record) => {
                    let record = record.into_synced();
                    self.mirror_save(record.clone()).await;
                    return GatewayResponse::online(Some(record));
                }
                Err(failure) => self.log_degrade("create", &failure),
            }
        }

        let record = EntityRecord::new(generate_temp_id(), payload).into_offline();
        let write = async {
            self.store.save(self.collection(), record.clone()).await?;
            self.enqueue(SyncOperation::Create, record.to_value()).await
        };
        match write.await {
            Ok(item) => {
                debug!(
                    "[Gateway] Queued offline create of {} {} (queue item {})",
                    self.entity.label(),
                    record.id,
                    item.id
                );
                GatewayResponse::local(Some(record))
            }
            Err(err) => GatewayResponse::failure(err.to_string(), Some(true)),
        }
    }

    pub async fn update(
        &self,
        id: &str,
        changes: &Map<String, Value>,
    ) -> GatewayResponse<EntityRecord> {
        let payload = clean_payload(changes);
        let id = self.resolve_id(id).await;
        let id = id.as_str();

        if self.connectivity.is_online() {
            match self
                .call_remote(self.remote.update(self.entity, id, &payload, None))
                .await
            {
                Ok(record) => {
                    let record = record.into_synced();
                    self.mirror_save(record.clone()).await;
                    return GatewayResponse::online(Some(record));
                }
                Err(failure) => self.log_degrade("update", &failure),
            }
        }

        let write = async {
            let mut record = match self.store.get(self.collection(), id).await? {
                Some(record) => record,
                // nothing can ever replay an update against an unknown temp id
                None if is_temp_id(id) => {
                    return Err(Error::NotFound(self.entity.label().to_string()))
                }
                None => EntityRecord::new(id, Map::new()),
            };
            record.merge_fields(&payload);
            let record = record.into_offline();
            self.store.save(self.collection(), record.clone()).await?;

            let mut queued = payload.clone();
            queued.insert("id".to_string(), Value::String(id.to_string()));
            self.enqueue(SyncOperation::Update, Value::Object(queued))
                .await?;
            Ok::<_, Error>(record)
        };
        match write.await {
            Ok(record) => GatewayResponse::local(Some(record)),
            Err(err) => GatewayResponse::failure(err.to_string(), Some(true)),
        }
    }

    pub async fn delete(&self, id: &str) -> GatewayResponse<()> {
        let id = self.resolve_id(id).await;
        let id = id.as_str();

        if self.connectivity.is_online() {
            match self
                .call_remote(self.remote.delete(self.entity, id, None))
                .await
            {
                Ok(()) | Err(RemoteFailure::NotFound { .. }) => {
                    self.mirror_delete(id).await;
                    return GatewayResponse::online(None);
                }
                Err(failure) => self.log_degrade("delete", &failure),
            }
        }

        let write = async {
            // a temp id that never reached the server has nothing to delete remotely
            if is_temp_id(id) && self.store.get(self.collection(), id).await?.is_none() {
                return Ok::<_, Error>(None);
            }
            self.store.delete(self.collection(), id).await?;
            self.enqueue(SyncOperation::Delete, serde_json::json!({ "id": id }))
                .await
                .map(Some)
        };
        match write.await {
            Ok(_) => GatewayResponse::local(None),
            Err(err) => GatewayResponse::failure(err.to_string(), Some(true)),
        }
    }

    pub async fn get(&self, id: &str) -> GatewayResponse<EntityRecord> {
        let id = self.resolve_id(id).await;
        let id = id.as_str();

        if self.connectivity.is_online() {
            match self.call_remote(self.remote.get(self.entity, id)).await {
                Ok(Some(record)) => {
                    let record = record.into_synced();
                    self.mirror_read(record.clone()).await;
                    return GatewayResponse::online(Some(record));
                }
                Ok(None) => debug!(
                    "[Gateway] {} {} not found remotely, checking local store",
                    self.entity.label(),
                    id
                ),
                Err(failure) => self.log_degrade("get", &failure),
            }
        }

        match self.store.get(self.collection(), id).await {
            Ok(Some(record)) => GatewayResponse::local(Some(record)),
            Ok(None) => GatewayResponse::failure(self.not_found_message(), Some(true)),
            Err(err) => GatewayResponse::failure(err.to_string(), Some(true)),
        }
    }

    /// Filter semantics are identical on the remote and local paths.
    pub async fn get_all(
        &self,
        filter: Option<&RecordFilter>,
    ) -> GatewayResponse<Vec<EntityRecord>> {
        if self.connectivity.is_online() {
            match self.call_remote(self.remote.list(self.entity, filter)).await {
                Ok(records) => {
                    let records: Vec<EntityRecord> = apply_filter(records, filter)
                        .into_iter()
                        .map(EntityRecord::into_synced)
                        .collect();
                    for record in &records {
                        self.mirror_read(record.clone()).await;
                    }
                    return GatewayResponse::online(Some(records));
                }
                Err(failure) => self.log_degrade("list", &failure),
            }
        }

        match self.store.get_all(self.collection(), filter).await {
            Ok(records) => GatewayResponse::local(Some(records)),
            Err(err) => GatewayResponse::failure(err.to_string(), Some(true)),
        }
    }

    /// Replays one queued mutation against the remote API without any
    /// fallback, writing the canonical result into the Local Store.
    ///
    /// `target_id` is the id to address remotely; it differs from
    /// `item.entity_id` once an earlier CREATE in the same pass resolved a
    /// temporary id.
    pub async fn replay(&self, item: &SyncQueueItem, target_id: &str) -> Result<ReplayOutcome> {
        let key = Some(item.idempotency_key.as_str());
        let fields = match &item.data {
            Value::Object(map) => clean_payload(map),
            _ => {
                return Err(Error::invalid_data(format!(
                    "Queue item {} carries a non-object payload",
                    item.id
                )))
            }
        };

        match item.operation.op {
            SyncOperation::Create => {
                let record = self
                    .call_remote(self.remote.create(self.entity, &fields, key))
                    .await?
                    .into_synced();
                let server_id = record.id.clone();
                if server_id != target_id {
                    self.mirror_delete(target_id).await;
                }
                self.mirror_save(record).await;
                Ok(ReplayOutcome::Created {
                    local_id: target_id.to_string(),
                    server_id,
                })
            }
            SyncOperation::Update => {
                let record = self
                    .call_remote(self.remote.update(self.entity, target_id, &fields, key))
                    .await?
                    .into_synced();
                self.mirror_save(record).await;
                Ok(ReplayOutcome::Updated {
                    id: target_id.to_string(),
                })
            }
            SyncOperation::Delete => {
                match self
                    .call_remote(self.remote.delete(self.entity, target_id, key))
                    .await
                {
                    Ok(()) | Err(RemoteFailure::NotFound { .. }) => {}
                    Err(failure) => return Err(failure.into()),
                }
                self.mirror_delete(target_id).await;
                Ok(ReplayOutcome::Deleted {
                    id: target_id.to_string(),
                })
            }
        }
    }

    /// Re-applies a mutation that is still queued onto the local copy of
    /// `target_id`, leaving it `offline`. Canonical copies mirrored earlier in
    /// the pass do not carry it yet.
    pub async fn restore_pending(&self, item: &SyncQueueItem, target_id: &str) -> Result<()> {
        match item.operation.op {
            SyncOperation::Delete => self.store.delete(self.collection(), target_id).await,
            // a failed create never touched the local copy
            SyncOperation::Create => Ok(()),
            SyncOperation::Update => {
                let Value::Object(data) = &item.data else {
                    return Ok(());
                };
                // gone locally means a queued delete already removed it
                let Some(mut record) = self.store.get(self.collection(), target_id).await? else {
                    return Ok(());
                };
                record.merge_fields(&clean_payload(data));
                self.store
                    .save(self.collection(), record.into_offline())
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::test_support::{object, MockRemote};
    use crate::sync::{
        is_temp_id, ConnectivityState, MemoryLocalStore, SENIORS_COLLECTION,
    };
    use serde_json::json;

    fn gateway(
        remote: Arc<MockRemote>,
        store: Arc<MemoryLocalStore>,
        online: bool,
    ) -> EntityGateway {
        EntityGateway::new(
            SyncEntity::Senior,
            remote,
            store,
            Arc::new(ConnectivityState::new(online)),
        )
    }

    #[tokio::test]
    async fn offline_create_assigns_temp_id_and_queues() {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryLocalStore::new());
        let gw = gateway(remote.clone(), store.clone(), false);

        let response = gw.create(&object(json!({ "name": "Maria" }))).await;
        assert!(response.success);
        assert_eq!(response.offline, Some(true));
        assert_eq!(response.synced, Some(false));
        let record = response.data.expect("record");
        assert!(is_temp_id(&record.id), "unexpected id {}", record.id);

        let read_back = gw.get(&record.id).await;
        assert_eq!(read_back.data.expect("local copy").id, record.id);

        let queue = store.get_pending_sync_items().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].operation.to_string(), "CREATE_SENIOR");
        assert_eq!(queue[0].entity_id, record.id);
        assert_eq!(remote.call_count(), 0, "offline path never calls remote");
    }

    #[tokio::test]
    async fn failed_remote_mutations_land_in_local_store() {
        let remote = Arc::new(MockRemote::new());
        remote.fail_all(RemoteFailure::from_status(500, "boom"));
        let store = Arc::new(MemoryLocalStore::new());
        let gw = gateway(remote.clone(), store.clone(), true);

        let created = gw.create(&object(json!({ "name": "Lito" }))).await;
        assert!(created.success);
        assert!(created.is_offline());
        let id = created.data.unwrap().id;

        let updated = gw
            .update(&id, &object(json!({ "barangay": "San Roque" })))
            .await;
        assert!(updated.success);

        let stored = store
            .get(SENIORS_COLLECTION, &id)
            .await
            .unwrap()
            .expect("stored locally");
        assert!(stored.offline);
        assert!(!stored.synced);
        assert_eq!(stored.field("name"), Some(&json!("Lito")));
        assert_eq!(stored.field("barangay"), Some(&json!("San Roque")));
        assert_eq!(store.pending_sync_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn timed_out_remote_call_degrades_to_local() {
        let remote = Arc::new(MockRemote::new());
        remote.set_delay(Duration::from_millis(200));
        let store = Arc::new(MemoryLocalStore::new());
        let gw = gateway(remote, store.clone(), true)
            .with_remote_timeout(Duration::from_millis(20));

        let response = gw.create(&object(json!({ "name": "Slow" }))).await;
        assert!(response.success);
        assert!(response.is_offline());
        assert_eq!(store.pending_sync_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn online_update_mirrors_without_queueing() {
        let remote = Arc::new(MockRemote::new());
        remote.seed(SyncEntity::Senior, json!({ "id": "s-1", "name": "Maria" }));
        let store = Arc::new(MemoryLocalStore::new());
        let gw = gateway(remote, store.clone(), true);

        let response = gw
            .update("s-1", &object(json!({ "name": "Maria Santos" })))
            .await;
        assert!(response.success);
        assert_eq!(response.offline, Some(false));
        assert_eq!(response.synced, Some(true));

        let mirrored = store.get(SENIORS_COLLECTION, "s-1").await.unwrap().unwrap();
        assert_eq!(mirrored.field("name"), Some(&json!("Maria Santos")));
        assert!(mirrored.synced);
        assert_eq!(store.pending_sync_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn get_all_filters_identically_on_both_paths() {
        let remote = Arc::new(MockRemote::new());
        remote.seed(SyncEntity::Senior, json!({ "id": "1", "barangay": "X" }));
        remote.seed(SyncEntity::Senior, json!({ "id": "2", "barangay": "Y" }));
        remote.seed(SyncEntity::Senior, json!({ "id": "3", "barangay": "X" }));
        remote.ignore_list_filters();
        let store = Arc::new(MemoryLocalStore::new());
        let connectivity = Arc::new(ConnectivityState::new(true));
        let gw = EntityGateway::new(
            SyncEntity::Senior,
            remote,
            store.clone(),
            connectivity.clone(),
        );
        let filter = RecordFilter::new().eq("barangay", "X");

        let online = gw.get_all(Some(&filter)).await;
        assert_eq!(online.offline, Some(false));
        let online_ids: Vec<_> = online.data.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(online_ids, vec!["1", "3"]);

        store
            .save(
                SENIORS_COLLECTION,
                EntityRecord::try_from(json!({ "id": "4", "barangay": "Y" })).unwrap(),
            )
            .await
            .unwrap();
        connectivity.set_online(false);

        let offline = gw.get_all(Some(&filter)).await;
        assert_eq!(offline.offline, Some(true));
        let offline_ids: Vec<_> = offline.data.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(offline_ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn online_reads_do_not_clobber_pending_local_edits() {
        let remote = Arc::new(MockRemote::new());
        remote.seed(SyncEntity::Senior, json!({ "id": "s-9", "name": "Server" }));
        let store = Arc::new(MemoryLocalStore::new());
        store
            .save(
                SENIORS_COLLECTION,
                EntityRecord::try_from(json!({ "id": "s-9", "name": "Local edit" }))
                    .unwrap()
                    .into_offline(),
            )
            .await
            .unwrap();
        let gw = gateway(remote, store.clone(), true);

        let response = gw.get("s-9").await;
        assert_eq!(response.data.unwrap().field("name"), Some(&json!("Server")));
        let local = store.get(SENIORS_COLLECTION, "s-9").await.unwrap().unwrap();
        assert_eq!(local.field("name"), Some(&json!("Local edit")));
    }

    #[tokio::test]
    async fn missing_record_offline_is_a_structured_failure() {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryLocalStore::new());
        let gw = gateway(remote, store, false);

        let response = gw.get("nobody").await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Senior not found"));
        assert_eq!(response.offline, Some(true));
    }

    #[tokio::test]
    async fn storage_failure_surfaces_as_unsuccessful_response() {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryLocalStore::new());
        store.set_available(false);
        let gw = gateway(remote, store, false);

        let response = gw.create(&object(json!({ "name": "Nowhere" }))).await;
        assert!(!response.success);
        assert!(response
            .error
            .unwrap_or_default()
            .starts_with("Storage unavailable"));
    }

    #[tokio::test]
    async fn online_success_survives_unavailable_local_store() {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryLocalStore::new());
        store.set_available(false);
        let gw = gateway(remote, store, true);

        let response = gw.create(&object(json!({ "name": "Remote only" }))).await;
        assert!(response.success);
        assert_eq!(response.offline, Some(false));
    }

    #[tokio::test]
    async fn offline_delete_is_queued_and_idempotent_locally() {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryLocalStore::new());
        let gw = gateway(remote, store.clone(), false);

        let response = gw.delete("never-existed").await;
        assert!(response.success);
        let queue = store.get_pending_sync_items().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].operation.to_string(), "DELETE_SENIOR");
        assert_eq!(queue[0].entity_id, "never-existed");
    }

    #[tokio::test]
    async fn offline_mutations_of_unknown_temp_ids_are_not_queued() {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryLocalStore::new());
        let gw = gateway(remote, store.clone(), false);

        let updated = gw
            .update("temp_1700000000000_ghost", &object(json!({ "name": "X" })))
            .await;
        assert!(!updated.success);
        assert_eq!(updated.error.as_deref(), Some("Senior not found"));
        assert!(store
            .get(SENIORS_COLLECTION, "temp_1700000000000_ghost")
            .await
            .unwrap()
            .is_none());

        let deleted = gw.delete("temp_1700000000000_ghost").await;
        assert!(deleted.success);
        assert_eq!(store.pending_sync_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn online_reads_fall_back_to_cached_copy_when_remote_fails() {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryLocalStore::new());
        let connectivity = Arc::new(ConnectivityState::new(false));
        let gw = EntityGateway::new(
            SyncEntity::Senior,
            remote.clone(),
            store.clone(),
            connectivity.clone(),
        );
        let id = gw
            .create(&object(json!({ "name": "Cached", "barangay": "Z" })))
            .await
            .data
            .unwrap()
            .id;

        connectivity.set_online(true);
        remote.fail_all(RemoteFailure::unreachable("dns"));

        let one = gw.get(&id).await;
        assert!(one.success);
        assert_eq!(one.offline, Some(true));
        let record = one.data.unwrap();
        assert!(record.offline);
        assert_eq!(record.field("name"), Some(&json!("Cached")));

        let filter = RecordFilter::new().eq("barangay", "Z");
        let all = gw.get_all(Some(&filter)).await;
        assert!(all.success);
        assert_eq!(all.offline, Some(true));
        let ids: Vec<_> = all.data.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![id]);
        assert_eq!(remote.call_count(), 2, "remote was tried first");
    }

    #[tokio::test]
    async fn remote_miss_is_answered_from_local_copy() {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryLocalStore::new());
        store
            .save(
                SENIORS_COLLECTION,
                EntityRecord::try_from(json!({ "id": "s-6", "name": "Cached only" })).unwrap(),
            )
            .await
            .unwrap();
        let gw = gateway(remote.clone(), store, true);

        let response = gw.get("s-6").await;
        assert!(response.success);
        assert_eq!(response.offline, Some(true));
        assert_eq!(
            response.data.unwrap().field("name"),
            Some(&json!("Cached only"))
        );
        assert_eq!(remote.calls()[0].op, "get");

        let missing = gw.get("s-404").await;
        assert_eq!(missing.error.as_deref(), Some("Senior not found"));
    }

    #[tokio::test]
    async fn online_delete_removes_local_mirror_without_queueing() {
        let remote = Arc::new(MockRemote::new());
        remote.seed(SyncEntity::Senior, json!({ "id": "s-3", "name": "Pilar" }));
        let store = Arc::new(MemoryLocalStore::new());
        store
            .save(
                SENIORS_COLLECTION,
                EntityRecord::try_from(json!({ "id": "s-3", "name": "Pilar" }))
                    .unwrap()
                    .into_synced(),
            )
            .await
            .unwrap();
        let gw = gateway(remote.clone(), store.clone(), true);

        let response = gw.delete("s-3").await;
        assert!(response.success);
        assert_eq!(response.offline, Some(false));
        assert!(remote.records(SyncEntity::Senior).is_empty());
        assert!(store.get(SENIORS_COLLECTION, "s-3").await.unwrap().is_none());
        assert_eq!(store.pending_sync_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn online_delete_of_record_missing_remotely_still_succeeds() {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryLocalStore::new());
        store
            .save(
                SENIORS_COLLECTION,
                EntityRecord::try_from(json!({ "id": "s-4", "name": "Stale" })).unwrap(),
            )
            .await
            .unwrap();
        let gw = gateway(remote.clone(), store.clone(), true);

        let response = gw.delete("s-4").await;
        assert!(response.success);
        assert_eq!(response.offline, Some(false));
        assert!(store.get(SENIORS_COLLECTION, "s-4").await.unwrap().is_none());
        assert_eq!(store.pending_sync_count().await.unwrap(), 0);
        assert_eq!(remote.calls()[0].op, "delete");
    }

    #[tokio::test]
    async fn failed_update_is_restored_over_a_canonical_copy() {
        let remote = Arc::new(MockRemote::new());
        let store = Arc::new(MemoryLocalStore::new());
        store
            .save(
                SENIORS_COLLECTION,
                EntityRecord::try_from(json!({ "id": "s-8", "name": "Server" }))
                    .unwrap()
                    .into_synced(),
            )
            .await
            .unwrap();
        let gw = gateway(remote, store.clone(), false);
        let item = SyncQueueItem::new(
            SyncOperationTag::new(SyncOperation::Update, SyncEntity::Senior),
            json!({ "id": "s-8", "contactNumber": "0917" }),
            DEFAULT_SYNC_PRIORITY,
        );

        gw.restore_pending(&item, "s-8").await.unwrap();

        let local = store.get(SENIORS_COLLECTION, "s-8").await.unwrap().unwrap();
        assert_eq!(local.field("name"), Some(&json!("Server")));
        assert_eq!(local.field("contactNumber"), Some(&json!("0917")));
        assert!(local.offline);
        assert!(!local.synced);
    }
}
