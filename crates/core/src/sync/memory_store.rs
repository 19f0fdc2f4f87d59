use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{DatabaseError, Error, Result};

use super::local_store::LocalStore;
use super::sync_model::{apply_filter, sort_for_draining, EntityRecord, RecordFilter, SyncQueueItem};

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, Vec<EntityRecord>>,
    queue: Vec<SyncQueueItem>,
    preferences: HashMap<String, Value>,
}

/// Volatile [`LocalStore`] kept in process memory.
///
/// Used as the store of last resort when no durable engine can be opened and
/// as an injectable test double. `set_available(false)` makes every call fail
/// with `StorageUnavailable`.
#[derive(Debug)]
pub struct MemoryLocalStore {
    state: Mutex<MemoryState>,
    available: AtomicBool,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(Error::storage_unavailable("in-memory store disabled"));
        }
        self.state.lock().map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Memory store lock is poisoned".to_string(),
            ))
        })
    }
}

impl Default for MemoryLocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<EntityRecord>> {
        let state = self.state()?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn get_all(
        &self,
        collection: &str,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<EntityRecord>> {
        let records = {
            let state = self.state()?;
            state.collections.get(collection).cloned().unwrap_or_default()
        };
        Ok(apply_filter(records, filter))
    }

    async fn save(&self, collection: &str, record: EntityRecord) -> Result<()> {
        let mut state = self.state()?;
        let records = state.collections.entry(collection.to_string()).or_default();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut state = self.state()?;
        if let Some(records) = state.collections.get_mut(collection) {
            records.retain(|r| r.id != id);
        }
        Ok(())
    }

    async fn push_sync_item(&self, item: SyncQueueItem) -> Result<()> {
        let mut state = self.state()?;
        match state.queue.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => state.queue.push(item),
        }
        Ok(())
    }

    async fn get_pending_sync_items(&self) -> Result<Vec<SyncQueueItem>> {
        let mut items = self.state()?.queue.clone();
        sort_for_draining(&mut items);
        Ok(items)
    }

    async fn remove_sync_item(&self, id: &str) -> Result<()> {
        self.state()?.queue.retain(|item| item.id != id);
        Ok(())
    }

    async fn record_sync_failure(&self, id: &str, error: &str, code: Option<&str>) -> Result<()> {
        let mut state = self.state()?;
        if let Some(item) = state.queue.iter_mut().find(|item| item.id == id) {
            item.attempts += 1;
            item.last_error = Some(error.to_string());
            item.last_error_code = code.map(str::to_string);
        }
        Ok(())
    }

    async fn save_preference(&self, key: &str, value: Value) -> Result<()> {
        self.state()?.preferences.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_preference(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.state()?.preferences.get(key).cloned())
    }

    async fn clear_all_data(&self) -> Result<()> {
        *self.state()? = MemoryState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{SyncEntity, SyncOperation, SyncOperationTag, SENIORS_COLLECTION};
    use serde_json::json;

    fn record(value: Value) -> EntityRecord {
        EntityRecord::try_from(value).expect("record")
    }

    #[tokio::test]
    async fn save_upserts_in_place() {
        let store = MemoryLocalStore::new();
        store
            .save(SENIORS_COLLECTION, record(json!({ "id": "a", "name": "Ana" })))
            .await
            .unwrap();
        store
            .save(SENIORS_COLLECTION, record(json!({ "id": "b", "name": "Ben" })))
            .await
            .unwrap();
        store
            .save(SENIORS_COLLECTION, record(json!({ "id": "a", "name": "Ana Cruz" })))
            .await
            .unwrap();

        let all = store.get_all(SENIORS_COLLECTION, None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(all[0].field("name"), Some(&json!("Ana Cruz")));
    }

    #[tokio::test]
    async fn deleting_missing_record_is_a_no_op() {
        let store = MemoryLocalStore::new();
        store.delete(SENIORS_COLLECTION, "missing").await.expect("delete");
        store.remove_sync_item("missing").await.expect("remove");
    }

    #[tokio::test]
    async fn queue_failures_are_recorded() {
        let store = MemoryLocalStore::new();
        let tag = SyncOperationTag::new(SyncOperation::Create, SyncEntity::Senior);
        let item = store
            .add_to_sync_queue(tag, json!({ "id": "temp_1_a" }), 1)
            .await
            .unwrap();
        store
            .record_sync_failure(&item.id, "boom", Some("server_error"))
            .await
            .unwrap();

        let pending = store.get_offline_queue().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[0].last_error.as_deref(), Some("boom"));
        assert_eq!(pending[0].last_error_code.as_deref(), Some("server_error"));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryLocalStore::new();
        store.set_available(false);
        let err = store.get(SENIORS_COLLECTION, "a").await.unwrap_err();
        assert!(err.is_storage_unavailable());
        assert!(store.pending_sync_count().await.unwrap_err().is_storage_unavailable());

        store.set_available(true);
        assert!(store.get(SENIORS_COLLECTION, "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_all_data_wipes_everything() {
        let store = MemoryLocalStore::new();
        store
            .save(SENIORS_COLLECTION, record(json!({ "id": "a" })))
            .await
            .unwrap();
        store.save_preference("lastSyncTime", json!("now")).await.unwrap();
        store
            .add_to_sync_queue(
                SyncOperationTag::new(SyncOperation::Delete, SyncEntity::Senior),
                json!({ "id": "a" }),
                1,
            )
            .await
            .unwrap();

        store.clear_all_data().await.unwrap();

        assert!(store.get_all(SENIORS_COLLECTION, None).await.unwrap().is_empty());
        assert!(store.get_preference("lastSyncTime").await.unwrap().is_none());
        assert_eq!(store.pending_sync_count().await.unwrap(), 0);
    }
}
