//! Local Store contract: durable, key-addressed storage usable while offline.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;

use super::sync_model::{
    EntityRecord, RecordFilter, SyncOperationTag, SyncQueueItem, RESOLVED_IDS_KEY,
};

/// Storage for entity collections, the sync queue and preferences.
///
/// Implementations fail every call with [`crate::Error::StorageUnavailable`]
/// when the engine cannot be used; callers degrade to remote-only.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<EntityRecord>>;

    /// Whole collection in insertion order, optionally narrowed by field equality.
    async fn get_all(
        &self,
        collection: &str,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<EntityRecord>>;

    /// Upsert by id. An existing record keeps its insertion position.
    async fn save(&self, collection: &str, record: EntityRecord) -> Result<()>;

    /// Removing an absent id is a no-op.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Upserts a fully built queue item by its id; a replaced item keeps its position.
    async fn push_sync_item(&self, item: SyncQueueItem) -> Result<()>;

    async fn add_to_sync_queue(
        &self,
        operation: SyncOperationTag,
        data: Value,
        priority: i32,
    ) -> Result<SyncQueueItem> {
        let item = SyncQueueItem::new(operation, data, priority);
        self.push_sync_item(item.clone()).await?;
        Ok(item)
    }

    /// Queue items in draining order (priority desc, enqueue time asc).
    async fn get_pending_sync_items(&self) -> Result<Vec<SyncQueueItem>>;

    /// Idempotent.
    async fn remove_sync_item(&self, id: &str) -> Result<()>;

    /// Bumps `attempts` and records the last failure on a queued item.
    async fn record_sync_failure(&self, id: &str, error: &str, code: Option<&str>) -> Result<()>;

    async fn get_offline_queue(&self) -> Result<Vec<SyncQueueItem>> {
        self.get_pending_sync_items().await
    }

    async fn pending_sync_count(&self) -> Result<usize> {
        Ok(self.get_pending_sync_items().await?.len())
    }

    async fn save_preference(&self, key: &str, value: Value) -> Result<()>;

    async fn get_preference(&self, key: &str) -> Result<Option<Value>>;

    /// Server ids issued by earlier passes, keyed by the temporary id they replaced.
    async fn resolved_temp_ids(&self) -> Result<HashMap<String, String>> {
        match self.get_preference(RESOLVED_IDS_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(HashMap::new()),
        }
    }

    async fn save_resolved_temp_ids(&self, ids: &HashMap<String, String>) -> Result<()> {
        self.save_preference(RESOLVED_IDS_KEY, serde_json::to_value(ids)?)
            .await
    }

    /// Wipes every collection, the queue and preferences.
    async fn clear_all_data(&self) -> Result<()>;
}
