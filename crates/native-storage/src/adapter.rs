//! Native Storage Adapter.
//!
//! Mirrors entity collections, the sync queue and app state onto JSON files
//! under the app data directory. Writes land on the filesystem first and are
//! then mirrored into the wrapped Local Store; reads prefer the filesystem and
//! fall back to the wrapped store while a file has not been created yet (for
//! example right after moving from a web install).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::Mutex;

use seniorlink_core::errors::{Error, Result};
use seniorlink_core::sync::{
    apply_filter, sort_for_draining, EntityRecord, LocalStore, RecordFilter, SyncQueueItem,
    ANNOUNCEMENTS_COLLECTION, SENIORS_COLLECTION,
};

use crate::files::{read_json, remove_file, write_json};

pub const SENIORS_FILE: &str = "seniors.json";
pub const ANNOUNCEMENTS_FILE: &str = "announcements.json";
pub const SYNC_QUEUE_FILE: &str = "sync-queue.json";
pub const APP_STATE_FILE: &str = "app-state.json";
pub const IMAGES_DIR: &str = "images";

type AppState = BTreeMap<String, Value>;

fn collection_file(collection: &str) -> Option<&'static str> {
    match collection {
        SENIORS_COLLECTION => Some(SENIORS_FILE),
        ANNOUNCEMENTS_COLLECTION => Some(ANNOUNCEMENTS_FILE),
        _ => None,
    }
}

pub struct NativeStorageAdapter {
    root: PathBuf,
    inner: Arc<dyn LocalStore>,
    // Serializes read-modify-write cycles on the mirrored files.
    files_lock: Mutex<()>,
}

impl NativeStorageAdapter {
    pub fn new(root: impl Into<PathBuf>, inner: Arc<dyn LocalStore>) -> Self {
        Self {
            root: root.into(),
            inner,
            files_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    fn mirror_failed(&self, action: &str, err: &Error) {
        warn!(
            "[NativeStorage] Filesystem write kept, but mirroring {} into the local store failed: {}",
            action, err
        );
    }

    /// Current file contents, seeded from the wrapped store when the file
    /// does not exist yet.
    async fn records_for_write(&self, collection: &str, file: &str) -> Result<Vec<EntityRecord>> {
        if let Some(records) = read_json::<Vec<EntityRecord>>(&self.path(file)).await? {
            return Ok(records);
        }
        match self.inner.get_all(collection, None).await {
            Ok(records) => {
                if !records.is_empty() {
                    info!(
                        "[NativeStorage] Migrating {} {} record(s) from the local store into {}",
                        records.len(),
                        collection,
                        file
                    );
                }
                Ok(records)
            }
            Err(err) => {
                warn!(
                    "[NativeStorage] Could not seed {} from the local store: {}",
                    file, err
                );
                Ok(Vec::new())
            }
        }
    }

    async fn queue_for_write(&self) -> Result<Vec<SyncQueueItem>> {
        if let Some(items) = read_json::<Vec<SyncQueueItem>>(&self.path(SYNC_QUEUE_FILE)).await? {
            return Ok(items);
        }
        match self.inner.get_pending_sync_items().await {
            Ok(items) => Ok(items),
            Err(err) => {
                warn!(
                    "[NativeStorage] Could not seed {} from the local store: {}",
                    SYNC_QUEUE_FILE, err
                );
                Ok(Vec::new())
            }
        }
    }

    async fn app_state_for_write(&self) -> Result<AppState> {
        if let Some(state) = read_json::<AppState>(&self.path(APP_STATE_FILE)).await? {
            return Ok(state);
        }
        Ok(AppState::new())
    }

    async fn update_queue<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<SyncQueueItem>) + Send,
    {
        let _guard = self.files_lock.lock().await;
        let mut items = self.queue_for_write().await?;
        change(&mut items);
        write_json(&self.path(SYNC_QUEUE_FILE), &items).await
    }
}

#[async_trait]
impl LocalStore for NativeStorageAdapter {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<EntityRecord>> {
        if let Some(file) = collection_file(collection) {
            if let Some(records) = read_json::<Vec<EntityRecord>>(&self.path(file)).await? {
                return Ok(records.into_iter().find(|record| record.id == id));
            }
        }
        self.inner.get(collection, id).await
    }

    async fn get_all(
        &self,
        collection: &str,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<EntityRecord>> {
        if let Some(file) = collection_file(collection) {
            if let Some(records) = read_json::<Vec<EntityRecord>>(&self.path(file)).await? {
                return Ok(apply_filter(records, filter));
            }
        }
        self.inner.get_all(collection, filter).await
    }

    async fn save(&self, collection: &str, record: EntityRecord) -> Result<()> {
        let Some(file) = collection_file(collection) else {
            return self.inner.save(collection, record).await;
        };

        {
            let _guard = self.files_lock.lock().await;
            let mut records = self.records_for_write(collection, file).await?;
            match records.iter_mut().find(|existing| existing.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
            write_json(&self.path(file), &records).await?;
        }
        debug!("[NativeStorage] Saved {} {} to {}", collection, record.id, file);

        if let Err(err) = self.inner.save(collection, record).await {
            self.mirror_failed(collection, &err);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let Some(file) = collection_file(collection) else {
            return self.inner.delete(collection, id).await;
        };

        {
            let _guard = self.files_lock.lock().await;
            let mut records = self.records_for_write(collection, file).await?;
            records.retain(|record| record.id != id);
            write_json(&self.path(file), &records).await?;
        }

        if let Err(err) = self.inner.delete(collection, id).await {
            self.mirror_failed(collection, &err);
        }
        Ok(())
    }

    async fn push_sync_item(&self, item: SyncQueueItem) -> Result<()> {
        let mirrored = item.clone();
        self.update_queue(move |items| {
            match items.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => *existing = item,
                None => items.push(item),
            }
        })
        .await?;

        if let Err(err) = self.inner.push_sync_item(mirrored).await {
            self.mirror_failed("sync queue", &err);
        }
        Ok(())
    }

    async fn get_pending_sync_items(&self) -> Result<Vec<SyncQueueItem>> {
        match read_json::<Vec<SyncQueueItem>>(&self.path(SYNC_QUEUE_FILE)).await? {
            Some(mut items) => {
                sort_for_draining(&mut items);
                Ok(items)
            }
            None => self.inner.get_pending_sync_items().await,
        }
    }

    async fn remove_sync_item(&self, id: &str) -> Result<()> {
        let target = id.to_string();
        self.update_queue(move |items| items.retain(|item| item.id != target))
            .await?;

        if let Err(err) = self.inner.remove_sync_item(id).await {
            self.mirror_failed("sync queue", &err);
        }
        Ok(())
    }

    async fn record_sync_failure(&self, id: &str, error: &str, code: Option<&str>) -> Result<()> {
        let target = id.to_string();
        let message = error.to_string();
        let error_code = code.map(str::to_string);
        self.update_queue(move |items| {
            if let Some(item) = items.iter_mut().find(|item| item.id == target) {
                item.attempts += 1;
                item.last_error = Some(message);
                item.last_error_code = error_code;
            }
        })
        .await?;

        if let Err(err) = self.inner.record_sync_failure(id, error, code).await {
            self.mirror_failed("sync queue", &err);
        }
        Ok(())
    }

    async fn save_preference(&self, key: &str, value: Value) -> Result<()> {
        {
            let _guard = self.files_lock.lock().await;
            let mut state = self.app_state_for_write().await?;
            state.insert(key.to_string(), value.clone());
            write_json(&self.path(APP_STATE_FILE), &state).await?;
        }

        if let Err(err) = self.inner.save_preference(key, value).await {
            self.mirror_failed("app state", &err);
        }
        Ok(())
    }

    async fn get_preference(&self, key: &str) -> Result<Option<Value>> {
        match read_json::<AppState>(&self.path(APP_STATE_FILE)).await? {
            Some(state) => match state.get(key) {
                Some(value) => Ok(Some(value.clone())),
                None => self.inner.get_preference(key).await,
            },
            None => self.inner.get_preference(key).await,
        }
    }

    async fn clear_all_data(&self) -> Result<()> {
        {
            let _guard = self.files_lock.lock().await;
            for file in [SENIORS_FILE, ANNOUNCEMENTS_FILE, SYNC_QUEUE_FILE, APP_STATE_FILE] {
                remove_file(&self.path(file)).await?;
            }
            match tokio::fs::remove_dir_all(self.images_dir()).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!("[NativeStorage] Cleared files under {}", self.root.display());

        if let Err(err) = self.inner.clear_all_data().await {
            self.mirror_failed("clear", &err);
        }
        Ok(())
    }
}
