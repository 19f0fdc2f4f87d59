//! `LocalStore` implementation over SQLite.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::info;
use serde_json::Value;

use seniorlink_core::errors::Result;
use seniorlink_core::sync::{
    apply_filter, EntityRecord, LocalStore, RecordFilter, SyncQueueItem,
};

use crate::db::{create_pool, get_connection, init, run_migrations, spawn_writer, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{local_records, preferences, sync_queue};

use super::model::{timestamp_to_db, LocalRecordDB, PreferenceDB, SyncQueueItemDB};

pub struct SqliteLocalStore {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqliteLocalStore {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SqliteLocalStore { pool, writer }
    }

    /// Opens (creating and migrating as needed) the store under `app_data_dir`.
    pub fn open(app_data_dir: impl AsRef<Path>) -> Result<Self> {
        let app_data = app_data_dir.as_ref().to_string_lossy().to_string();
        let db_path = init(&app_data)?;
        run_migrations(&db_path)?;
        let pool = create_pool(&db_path)?;
        let writer = spawn_writer(pool.as_ref().clone());
        info!("Local store opened at {}", db_path);
        Ok(Self::new(pool, writer))
    }

    fn load_collection(&self, collection: &str) -> Result<Vec<EntityRecord>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = local_records::table
            .filter(local_records::collection.eq(collection))
            .order(local_records::inserted_seq.asc())
            .select(LocalRecordDB::as_select())
            .load::<LocalRecordDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| EntityRecord::try_from(row).map_err(Into::into))
            .collect()
    }
}

fn next_record_seq(conn: &mut SqliteConnection, collection: &str) -> Result<i64> {
    let current = local_records::table
        .filter(local_records::collection.eq(collection))
        .select(max(local_records::inserted_seq))
        .first::<Option<i64>>(conn)
        .map_err(StorageError::from)?;
    Ok(current.unwrap_or(0) + 1)
}

fn next_queue_seq(conn: &mut SqliteConnection) -> Result<i64> {
    let current = sync_queue::table
        .select(max(sync_queue::enqueue_seq))
        .first::<Option<i64>>(conn)
        .map_err(StorageError::from)?;
    Ok(current.unwrap_or(0) + 1)
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<EntityRecord>> {
        let mut conn = get_connection(&self.pool)?;
        let row = local_records::table
            .filter(local_records::collection.eq(collection))
            .filter(local_records::id.eq(id))
            .select(LocalRecordDB::as_select())
            .first::<LocalRecordDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        match row {
            Some(row) => Ok(Some(EntityRecord::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn get_all(
        &self,
        collection: &str,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<EntityRecord>> {
        Ok(apply_filter(self.load_collection(collection)?, filter))
    }

    async fn save(&self, collection: &str, record: EntityRecord) -> Result<()> {
        let collection = collection.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let seq = next_record_seq(conn, &collection)?;
                let row = LocalRecordDB::from_record(&collection, &record, seq)?;
                diesel::insert_into(local_records::table)
                    .values(&row)
                    .on_conflict((local_records::collection, local_records::id))
                    .do_update()
                    .set(row.changes())
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(
                    local_records::table
                        .filter(local_records::collection.eq(collection))
                        .filter(local_records::id.eq(id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn push_sync_item(&self, item: SyncQueueItem) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let seq = next_queue_seq(conn)?;
                let row = SyncQueueItemDB::from_item(&item, seq)?;
                diesel::insert_into(sync_queue::table)
                    .values(&row)
                    .on_conflict(sync_queue::id)
                    .do_update()
                    .set(row.changes())
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn get_pending_sync_items(&self) -> Result<Vec<SyncQueueItem>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = sync_queue::table
            .order((
                sync_queue::priority.desc(),
                sync_queue::enqueued_at.asc(),
                sync_queue::enqueue_seq.asc(),
            ))
            .select(SyncQueueItemDB::as_select())
            .load::<SyncQueueItemDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| SyncQueueItem::try_from(row).map_err(Into::into))
            .collect()
    }

    async fn remove_sync_item(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(sync_queue::table.find(id))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn record_sync_failure(&self, id: &str, error: &str, code: Option<&str>) -> Result<()> {
        let id = id.to_string();
        let error = error.to_string();
        let code = code.map(str::to_string);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::update(sync_queue::table.find(id))
                    .set((
                        sync_queue::attempts.eq(sync_queue::attempts + 1),
                        sync_queue::last_error.eq(Some(error)),
                        sync_queue::last_error_code.eq(code),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn pending_sync_count(&self) -> Result<usize> {
        let mut conn = get_connection(&self.pool)?;
        let count = sync_queue::table
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn save_preference(&self, key: &str, value: Value) -> Result<()> {
        let row = PreferenceDB {
            key: key.to_string(),
            value: serde_json::to_string(&value)?,
            updated_at: timestamp_to_db(&Utc::now()),
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(preferences::table)
                    .values(&row)
                    .on_conflict(preferences::key)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn get_preference(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = get_connection(&self.pool)?;
        let row = preferences::table
            .find(key)
            .select(PreferenceDB::as_select())
            .first::<PreferenceDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        match row {
            Some(row) => Ok(Some(serde_json::from_str(&row.value)?)),
            None => Ok(None),
        }
    }

    async fn clear_all_data(&self) -> Result<()> {
        self.writer
            .exec(|conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(local_records::table)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                diesel::delete(sync_queue::table)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                diesel::delete(preferences::table)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        info!("Local store cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seniorlink_core::sync::{
        SyncEntity, SyncOperation, SyncOperationTag, LAST_SYNC_TIME_KEY, SENIORS_COLLECTION,
    };
    use serde_json::json;
    use tempfile::tempdir;

    fn setup_store() -> SqliteLocalStore {
        let app_data = tempdir().expect("tempdir").keep();
        SqliteLocalStore::open(&app_data).expect("open store")
    }

    fn record(value: Value) -> EntityRecord {
        EntityRecord::try_from(value).expect("record")
    }

    fn create_senior() -> SyncOperationTag {
        SyncOperationTag::new(SyncOperation::Create, SyncEntity::Senior)
    }

    #[tokio::test]
    async fn save_upserts_and_keeps_insertion_order() {
        let store = setup_store();
        store
            .save(SENIORS_COLLECTION, record(json!({ "id": "a", "name": "A" })))
            .await
            .unwrap();
        store
            .save(SENIORS_COLLECTION, record(json!({ "id": "b", "name": "B" })))
            .await
            .unwrap();
        store
            .save(
                SENIORS_COLLECTION,
                record(json!({ "id": "a", "name": "A2" })).into_offline(),
            )
            .await
            .unwrap();

        let all = store.get_all(SENIORS_COLLECTION, None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(all[0].field("name"), Some(&json!("A2")));
        assert!(all[0].offline);
    }

    #[tokio::test]
    async fn get_all_applies_field_filter() {
        let store = setup_store();
        for (id, barangay) in [("1", "X"), ("2", "Y"), ("3", "X")] {
            store
                .save(
                    SENIORS_COLLECTION,
                    record(json!({ "id": id, "barangay": barangay })),
                )
                .await
                .unwrap();
        }
        let filter = RecordFilter::new().eq("barangay", "X");
        let ids: Vec<_> = store
            .get_all(SENIORS_COLLECTION, Some(&filter))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert!(store.get_all("announcements", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = setup_store();
        store
            .save(SENIORS_COLLECTION, record(json!({ "id": "x" })))
            .await
            .unwrap();
        store.delete(SENIORS_COLLECTION, "x").await.unwrap();
        store.delete(SENIORS_COLLECTION, "x").await.unwrap();
        assert!(store.get(SENIORS_COLLECTION, "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn queue_drains_by_priority_then_age() {
        let store = setup_store();
        let low = store
            .add_to_sync_queue(create_senior(), json!({ "id": "temp_1_aaaaaaaaa" }), 1)
            .await
            .unwrap();
        let high = store
            .add_to_sync_queue(create_senior(), json!({ "id": "temp_2_bbbbbbbbb" }), 5)
            .await
            .unwrap();
        let low_later = store
            .add_to_sync_queue(create_senior(), json!({ "id": "temp_3_ccccccccc" }), 1)
            .await
            .unwrap();

        let ids: Vec<_> = store
            .get_pending_sync_items()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec![high.id, low.id, low_later.id]);
    }

    #[tokio::test]
    async fn queue_item_round_trips_through_the_table() {
        let store = setup_store();
        let queued = store
            .add_to_sync_queue(
                SyncOperationTag::new(SyncOperation::Update, SyncEntity::Senior),
                json!({ "id": "srv-4", "name": "Pilar" }),
                1,
            )
            .await
            .unwrap();

        let loaded = store.get_pending_sync_items().await.unwrap().remove(0);
        assert_eq!(loaded, queued);
    }

    #[tokio::test]
    async fn failure_bookkeeping_and_repush_keep_the_item() {
        let store = setup_store();
        let mut item = store
            .add_to_sync_queue(create_senior(), json!({ "id": "temp_1_aaaaaaaaa" }), 1)
            .await
            .unwrap();
        store
            .record_sync_failure(&item.id, "Remote API failure: boom", Some("server_error"))
            .await
            .unwrap();

        let stored = store.get_pending_sync_items().await.unwrap().remove(0);
        assert_eq!(stored.attempts, 1);
        assert_eq!(stored.last_error_code.as_deref(), Some("server_error"));

        item.entity_id = "srv-9".to_string();
        item.attempts = stored.attempts;
        store.push_sync_item(item.clone()).await.unwrap();
        let items = store.get_pending_sync_items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].entity_id, "srv-9");
        assert_eq!(items[0].enqueued_at, item.enqueued_at);

        store.remove_sync_item(&item.id).await.unwrap();
        store.remove_sync_item(&item.id).await.unwrap();
        assert_eq!(store.pending_sync_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn preferences_and_clear_all() {
        let store = setup_store();
        store
            .save_preference(LAST_SYNC_TIME_KEY, json!("2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        store
            .save_preference(LAST_SYNC_TIME_KEY, json!("2026-01-02T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(
            store.get_preference(LAST_SYNC_TIME_KEY).await.unwrap(),
            Some(json!("2026-01-02T00:00:00Z"))
        );
        store
            .save(SENIORS_COLLECTION, record(json!({ "id": "x" })))
            .await
            .unwrap();
        store
            .add_to_sync_queue(create_senior(), json!({ "id": "x" }), 1)
            .await
            .unwrap();

        store.clear_all_data().await.unwrap();
        assert!(store.get_preference(LAST_SYNC_TIME_KEY).await.unwrap().is_none());
        assert!(store.get_all(SENIORS_COLLECTION, None).await.unwrap().is_empty());
        assert_eq!(store.pending_sync_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let app_data = tempdir().expect("tempdir").keep();
        {
            let store = SqliteLocalStore::open(&app_data).unwrap();
            store
                .save(SENIORS_COLLECTION, record(json!({ "id": "keep", "name": "Juan" })))
                .await
                .unwrap();
        }
        let reopened = SqliteLocalStore::open(&app_data).unwrap();
        let juan = reopened.get(SENIORS_COLLECTION, "keep").await.unwrap().unwrap();
        assert_eq!(juan.field("name"), Some(&json!("Juan")));
    }
}
