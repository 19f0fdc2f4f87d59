//! Database models for the Local Store tables.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use serde_json::Value;

use seniorlink_core::sync::{EntityRecord, SyncOperationTag, SyncQueueItem};

use crate::errors::StorageError;

/// Fixed-width timestamps so lexical order in SQL equals time order.
pub(crate) fn timestamp_to_db(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn timestamp_from_db(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("Bad timestamp '{}': {}", value, e)))
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::local_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LocalRecordDB {
    pub collection: String,
    pub id: String,
    pub data: String,
    pub offline: bool,
    pub synced: bool,
    pub inserted_seq: i64,
    pub updated_at: String,
}

/// Columns rewritten when an existing record is saved again.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::local_records)]
pub struct LocalRecordChangesDB {
    pub data: String,
    pub offline: bool,
    pub synced: bool,
    pub updated_at: String,
}

impl LocalRecordDB {
    pub fn from_record(
        collection: &str,
        record: &EntityRecord,
        inserted_seq: i64,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            collection: collection.to_string(),
            id: record.id.clone(),
            data: serde_json::to_string(&record.fields)?,
            offline: record.offline,
            synced: record.synced,
            inserted_seq,
            updated_at: timestamp_to_db(&Utc::now()),
        })
    }

    pub fn changes(&self) -> LocalRecordChangesDB {
        LocalRecordChangesDB {
            data: self.data.clone(),
            offline: self.offline,
            synced: self.synced,
            updated_at: self.updated_at.clone(),
        }
    }
}

impl TryFrom<LocalRecordDB> for EntityRecord {
    type Error = StorageError;

    fn try_from(row: LocalRecordDB) -> Result<Self, StorageError> {
        let fields = match serde_json::from_str::<Value>(&row.data)? {
            Value::Object(fields) => fields,
            _ => {
                return Err(StorageError::Corrupt(format!(
                    "Record {}/{} is not a JSON object",
                    row.collection, row.id
                )))
            }
        };
        let mut record = EntityRecord::new(row.id, fields);
        record.offline = row.offline;
        record.synced = row.synced;
        Ok(record)
    }
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::sync_queue)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncQueueItemDB {
    pub id: String,
    pub operation: String,
    pub entity_id: String,
    pub data: String,
    pub priority: i32,
    pub enqueued_at: String,
    pub enqueue_seq: i64,
    pub idempotency_key: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub last_error_code: Option<String>,
}

/// Columns rewritten when a queued item is pushed again; position is kept.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::sync_queue)]
#[diesel(treat_none_as_null = true)]
pub struct SyncQueueItemChangesDB {
    pub operation: String,
    pub entity_id: String,
    pub data: String,
    pub priority: i32,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub last_error_code: Option<String>,
}

impl SyncQueueItemDB {
    pub fn from_item(item: &SyncQueueItem, enqueue_seq: i64) -> Result<Self, StorageError> {
        Ok(Self {
            id: item.id.clone(),
            operation: item.operation.to_string(),
            entity_id: item.entity_id.clone(),
            data: serde_json::to_string(&item.data)?,
            priority: item.priority,
            enqueued_at: timestamp_to_db(&item.enqueued_at),
            enqueue_seq,
            idempotency_key: item.idempotency_key.clone(),
            attempts: item.attempts,
            last_error: item.last_error.clone(),
            last_error_code: item.last_error_code.clone(),
        })
    }

    pub fn changes(&self) -> SyncQueueItemChangesDB {
        SyncQueueItemChangesDB {
            operation: self.operation.clone(),
            entity_id: self.entity_id.clone(),
            data: self.data.clone(),
            priority: self.priority,
            attempts: self.attempts,
            last_error: self.last_error.clone(),
            last_error_code: self.last_error_code.clone(),
        }
    }
}

impl TryFrom<SyncQueueItemDB> for SyncQueueItem {
    type Error = StorageError;

    fn try_from(row: SyncQueueItemDB) -> Result<Self, StorageError> {
        let operation = row
            .operation
            .parse::<SyncOperationTag>()
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        Ok(SyncQueueItem {
            id: row.id,
            operation,
            entity_id: row.entity_id,
            data: serde_json::from_str(&row.data)?,
            priority: row.priority,
            enqueued_at: timestamp_from_db(&row.enqueued_at)?,
            idempotency_key: row.idempotency_key,
            attempts: row.attempts,
            last_error: row.last_error,
            last_error_code: row.last_error_code,
        })
    }
}

#[derive(Queryable, Insertable, Selectable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::preferences)]
#[diesel(primary_key(key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PreferenceDB {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}
