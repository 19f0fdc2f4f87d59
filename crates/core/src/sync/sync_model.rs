//! Offline sync domain models: entity records, queue items and response envelopes.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::{Error, Result};

pub const SENIORS_COLLECTION: &str = "seniors";
pub const ANNOUNCEMENTS_COLLECTION: &str = "announcements";
pub const SYNC_QUEUE_COLLECTION: &str = "syncQueue";
pub const PREFERENCES_COLLECTION: &str = "preferences";
pub const IMAGES_COLLECTION: &str = "images";

/// Preference key holding the RFC3339 time of the last sync pass.
pub const LAST_SYNC_TIME_KEY: &str = "lastSyncTime";

/// Preference key holding the temp id -> server id map of synced creates.
pub const RESOLVED_IDS_KEY: &str = "resolvedTempIds";

/// Priority used by gateways when enqueuing mutations.
pub const DEFAULT_SYNC_PRIORITY: i32 = 1;

const TEMP_ID_PREFIX: &str = "temp_";
const TEMP_ID_SUFFIX_LEN: usize = 9;

/// Entities that participate in offline sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEntity {
    Senior,
    Announcement,
}

impl SyncEntity {
    pub const ALL: [SyncEntity; 2] = [SyncEntity::Senior, SyncEntity::Announcement];

    /// Local Store collection holding records of this entity.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Senior => SENIORS_COLLECTION,
            Self::Announcement => ANNOUNCEMENTS_COLLECTION,
        }
    }

    /// Suffix used in queue operation tags (`CREATE_SENIOR`).
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Senior => "SENIOR",
            Self::Announcement => "ANNOUNCEMENT",
        }
    }

    /// Human readable name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Senior => "Senior",
            Self::Announcement => "Announcement",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|entity| entity.tag() == tag)
    }
}

/// Mutation kinds carried by the sync queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl SyncOperation {
    fn tag(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// Entity-qualified operation, written as `CREATE_SENIOR`, `DELETE_ANNOUNCEMENT`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SyncOperationTag {
    pub op: SyncOperation,
    pub entity: SyncEntity,
}

impl SyncOperationTag {
    pub fn new(op: SyncOperation, entity: SyncEntity) -> Self {
        Self { op, entity }
    }
}

impl fmt::Display for SyncOperationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.op.tag(), self.entity.tag())
    }
}

impl FromStr for SyncOperationTag {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let (op, entity) = value
            .split_once('_')
            .ok_or_else(|| Error::invalid_data(format!("Malformed sync operation '{}'", value)))?;
        let op = match op {
            "CREATE" => SyncOperation::Create,
            "UPDATE" => SyncOperation::Update,
            "DELETE" => SyncOperation::Delete,
            _ => {
                return Err(Error::invalid_data(format!(
                    "Unknown sync operation '{}'",
                    value
                )))
            }
        };
        let entity = SyncEntity::from_tag(entity)
            .ok_or_else(|| Error::invalid_data(format!("Unknown sync entity in '{}'", value)))?;
        Ok(Self { op, entity })
    }
}

impl TryFrom<String> for SyncOperationTag {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SyncOperationTag> for String {
    fn from(value: SyncOperationTag) -> Self {
        value.to_string()
    }
}

/// Generates a client-side id for a record created while offline.
pub fn generate_temp_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_ID_SUFFIX_LEN)
        .map(char::from)
        .collect::<String>()
        .to_ascii_lowercase();
    format!(
        "{}{}_{}",
        TEMP_ID_PREFIX,
        Utc::now().timestamp_millis(),
        suffix
    )
}

/// True for ids shaped like `temp_<digits>_<alnum>`.
pub fn is_temp_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix(TEMP_ID_PREFIX) else {
        return false;
    };
    let Some((timestamp, suffix)) = rest.split_once('_') else {
        return false;
    };
    !timestamp.is_empty()
        && timestamp.bytes().all(|b| b.is_ascii_digit())
        && !suffix.is_empty()
        && suffix.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(v) if !v.trim().is_empty() => Some(v.clone()),
        Value::Number(v) => Some(v.to_string()),
        _ => None,
    }
}

/// A domain object as held by the Local Store and exchanged with the remote API.
///
/// `offline` is true when the current value was written without a confirmed
/// server round-trip; `synced` is true once the server's canonical copy has
/// overwritten it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct EntityRecord {
    pub id: String,
    pub offline: bool,
    pub synced: bool,
    pub fields: Map<String, Value>,
}

impl EntityRecord {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        let mut fields = fields;
        strip_reserved(&mut fields);
        Self {
            id: id.into(),
            offline: false,
            synced: false,
            fields,
        }
    }

    /// Marks the record as a local write awaiting sync.
    pub fn into_offline(mut self) -> Self {
        self.offline = true;
        self.synced = false;
        self
    }

    /// Marks the record as the server's canonical copy.
    pub fn into_synced(mut self) -> Self {
        self.offline = false;
        self.synced = true;
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Overlays `changes` onto the current fields.
    pub fn merge_fields(&mut self, changes: &Map<String, Value>) {
        for (key, value) in changes {
            if is_reserved(key) {
                continue;
            }
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Fields sent to the remote API (no id, no offline flags).
    pub fn payload(&self) -> Map<String, Value> {
        self.fields.clone()
    }

    pub fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

fn is_reserved(key: &str) -> bool {
    matches!(key, "id" | "offline" | "synced")
}

fn strip_reserved(fields: &mut Map<String, Value>) {
    fields.remove("id");
    fields.remove("offline");
    fields.remove("synced");
}

impl TryFrom<Value> for EntityRecord {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::invalid_data("Entity record must be a JSON object"));
        };
        let id = fields
            .get("id")
            .and_then(id_from_value)
            .ok_or_else(|| Error::invalid_data("Entity record is missing an id"))?;
        let offline = fields
            .get("offline")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let synced = fields
            .get("synced")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        strip_reserved(&mut fields);
        Ok(Self {
            id,
            offline,
            synced,
            fields,
        })
    }
}

impl From<EntityRecord> for Value {
    fn from(record: EntityRecord) -> Self {
        let mut object = Map::with_capacity(record.fields.len() + 3);
        object.insert("id".to_string(), Value::String(record.id));
        for (key, value) in record.fields {
            object.insert(key, value);
        }
        object.insert("offline".to_string(), Value::Bool(record.offline));
        object.insert("synced".to_string(), Value::Bool(record.synced));
        Value::Object(object)
    }
}

/// Field-equality filter applied to whole collections in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter(BTreeMap<String, Value>);

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, record: &EntityRecord) -> bool {
        self.0.iter().all(|(field, expected)| {
            if field == "id" {
                return id_from_value(expected).as_deref() == Some(record.id.as_str());
            }
            record.fields.get(field) == Some(expected)
        })
    }

    /// Filter rendered as query-string pairs for the remote API.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(field, value)| {
                let rendered = match value {
                    Value::String(v) => v.clone(),
                    other => other.to_string(),
                };
                (field.clone(), rendered)
            })
            .collect()
    }
}

/// Applies an optional filter, keeping the input order.
pub fn apply_filter(records: Vec<EntityRecord>, filter: Option<&RecordFilter>) -> Vec<EntityRecord> {
    match filter {
        Some(filter) if !filter.is_empty() => {
            records.into_iter().filter(|r| filter.matches(r)).collect()
        }
        _ => records,
    }
}

/// One pending mutation awaiting replay against the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueItem {
    pub id: String,
    pub operation: SyncOperationTag,
    pub entity_id: String,
    pub data: Value,
    pub priority: i32,
    pub enqueued_at: DateTime<Utc>,
    pub idempotency_key: String,
    #[serde(default)]
    pub attempts: i32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub last_error_code: Option<String>,
}

impl SyncQueueItem {
    pub fn new(operation: SyncOperationTag, data: Value, priority: i32) -> Self {
        let entity_id = data.get("id").and_then(id_from_value).unwrap_or_default();
        Self {
            id: Uuid::now_v7().to_string(),
            operation,
            entity_id,
            data,
            priority,
            enqueued_at: Utc::now(),
            idempotency_key: Uuid::new_v4().to_string(),
            attempts: 0,
            last_error: None,
            last_error_code: None,
        }
    }
}

/// Draining order: higher priority first, then oldest first.
pub fn drain_order(a: &SyncQueueItem, b: &SyncQueueItem) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.enqueued_at.cmp(&b.enqueued_at))
}

/// Stable sort into draining order; equal keys keep their enqueue sequence.
pub fn sort_for_draining(items: &mut [SyncQueueItem]) {
    items.sort_by(drain_order);
}

/// Uniform envelope returned by gateways and the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced: Option<bool>,
}

impl<T> GatewayResponse<T> {
    /// Served by a confirmed server round-trip.
    pub fn online(data: Option<T>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            offline: Some(false),
            synced: Some(true),
        }
    }

    /// Served from, or written to, the Local Store only.
    pub fn local(data: Option<T>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            offline: Some(true),
            synced: Some(false),
        }
    }

    pub fn failure(error: impl Into<String>, offline: Option<bool>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            offline,
            synced: None,
        }
    }

    pub fn map<U, F>(self, f: F) -> GatewayResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        GatewayResponse {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            offline: self.offline,
            synced: self.synced,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.offline.unwrap_or(false)
    }
}

/// Outcome counters of one orchestrator pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub synced_items: usize,
    pub failed_items: usize,
    pub skipped_items: usize,
}

/// Sync health reported to connectivity badges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_online: bool,
    pub pending_count: usize,
    pub last_sync_time: Option<String>,
}
