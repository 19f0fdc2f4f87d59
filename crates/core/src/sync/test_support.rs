//! Scriptable remote API double shared by gateway and orchestrator tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::remote::{EntityRemoteApi, RemoteResult};
use super::sync_model::{apply_filter, EntityRecord, RecordFilter, SyncEntity};
use super::sync_policy::RemoteFailure;

pub(crate) fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("JSON object")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockCall {
    pub op: &'static str,
    pub entity: SyncEntity,
    pub id: Option<String>,
    pub idempotency_key: Option<String>,
}

#[derive(Default)]
struct MockState {
    records: HashMap<SyncEntity, Vec<EntityRecord>>,
    next_id: u64,
    fail_all: Option<RemoteFailure>,
    fail_payloads: Vec<(String, Value)>,
    fail_ids: HashSet<String>,
    delay: Option<Duration>,
    ignore_filters: bool,
    calls: Vec<MockCall>,
}

/// In-memory remote API that issues `srv-<n>` ids and never deduplicates.
#[derive(Default)]
pub(crate) struct MockRemote {
    state: Mutex<MockState>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, entity: SyncEntity, value: Value) {
        let record = EntityRecord::try_from(value).expect("seed record");
        self.state
            .lock()
            .unwrap()
            .records
            .entry(entity)
            .or_default()
            .push(record);
    }

    pub fn fail_all(&self, failure: RemoteFailure) {
        self.state.lock().unwrap().fail_all = Some(failure);
    }

    pub fn recover(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_all = None;
        state.fail_payloads.clear();
        state.fail_ids.clear();
    }

    /// Mutations whose payload has `field == value` fail with a 500.
    pub fn fail_payloads_with(&self, field: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .fail_payloads
            .push((field.to_string(), value));
    }

    /// Mutations addressing `id` fail with a 500.
    pub fn fail_id(&self, id: &str) {
        self.state.lock().unwrap().fail_ids.insert(id.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    /// Makes `list` return the whole collection regardless of the filter.
    pub fn ignore_list_filters(&self) {
        self.state.lock().unwrap().ignore_filters = true;
    }

    pub fn records(&self, entity: SyncEntity) -> Vec<EntityRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(&entity)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    async fn begin(
        &self,
        op: &'static str,
        entity: SyncEntity,
        id: Option<&str>,
        payload: Option<&Map<String, Value>>,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<()> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(MockCall {
                op,
                entity,
                id: id.map(str::to_string),
                idempotency_key: idempotency_key.map(str::to_string),
            });
            if let Some(failure) = &state.fail_all {
                return Err(failure.clone());
            }
            if id.is_some_and(|id| state.fail_ids.contains(id)) {
                return Err(RemoteFailure::from_status(500, "scripted id failure"));
            }
            if let Some(payload) = payload {
                let hit = state
                    .fail_payloads
                    .iter()
                    .any(|(field, value)| payload.get(field) == Some(value));
                if hit {
                    return Err(RemoteFailure::from_status(500, "scripted payload failure"));
                }
            }
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl EntityRemoteApi for MockRemote {
    async fn create(
        &self,
        entity: SyncEntity,
        data: &Map<String, Value>,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<EntityRecord> {
        self.begin("create", entity, None, Some(data), idempotency_key)
            .await?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let record = EntityRecord::new(format!("srv-{}", state.next_id), data.clone());
        state
            .records
            .entry(entity)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        entity: SyncEntity,
        id: &str,
        data: &Map<String, Value>,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<EntityRecord> {
        self.begin("update", entity, Some(id), Some(data), idempotency_key)
            .await?;
        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .entry(entity)
            .or_default()
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RemoteFailure::not_found(id))?;
        record.merge_fields(data);
        Ok(record.clone())
    }

    async fn delete(
        &self,
        entity: SyncEntity,
        id: &str,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<()> {
        self.begin("delete", entity, Some(id), None, idempotency_key)
            .await?;
        let mut state = self.state.lock().unwrap();
        let records = state.records.entry(entity).or_default();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(RemoteFailure::not_found(id));
        }
        Ok(())
    }

    async fn get(&self, entity: SyncEntity, id: &str) -> RemoteResult<Option<EntityRecord>> {
        self.begin("get", entity, Some(id), None, None).await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .get(&entity)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn list(
        &self,
        entity: SyncEntity,
        filter: Option<&RecordFilter>,
    ) -> RemoteResult<Vec<EntityRecord>> {
        self.begin("list", entity, None, None, None).await?;
        let state = self.state.lock().unwrap();
        let records = state.records.get(&entity).cloned().unwrap_or_default();
        if state.ignore_filters {
            return Ok(records);
        }
        Ok(apply_filter(records, filter))
    }
}
