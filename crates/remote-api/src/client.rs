//! REST client for the hosted database.
//!
//! Every collection is exposed under `/api/v1/{collection}` and answers with
//! an [`ApiEnvelope`].

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use seniorlink_core::config::SyncConfig;
use seniorlink_core::sync::{
    EntityRecord, EntityRemoteApi, RecordFilter, RemoteResult, SyncEntity,
};

use crate::error::{RemoteApiError, Result};
use crate::types::{ApiEnvelope, HealthResponse};

const MAX_LOG_BODY_CHARS: usize = 512;
const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Client for the SeniorLink REST API.
#[derive(Debug, Clone)]
pub struct RemoteApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteApiClient {
    fn log_response(status: StatusCode, body: &str) {
        if status.is_success() {
            debug!("[RemoteApi] Response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[RemoteApi] Response error ({}): {}", status, preview);
    }

    /// Create a new client.
    ///
    /// * `base_url` - origin of the API, e.g. `https://api.seniorlink.ph`
    /// * `token` - bearer token sent on every request when present
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Builds a client from configuration; `None` when no API URL is configured.
    pub fn from_config(config: &SyncConfig) -> Result<Option<Self>> {
        match config.api_base_url.as_deref() {
            Some(base_url) => Ok(Some(Self::new(
                base_url,
                config.api_token.clone(),
                config.remote_timeout,
            )?)),
            None => Ok(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self, idempotency_key: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.token {
            let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| RemoteApiError::auth("Invalid access token format"))?;
            headers.insert(AUTHORIZATION, auth_value);
        }

        if let Some(key) = idempotency_key {
            let key_value = HeaderValue::from_str(key)
                .map_err(|_| RemoteApiError::invalid_request("Invalid idempotency key"))?;
            headers.insert(IDEMPOTENCY_KEY_HEADER, key_value);
        }

        Ok(headers)
    }

    fn collection_url(&self, entity: SyncEntity) -> String {
        format!("{}/api/v1/{}", self.base_url, entity.collection())
    }

    fn record_url(&self, entity: SyncEntity, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(entity),
            urlencoding::encode(id)
        )
    }

    /// Parses the envelope, turning HTTP errors and `success: false` into
    /// [`RemoteApiError::Api`].
    async fn parse_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<ApiEnvelope<T>> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            let message = serde_json::from_str::<ApiEnvelope<Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.error)
                .unwrap_or_else(|| format!("Request failed: {}", body));
            return Err(RemoteApiError::api(status.as_u16(), message));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            error!(
                "[RemoteApi] Failed to deserialize response. Body: {}, Error: {}",
                body, e
            );
            RemoteApiError::Json(e)
        })?;
        if !envelope.success {
            let message = envelope
                .error
                .clone()
                .unwrap_or_else(|| "Request was not successful".to_string());
            return Err(RemoteApiError::api(
                StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
                message,
            ));
        }
        Ok(envelope)
    }

    async fn parse_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let envelope = Self::parse_envelope::<T>(response).await?;
        envelope
            .data
            .ok_or_else(|| RemoteApiError::invalid_request("Response carried no data"))
    }

    /// POST /api/v1/{collection}
    pub async fn create_record(
        &self,
        entity: SyncEntity,
        data: &Map<String, Value>,
        idempotency_key: Option<&str>,
    ) -> Result<EntityRecord> {
        let url = self.collection_url(entity);
        debug!("[RemoteApi] Creating {} record", entity.label());

        let response = self
            .client
            .post(&url)
            .headers(self.headers(idempotency_key)?)
            .json(data)
            .send()
            .await?;

        Self::parse_data(response).await
    }

    /// PATCH /api/v1/{collection}/{id}
    pub async fn update_record(
        &self,
        entity: SyncEntity,
        id: &str,
        data: &Map<String, Value>,
        idempotency_key: Option<&str>,
    ) -> Result<EntityRecord> {
        let url = self.record_url(entity, id);

        let response = self
            .client
            .patch(&url)
            .headers(self.headers(idempotency_key)?)
            .json(data)
            .send()
            .await?;

        Self::parse_data(response).await
    }

    /// DELETE /api/v1/{collection}/{id}
    pub async fn delete_record(
        &self,
        entity: SyncEntity,
        id: &str,
        idempotency_key: Option<&str>,
    ) -> Result<()> {
        let url = self.record_url(entity, id);

        let response = self
            .client
            .delete(&url)
            .headers(self.headers(idempotency_key)?)
            .send()
            .await?;

        Self::parse_envelope::<Value>(response).await?;
        Ok(())
    }

    /// GET /api/v1/{collection}/{id}
    ///
    /// A 404 is reported as `Ok(None)`.
    pub async fn get_record(&self, entity: SyncEntity, id: &str) -> Result<Option<EntityRecord>> {
        let url = self.record_url(entity, id);

        let response = self
            .client
            .get(&url)
            .headers(self.headers(None)?)
            .send()
            .await?;

        match Self::parse_envelope::<EntityRecord>(response).await {
            Ok(envelope) => Ok(envelope.data),
            Err(err) if err.status_code() == Some(404) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// GET /api/v1/{collection}?field=value
    pub async fn list_records(
        &self,
        entity: SyncEntity,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<EntityRecord>> {
        let mut url = self.collection_url(entity);
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            let query = filter
                .to_query_pairs()
                .iter()
                .map(|(field, value)| {
                    format!(
                        "{}={}",
                        urlencoding::encode(field),
                        urlencoding::encode(value)
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            url = format!("{}?{}", url, query);
        }

        debug!("[RemoteApi] list URL: {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers(None)?)
            .send()
            .await?;

        let envelope = Self::parse_envelope::<Vec<EntityRecord>>(response).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// GET /api/v1/health
    pub async fn ping(&self) -> Result<HealthResponse> {
        let url = format!("{}/api/v1/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers(None)?)
            .send()
            .await?;

        Self::parse_data(response).await
    }
}

#[async_trait]
impl EntityRemoteApi for RemoteApiClient {
    async fn create(
        &self,
        entity: SyncEntity,
        data: &Map<String, Value>,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<EntityRecord> {
        Ok(self.create_record(entity, data, idempotency_key).await?)
    }

    async fn update(
        &self,
        entity: SyncEntity,
        id: &str,
        data: &Map<String, Value>,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<EntityRecord> {
        Ok(self
            .update_record(entity, id, data, idempotency_key)
            .await?)
    }

    async fn delete(
        &self,
        entity: SyncEntity,
        id: &str,
        idempotency_key: Option<&str>,
    ) -> RemoteResult<()> {
        Ok(self.delete_record(entity, id, idempotency_key).await?)
    }

    async fn get(&self, entity: SyncEntity, id: &str) -> RemoteResult<Option<EntityRecord>> {
        Ok(self.get_record(entity, id).await?)
    }

    async fn list(
        &self,
        entity: SyncEntity,
        filter: Option<&RecordFilter>,
    ) -> RemoteResult<Vec<EntityRecord>> {
        Ok(self.list_records(entity, filter).await?)
    }
}
