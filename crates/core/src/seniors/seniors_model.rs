use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Error, Result};
use crate::sync::EntityRecord;

/// Registered senior citizen as shown by the app.
///
/// Fields the registry does not model yet are carried in `extra` so a round
/// trip through the Local Store never drops server data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeniorCitizen {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barangay: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osca_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub offline: bool,
    #[serde(default)]
    pub synced: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TryFrom<EntityRecord> for SeniorCitizen {
    type Error = Error;

    fn try_from(record: EntityRecord) -> Result<Self> {
        serde_json::from_value(record.to_value())
            .map_err(|err| Error::invalid_data(format!("Malformed senior record: {}", err)))
    }
}

/// Input for registering a senior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSeniorCitizen {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barangay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osca_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Partial update; only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeniorCitizenUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barangay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osca_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

pub(super) fn to_fields<T: Serialize>(input: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(input)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::invalid_data("Senior input must serialize to an object")),
    }
}
