use std::sync::Arc;

use crate::errors::Result;
use crate::sync::{EntityGateway, EntityRecord, GatewayResponse, RecordFilter, SyncEntity};

use super::seniors_model::{to_fields, NewSeniorCitizen, SeniorCitizen, SeniorCitizenUpdate};

/// Typed access to the `seniors` collection over the generic [`EntityGateway`].
#[derive(Clone)]
pub struct SeniorCitizensGateway {
    inner: Arc<EntityGateway>,
}

impl SeniorCitizensGateway {
    pub fn new(inner: Arc<EntityGateway>) -> Self {
        debug_assert_eq!(inner.entity(), SyncEntity::Senior);
        Self { inner }
    }

    pub async fn create(&self, input: &NewSeniorCitizen) -> GatewayResponse<SeniorCitizen> {
        match to_fields(input) {
            Ok(fields) => typed(self.inner.create(&fields).await),
            Err(err) => GatewayResponse::failure(err.to_string(), None),
        }
    }

    pub async fn update(
        &self,
        id: &str,
        changes: &SeniorCitizenUpdate,
    ) -> GatewayResponse<SeniorCitizen> {
        match to_fields(changes) {
            Ok(fields) => typed(self.inner.update(id, &fields).await),
            Err(err) => GatewayResponse::failure(err.to_string(), None),
        }
    }

    pub async fn delete(&self, id: &str) -> GatewayResponse<()> {
        self.inner.delete(id).await
    }

    pub async fn get(&self, id: &str) -> GatewayResponse<SeniorCitizen> {
        typed(self.inner.get(id).await)
    }

    pub async fn get_all(&self, filter: Option<&RecordFilter>) -> GatewayResponse<Vec<SeniorCitizen>> {
        convert(self.inner.get_all(filter).await, |records| {
            records.into_iter().map(SeniorCitizen::try_from).collect()
        })
    }

    /// Seniors registered in one barangay.
    pub async fn by_barangay(&self, barangay: &str) -> GatewayResponse<Vec<SeniorCitizen>> {
        let filter = RecordFilter::new().eq("barangay", barangay);
        self.get_all(Some(&filter)).await
    }
}

fn typed(response: GatewayResponse<EntityRecord>) -> GatewayResponse<SeniorCitizen> {
    convert(response, SeniorCitizen::try_from)
}

/// Converts the payload of a response, turning a conversion error into a failure.
fn convert<T, U, F>(response: GatewayResponse<T>, f: F) -> GatewayResponse<U>
where
    F: FnOnce(T) -> Result<U>,
{
    let GatewayResponse {
        success,
        data,
        error,
        offline,
        synced,
    } = response;
    let data = match data.map(f).transpose() {
        Ok(data) => data,
        Err(err) => return GatewayResponse::failure(err.to_string(), offline),
    };
    GatewayResponse {
        success,
        data,
        error,
        offline,
        synced,
    }
}
