use std::sync::Arc;

use seniorlink_core::seniors::{NewSeniorCitizen, SeniorCitizen, SeniorCitizenUpdate};
use seniorlink_core::sync::{GatewayResponse, RecordFilter};

use crate::context::ServiceContext;

pub async fn create_senior(
    context: Arc<ServiceContext>,
    input: NewSeniorCitizen,
) -> GatewayResponse<SeniorCitizen> {
    context.seniors_gateway().create(&input).await
}

pub async fn update_senior(
    context: Arc<ServiceContext>,
    id: String,
    changes: SeniorCitizenUpdate,
) -> GatewayResponse<SeniorCitizen> {
    context.seniors_gateway().update(&id, &changes).await
}

pub async fn delete_senior(context: Arc<ServiceContext>, id: String) -> GatewayResponse<()> {
    context.seniors_gateway().delete(&id).await
}

pub async fn get_senior(context: Arc<ServiceContext>, id: String) -> GatewayResponse<SeniorCitizen> {
    context.seniors_gateway().get(&id).await
}

pub async fn list_seniors(
    context: Arc<ServiceContext>,
    barangay: Option<String>,
) -> GatewayResponse<Vec<SeniorCitizen>> {
    let filter = barangay.map(|b| RecordFilter::new().eq("barangay", b));
    context.seniors_gateway().get_all(filter.as_ref()).await
}
