use std::sync::Arc;

use serde_json::{Map, Value};

use seniorlink_core::sync::{EntityRecord, GatewayResponse};

use crate::context::ServiceContext;

pub async fn create_announcement(
    context: Arc<ServiceContext>,
    fields: Map<String, Value>,
) -> GatewayResponse<EntityRecord> {
    context.announcements_gateway().create(&fields).await
}

pub async fn update_announcement(
    context: Arc<ServiceContext>,
    id: String,
    changes: Map<String, Value>,
) -> GatewayResponse<EntityRecord> {
    context.announcements_gateway().update(&id, &changes).await
}

pub async fn delete_announcement(context: Arc<ServiceContext>, id: String) -> GatewayResponse<()> {
    context.announcements_gateway().delete(&id).await
}

pub async fn list_announcements(
    context: Arc<ServiceContext>,
) -> GatewayResponse<Vec<EntityRecord>> {
    context.announcements_gateway().get_all(None).await
}
