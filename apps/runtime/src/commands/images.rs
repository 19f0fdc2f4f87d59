use std::sync::Arc;

use crate::context::ServiceContext;

pub async fn save_image(
    context: Arc<ServiceContext>,
    filename: String,
    bytes: Vec<u8>,
) -> Result<String, String> {
    context
        .image_store()
        .save_image(&filename, &bytes)
        .await
        .map_err(|e| format!("Failed to save image: {}", e))
}

pub async fn load_image(
    context: Arc<ServiceContext>,
    filename: String,
) -> Result<Option<Vec<u8>>, String> {
    context
        .image_store()
        .load_image(&filename)
        .await
        .map_err(|e| format!("Failed to load image: {}", e))
}

pub async fn delete_image(context: Arc<ServiceContext>, filename: String) -> Result<(), String> {
    context
        .image_store()
        .delete_image(&filename)
        .await
        .map_err(|e| format!("Failed to delete image: {}", e))
}
