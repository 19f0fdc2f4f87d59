//! Image blobs (senior photos, ID scans).
//!
//! Native hosts keep each image as a base64 file under `images/`; web hosts
//! keep it as a tagged entry of the `images` collection and hand out a
//! `local://<filename>` URL.

use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::debug;
use serde_json::{json, Map, Value};

use seniorlink_core::config::HostPlatform;
use seniorlink_core::errors::{Error, Result};
use seniorlink_core::sync::{EntityRecord, LocalStore, IMAGES_COLLECTION};

use crate::adapter::IMAGES_DIR;
use crate::files::{remove_file, write_atomic};

pub const LOCAL_IMAGE_SCHEME: &str = "local://";
const IMAGE_TAG: &str = "image";

pub struct ImageStore {
    host: HostPlatform,
    images_dir: PathBuf,
    store: Arc<dyn LocalStore>,
}

fn validate_filename(filename: &str) -> Result<()> {
    let invalid = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\']);
    if invalid {
        return Err(Error::invalid_data(format!(
            "Invalid image filename '{}'",
            filename
        )));
    }
    Ok(())
}

impl ImageStore {
    /// `data_dir` is the app data directory; native images go to `data_dir/images`.
    pub fn new(host: HostPlatform, data_dir: impl Into<PathBuf>, store: Arc<dyn LocalStore>) -> Self {
        Self {
            host,
            images_dir: data_dir.into().join(IMAGES_DIR),
            store,
        }
    }

    /// Stores an image and returns the URL the UI should render.
    pub async fn save_image(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        validate_filename(filename)?;
        let encoded = BASE64.encode(bytes);

        match self.host {
            HostPlatform::Native => {
                let path = self.images_dir.join(filename);
                write_atomic(&path, encoded.as_bytes()).await?;
                debug!("[NativeStorage] Saved image {}", path.display());
                Ok(format!("file://{}", path.display()))
            }
            HostPlatform::Web => {
                let mut fields = Map::new();
                fields.insert("tag".to_string(), json!(IMAGE_TAG));
                fields.insert("data".to_string(), Value::String(encoded));
                self.store
                    .save(IMAGES_COLLECTION, EntityRecord::new(filename, fields))
                    .await?;
                Ok(format!("{}{}", LOCAL_IMAGE_SCHEME, filename))
            }
        }
    }

    /// Raw bytes of a stored image; `Ok(None)` when it does not exist.
    pub async fn load_image(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        validate_filename(filename)?;

        let encoded = match self.host {
            HostPlatform::Native => {
                match tokio::fs::read_to_string(self.images_dir.join(filename)).await {
                    Ok(content) => Some(content),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => return Err(e.into()),
                }
            }
            HostPlatform::Web => self
                .store
                .get(IMAGES_COLLECTION, filename)
                .await?
                .filter(|record| record.field("tag") == Some(&json!(IMAGE_TAG)))
                .and_then(|record| record.field("data").and_then(Value::as_str).map(str::to_string)),
        };

        match encoded {
            Some(encoded) => BASE64
                .decode(encoded.trim())
                .map(Some)
                .map_err(|e| Error::invalid_data(format!("Corrupt image '{}': {}", filename, e))),
            None => Ok(None),
        }
    }

    /// Deleting a missing image is a no-op.
    pub async fn delete_image(&self, filename: &str) -> Result<()> {
        validate_filename(filename)?;
        match self.host {
            HostPlatform::Native => remove_file(&self.images_dir.join(filename)).await,
            HostPlatform::Web => self.store.delete(IMAGES_COLLECTION, filename).await,
        }
    }

    /// Accepts a URL returned by [`ImageStore::save_image`] and returns the filename.
    pub fn filename_from_url(url: &str) -> Option<&str> {
        if let Some(name) = url.strip_prefix(LOCAL_IMAGE_SCHEME) {
            return Some(name);
        }
        url.strip_prefix("file://")
            .and_then(|path| path.rsplit(['/', '\\']).next())
            .filter(|name| !name.is_empty())
    }
}
