//! Filesystem-first storage for native hosts.

mod adapter;
mod files;
mod images;

pub use adapter::{
    NativeStorageAdapter, ANNOUNCEMENTS_FILE, APP_STATE_FILE, IMAGES_DIR, SENIORS_FILE,
    SYNC_QUEUE_FILE,
};
pub use images::{ImageStore, LOCAL_IMAGE_SCHEME};
