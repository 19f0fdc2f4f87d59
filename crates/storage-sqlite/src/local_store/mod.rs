//! SQLite-backed Local Store.

mod model;
mod repository;

pub use model::{LocalRecordDB, PreferenceDB, SyncQueueItemDB};
pub use repository::SqliteLocalStore;
