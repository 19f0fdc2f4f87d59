//! SQLite storage for the SeniorLink Local Store.

pub mod db;
pub mod errors;
pub mod local_store;
pub mod schema;

pub use db::{create_pool, get_connection, init, run_migrations, spawn_writer, WriteHandle};
pub use errors::StorageError;
pub use local_store::SqliteLocalStore;
