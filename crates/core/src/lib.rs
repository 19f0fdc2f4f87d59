//! SeniorLink sync core: offline-first data access for the senior citizen registry.

pub mod config;
pub mod errors;
pub mod seniors;
pub mod sync;

pub use config::{HostPlatform, SyncConfig};
pub use errors::{DatabaseError, Error, Result};
