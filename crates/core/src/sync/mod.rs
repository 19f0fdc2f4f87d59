//! Offline sync: models, Local Store contract, gateways and the orchestrator.

mod connectivity;
mod gateway;
mod local_store;
mod memory_store;
mod orchestrator;
mod remote;
mod sync_model;
mod sync_policy;

pub use connectivity::{ConnectivityMonitor, ConnectivityState};
pub use gateway::{EntityGateway, ReplayOutcome};
pub use local_store::LocalStore;
pub use memory_store::MemoryLocalStore;
pub use orchestrator::{SyncOrchestrator, OFFLINE_SYNC_ERROR};
pub use remote::{EntityRemoteApi, RemoteResult};
pub use sync_model::*;
pub use sync_policy::*;

#[cfg(test)]
pub(crate) mod test_support;
