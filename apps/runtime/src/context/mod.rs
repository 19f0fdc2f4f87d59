mod providers;
mod registry;

pub use providers::{build_service_context, UnconfiguredRemote};
pub use registry::ServiceContext;
