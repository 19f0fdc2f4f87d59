//! Composition root for the SeniorLink offline sync core.

pub mod commands;
pub mod context;

pub use context::{build_service_context, ServiceContext};
