//! REST client for the SeniorLink hosted database.

mod client;
mod error;
mod types;

pub use client::RemoteApiClient;
pub use error::{RemoteApiError, Result};
pub use types::{ApiEnvelope, HealthResponse};
