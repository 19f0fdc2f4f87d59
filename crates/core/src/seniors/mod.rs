//! Senior citizen registry: typed model and gateway.

mod seniors_gateway;
mod seniors_model;

pub use seniors_gateway::SeniorCitizensGateway;
pub use seniors_model::{NewSeniorCitizen, SeniorCitizen, SeniorCitizenUpdate};
