//! Domain layer: the acquisition request record.

mod config;
mod errors;
mod request;
pub mod result_codes;

pub use config::AcquisitionConfig;
pub use errors::AcquisitionError;
pub use request::{AcquisitionRequest, RequestToken};
