//! Domain layer: the connection descriptor state machine.

mod config;
mod errors;
mod record;
pub mod result_codes;

pub use config::BindingConfig;
pub use errors::BindingError;
pub use record::{ConnectionId, ConnectionRecord, ConnectionState};
