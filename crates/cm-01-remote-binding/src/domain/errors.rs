//! Domain errors for the remote-binding subsystem.

use shared_types::CallerHandle;
use thiserror::Error;

use super::record::{ConnectionId, ConnectionState};

/// Errors that can occur while driving a bind session.
///
/// All variants are local: they are logged, returned to the caller, and
/// never fatal to the service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindingError {
    /// Null or malformed argument; nothing was changed.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The requested operation is not legal in the descriptor's state.
    #[error("invalid state transition: {op} while {from}")]
    InvalidStateTransition {
        /// State the descriptor was in.
        from: ConnectionState,
        /// Operation that was attempted.
        op: &'static str,
    },

    /// No descriptor with this id exists.
    #[error("{0} not found")]
    NotFound(ConnectionId),

    /// The caller has no live binding to disconnect.
    #[error("{0} has no active binding")]
    NotBound(CallerHandle),

    /// The caller already holds a live binding.
    #[error("{0} is already bound")]
    AlreadyBound(CallerHandle),
}
