//! Domain errors for the free-install subsystem.

use std::time::Duration;

use thiserror::Error;

/// Errors a submitter can observe.
///
/// Timeouts are expected, recoverable outcomes: every wait completes with
/// either a real result or a clear timeout error, never by hanging.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AcquisitionError {
    /// Null or malformed component identity; nothing was changed.
    #[error("invalid component identity")]
    InvalidIdentity,

    /// The installer dispatch failed before any wait began.
    #[error("installer unavailable: {0}")]
    InstallerUnavailable(String),

    /// No completion arrived inside the configured budget.
    #[error("free install timed out after {0:?}")]
    FreeInstallTimeout(Duration),

    /// The installer completed with a failure code.
    #[error("install failed with code {0}")]
    InstallFailed(i32),
}
