//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the free-install subsystem **requires** the host to
//! implement, plus the inbound completion seams the host calls back on.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{ComponentIdentity, UserContext};
use thiserror::Error;

use crate::domain::RequestToken;

/// The installer's synchronous answer to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The component is already installed; nothing was dispatched and the
    /// submitter resolves immediately.
    Installed,
    /// An install was dispatched; the completion arrives later through the
    /// observer.
    Dispatched,
}

/// Dispatch failures, surfaced before any wait begins.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InstallerError {
    /// The installer front end could not be reached.
    #[error("installer unreachable: {0}")]
    Unreachable(String),

    /// The installer refused the request outright.
    #[error("installer rejected the request: {0}")]
    Rejected(String),
}

/// The installer front end, local or distributed.
///
/// `query` may answer synchronously when the component is already present;
/// otherwise it dispatches the install and reports completion through
/// `observer`, from whatever execution context the installer runs on. The
/// token travels with the request so the completion can always be
/// correlated back to its submission.
#[async_trait]
pub trait Installer: Send + Sync {
    async fn query(
        &self,
        identity: &ComponentIdentity,
        user: UserContext,
        cross_device: bool,
        token: RequestToken,
        observer: Arc<dyn InstallObserver>,
    ) -> Result<QueryOutcome, InstallerError>;
}

/// Completion sink handed to the installer for one dispatched request.
pub trait InstallObserver: Send + Sync {
    /// The install finished with `result_code`. At most one call is
    /// forwarded; duplicates are dropped with a warning.
    fn on_install_finished(&self, result_code: i32);
}

/// A cross-device waiter registered against a component identity.
///
/// Resolved in FIFO registration order when a remote completion for the
/// identity arrives, then removed from the table.
pub trait RemoteCompletionSink: Send + Sync {
    fn on_remote_install_finished(&self, result_code: i32, identity: &ComponentIdentity);
}
