//! Ports layer: the seams between the acquisition coordinator and its host.

mod outbound;

pub use outbound::{InstallObserver, Installer, InstallerError, QueryOutcome, RemoteCompletionSink};
