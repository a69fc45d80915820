//! # Free Install Subsystem
//!
//! **Subsystem ID:** 2
//!
//! Governs how a request to start a component that is not yet installed is
//! suspended, dispatched to an installer (local or cross-device), and
//! resumed for the original waiter within a bounded time budget, while
//! multiple independent requests for the same or different components race
//! concurrently.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - **Domain Layer:** the `AcquisitionRequest` record and its
//!   single-assignment completion signal
//! - **Ports Layer:** trait seams the host wires up (installer, completion
//!   observer, cross-device completion sinks)
//! - **Service Layer:** `AcquisitionCoordinator`, which owns the in-flight
//!   list and the cross-device waiter table
//!
//! ## Resume Model
//!
//! `submit` is the only suspending operation and its wait is bounded twice
//! over: a named task on the shared scheduler routes a timeout through the
//! ordinary completion path, and the await itself carries a slightly larger
//! backstop budget. A completion after timeout is discarded idempotently.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    result_codes, AcquisitionConfig, AcquisitionError, AcquisitionRequest, RequestToken,
};
pub use ports::{InstallObserver, Installer, InstallerError, QueryOutcome, RemoteCompletionSink};
pub use service::{AcquisitionContext, AcquisitionCoordinator};
