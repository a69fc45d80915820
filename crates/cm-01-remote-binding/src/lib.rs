//! # Remote Binding Subsystem
//!
//! **Subsystem ID:** 1
//!
//! Governs how a client process binds to a long-lived component hosted in
//! another process: the per-(caller, target) connection descriptor state
//! machine, the asynchronous connect/disconnect handshake with the hosting
//! process, and timer-driven recovery when the peer never acknowledges.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - **Domain Layer:** the pure `ConnectionRecord` state machine
//! - **Ports Layer:** trait seams the host wires up (callback sink,
//!   connection registry, target gateway, death watch)
//! - **Service Layer:** `BindingService`, which owns the descriptors and
//!   drives them from bind/ack/timeout/death events
//!
//! ## Recovery Model
//!
//! Remote-facing calls are fire-and-forget. Correctness comes from the
//! timeout fallback, not retries: every pending connect or disconnect has a
//! named task on the shared scheduler that force-completes the handshake if
//! the peer stays silent, so a caller is never left waiting.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    result_codes, BindingConfig, BindingError, ConnectionId, ConnectionRecord, ConnectionState,
};
pub use ports::{
    ConnectCallback, ConnectionRegistry, DeathRecipient, DeathWatch, TargetGateway,
};
pub use service::{BindingContext, BindingService};
