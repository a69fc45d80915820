//! # Shared Types Crate
//!
//! Cross-subsystem entities for the Component Manager service.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a subsystem
//!   boundary (binding, free install, the out-of-scope RPC layer) is
//!   defined here and nowhere else.
//! - **Opaque Handles**: caller and endpoint handles are newtypes around
//!   `u64`. The value `0` is the null handle; subsystems reject it at
//!   their boundary instead of trusting it downstream.

pub mod entities;

pub use entities::{CallerHandle, ComponentIdentity, RemoteEndpoint, UserContext};
