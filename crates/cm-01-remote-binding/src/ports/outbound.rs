//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the binding subsystem **requires** the host to implement.
//! All of them must be `Send + Sync`; the service may invoke them from the
//! scheduler worker as well as from the caller's context.

use shared_types::{CallerHandle, ComponentIdentity, RemoteEndpoint};

use crate::domain::ConnectionId;

/// The caller's callback sink for one bind session.
///
/// The service holds this as a `Weak` reference and revalidates it before
/// every delivery; a sink whose owner is gone is skipped with a log line.
pub trait ConnectCallback: Send + Sync {
    /// Connect outcome. `endpoint` is `None` when the connect failed or
    /// timed out; `result_code` carries the failure code.
    fn on_connect_done(
        &self,
        target: &ComponentIdentity,
        endpoint: Option<RemoteEndpoint>,
        result_code: i32,
    );

    /// Disconnect outcome. A forced completion after peer death arrives
    /// with the shifted code (see
    /// [`crate::domain::result_codes::disconnect_code`]).
    fn on_disconnect_done(&self, target: &ComponentIdentity, result_code: i32);
}

/// Introspection-only registry of active descriptors.
///
/// The core makes exactly two calls on it: one per established connection,
/// one per completed disconnect.
pub trait ConnectionRegistry: Send + Sync {
    /// A descriptor reached `Connected`.
    fn register(&self, id: ConnectionId, caller: CallerHandle, target: &ComponentIdentity);

    /// A descriptor reached `Disconnected`.
    fn unregister(&self, id: ConnectionId);
}

/// Fire-and-forget dispatch toward the process hosting the target.
///
/// No return value: a silent peer is recovered by the timeout fallback,
/// never by retries.
pub trait TargetGateway: Send + Sync {
    /// Ask the host to establish the component connection for `id`.
    fn forward_connect(&self, target: &ComponentIdentity, id: ConnectionId);

    /// Ask the host to tear down the bound endpoint for `id`.
    fn forward_disconnect(&self, endpoint: RemoteEndpoint, id: ConnectionId);
}

/// Callback invoked when the watched endpoint's process terminates.
pub type DeathRecipient = Box<dyn FnOnce() + Send>;

/// Remote-liveness observer.
///
/// The service watches every endpoint it hands out and routes a death into
/// the same forced-completion path as a disconnect timeout.
pub trait DeathWatch: Send + Sync {
    /// Register `recipient` to fire if `endpoint`'s process dies.
    fn watch(&self, endpoint: RemoteEndpoint, recipient: DeathRecipient);

    /// Drop the watch for `endpoint`; its recipient must not fire anymore.
    fn unwatch(&self, endpoint: RemoteEndpoint);
}
