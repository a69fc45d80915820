//! The per-(caller, target) connection descriptor.

use std::fmt;

use shared_types::{CallerHandle, ComponentIdentity, RemoteEndpoint};

use super::errors::BindingError;

/// Monotonic descriptor id, unique per process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Lifecycle states of a bind session.
///
/// Transitions only move forward:
/// `Init → Connecting → Connected → Disconnecting → Disconnected`,
/// with two shortcuts into the terminal state (a failed connect, and a
/// peer death at any live stage). A descriptor never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, connect not yet dispatched.
    Init,
    /// Connect dispatched, waiting for the hosting process to acknowledge.
    Connecting,
    /// Bound; the caller holds a live endpoint.
    Connected,
    /// Disconnect dispatched, waiting for the acknowledgement.
    Disconnecting,
    /// Terminal. The descriptor is dropped once observers are notified.
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "INIT",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Disconnecting => "DISCONNECTING",
            Self::Disconnected => "DISCONNECTED",
        };
        f.write_str(s)
    }
}

/// State machine for one bind session between a caller and a target
/// component.
///
/// The record itself is pure: it validates and applies transitions. All
/// side effects (callbacks, registry, timers, remote calls) live in the
/// service layer, which is also the record's single writer.
#[derive(Debug)]
pub struct ConnectionRecord {
    id: ConnectionId,
    caller: CallerHandle,
    target: ComponentIdentity,
    state: ConnectionState,
    endpoint: Option<RemoteEndpoint>,
}

impl ConnectionRecord {
    /// Create a descriptor in `Init`.
    pub fn new(id: ConnectionId, caller: CallerHandle, target: ComponentIdentity) -> Self {
        Self {
            id,
            caller,
            target,
            state: ConnectionState::Init,
            endpoint: None,
        }
    }

    /// Descriptor id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The caller this session belongs to.
    pub fn caller(&self) -> CallerHandle {
        self.caller
    }

    /// The target component.
    pub fn target(&self) -> &ComponentIdentity {
        &self.target
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The bound endpoint, present from a successful connect onward.
    pub fn endpoint(&self) -> Option<RemoteEndpoint> {
        self.endpoint
    }

    /// `Init → Connecting`: the connect has been dispatched to the host.
    pub fn start_connecting(&mut self) -> Result<(), BindingError> {
        match self.state {
            ConnectionState::Init => {
                self.state = ConnectionState::Connecting;
                Ok(())
            }
            from => Err(BindingError::InvalidStateTransition {
                from,
                op: "start_connecting",
            }),
        }
    }

    /// `Connecting → Connected`: the host acknowledged with a live endpoint.
    pub fn complete_connect(&mut self, endpoint: RemoteEndpoint) -> Result<(), BindingError> {
        match self.state {
            ConnectionState::Connecting => {
                self.state = ConnectionState::Connected;
                self.endpoint = Some(endpoint);
                Ok(())
            }
            from => Err(BindingError::InvalidStateTransition {
                from,
                op: "complete_connect",
            }),
        }
    }

    /// `Connecting → Disconnected`: the connect failed or timed out.
    pub fn fail_connect(&mut self) -> Result<(), BindingError> {
        match self.state {
            ConnectionState::Connecting => {
                self.state = ConnectionState::Disconnected;
                Ok(())
            }
            from => Err(BindingError::InvalidStateTransition {
                from,
                op: "fail_connect",
            }),
        }
    }

    /// `Connected → Disconnecting`.
    ///
    /// Any other source state is rejected with no side effects.
    pub fn begin_disconnect(&mut self) -> Result<(), BindingError> {
        match self.state {
            ConnectionState::Connected => {
                self.state = ConnectionState::Disconnecting;
                Ok(())
            }
            from => Err(BindingError::InvalidStateTransition {
                from,
                op: "begin_disconnect",
            }),
        }
    }

    /// `{Connecting, Connected, Disconnecting} → Disconnected`.
    ///
    /// Reached by a clean acknowledgement, a disconnect timeout, or a peer
    /// death at any live stage.
    pub fn complete_disconnect(&mut self) -> Result<(), BindingError> {
        match self.state {
            ConnectionState::Connecting
            | ConnectionState::Connected
            | ConnectionState::Disconnecting => {
                self.state = ConnectionState::Disconnected;
                Ok(())
            }
            from => Err(BindingError::InvalidStateTransition {
                from,
                op: "complete_disconnect",
            }),
        }
    }
}
