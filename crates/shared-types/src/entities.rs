//! # Domain Entities
//!
//! The identity and handle types shared by the remote-binding and
//! free-install subsystems.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The (bundle, module, ability) triple identifying an installable unit.
///
/// The module name may be empty: the original request surface allows
/// module-less starts and resolves the module later. Bundle and ability
/// names are mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentIdentity {
    /// Bundle (package) name, e.g. `com.example.notes`.
    pub bundle_name: String,
    /// Module within the bundle; may be empty.
    pub module_name: String,
    /// Ability (component) name within the module.
    pub ability_name: String,
}

impl ComponentIdentity {
    /// Create a new identity from its three parts.
    pub fn new(
        bundle_name: impl Into<String>,
        module_name: impl Into<String>,
        ability_name: impl Into<String>,
    ) -> Self {
        Self {
            bundle_name: bundle_name.into(),
            module_name: module_name.into(),
            ability_name: ability_name.into(),
        }
    }

    /// An identity is addressable when bundle and ability are both set.
    pub fn is_valid(&self) -> bool {
        !self.bundle_name.is_empty() && !self.ability_name.is_empty()
    }
}

impl fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.bundle_name, self.module_name, self.ability_name
        )
    }
}

/// User/session scope a request executes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserContext {
    /// Numeric user id; `0` is the system user.
    pub user_id: i32,
}

impl UserContext {
    /// Create a context for the given user id.
    pub fn new(user_id: i32) -> Self {
        Self { user_id }
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self { user_id: 0 }
    }
}

/// Opaque handle identifying a client process on the calling side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerHandle(pub u64);

impl CallerHandle {
    /// `0` is the null handle and never identifies a live caller.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for CallerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "caller#{}", self.0)
    }
}

/// Opaque handle to the bound endpoint of a hosted component.
///
/// Handed to the caller's connect callback on success; `0` is the empty
/// handle used when a connect fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteEndpoint(pub u64);

impl RemoteEndpoint {
    /// Whether this handle refers to a live endpoint.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint#{}", self.0)
    }
}
