//! Binding subsystem configuration.

use std::time::Duration;

/// Timer budgets for the connect/disconnect handshakes.
#[derive(Debug, Clone)]
pub struct BindingConfig {
    /// How long a dispatched connect may stay unacknowledged before the
    /// caller is failed with [`super::result_codes::CONNECT_TIMEOUT`].
    pub connect_timeout: Duration,
    /// How long a dispatched disconnect may stay unacknowledged before it
    /// is force-completed with
    /// [`super::result_codes::DISCONNECT_TIMEOUT`].
    pub disconnect_timeout: Duration,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            disconnect_timeout: Duration::from_secs(3),
        }
    }
}

impl BindingConfig {
    /// Short budgets for tests driving a paused clock.
    pub fn for_testing() -> Self {
        Self {
            connect_timeout: Duration::from_millis(50),
            disconnect_timeout: Duration::from_millis(50),
        }
    }
}
