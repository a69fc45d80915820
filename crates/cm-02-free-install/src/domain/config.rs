//! Free-install subsystem configuration.

use std::time::Duration;

/// Wait budgets for a submitted acquisition.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Budget for a local request.
    pub local_timeout: Duration,
    /// Budget for a cross-device request; longer, the installer has to
    /// reach another networked device first.
    pub remote_timeout: Duration,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            local_timeout: Duration::from_secs(30),
            remote_timeout: Duration::from_secs(40),
        }
    }
}

impl AcquisitionConfig {
    /// Short budgets for tests driving a paused clock.
    pub fn for_testing() -> Self {
        Self {
            local_timeout: Duration::from_millis(200),
            remote_timeout: Duration::from_millis(400),
        }
    }

    /// The budget that applies to one request.
    pub fn budget(&self, cross_device: bool) -> Duration {
        if cross_device {
            self.remote_timeout
        } else {
            self.local_timeout
        }
    }
}
