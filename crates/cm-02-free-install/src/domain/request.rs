//! The per-submission acquisition request record.

use std::fmt;
use std::time::Instant;

use shared_types::{ComponentIdentity, UserContext};
use tokio::sync::oneshot;

/// Monotonic request token, unique per process lifetime.
///
/// Disambiguates concurrent submissions for the same identity. A wall-clock
/// timestamp cannot do this job: two submissions inside one clock tick
/// would be conflated, so the clock is kept for logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

/// One submitted "start a not-yet-installed component" call.
///
/// Created on submission, appended to the coordinator's in-flight list, and
/// pruned on completion or on late/duplicate delivery. The completion
/// signal is single-assignment: the first delivery consumes the sender and
/// every later one is refused.
pub struct AcquisitionRequest {
    identity: ComponentIdentity,
    user: UserContext,
    token: RequestToken,
    cross_device: bool,
    submitted_at: Instant,
    signal: Option<oneshot::Sender<i32>>,
    delivered: bool,
}

impl AcquisitionRequest {
    /// Create a request and the receiver its submitter will park on.
    pub fn new(
        identity: ComponentIdentity,
        user: UserContext,
        token: RequestToken,
        cross_device: bool,
    ) -> (Self, oneshot::Receiver<i32>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                identity,
                user,
                token,
                cross_device,
                submitted_at: Instant::now(),
                signal: Some(tx),
                delivered: false,
            },
            rx,
        )
    }

    /// The requested component.
    pub fn identity(&self) -> &ComponentIdentity {
        &self.identity
    }

    /// The user scope the request executes under.
    pub fn user(&self) -> UserContext {
        self.user
    }

    /// The disambiguation token.
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Whether the target resides on another networked device.
    pub fn is_cross_device(&self) -> bool {
        self.cross_device
    }

    /// When the request was submitted. Log material only.
    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Whether a result has already been delivered (or the wait timed out).
    pub fn is_delivered(&self) -> bool {
        self.delivered
    }

    /// Deliver `result_code` to the parked submitter.
    ///
    /// Returns `true` on the first call; every later call is a no-op
    /// returning `false`. A receiver that is already gone (the submitter
    /// stopped waiting) still counts as delivered.
    pub fn deliver(&mut self, result_code: i32) -> bool {
        if self.delivered {
            return false;
        }
        self.delivered = true;
        if let Some(tx) = self.signal.take() {
            let _ = tx.send(result_code);
        }
        true
    }
}
