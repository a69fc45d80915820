//! Result codes delivered to caller callback sinks.
//!
//! These are the wire-facing integers a client observes; they are kept as
//! plain `i32` because a peer death is reported by shifting the code the
//! peer would have produced (`code - 1`), so a clean stop and a crash stay
//! distinguishable for every code.

/// Operation completed normally.
pub const OK: i32 = 0;

/// Reported to the connect callback when the host never acknowledged the
/// connect inside the configured budget.
pub const CONNECT_TIMEOUT: i32 = 101;

/// Reported to the disconnect callback when the host never acknowledged
/// the disconnect inside the configured budget.
pub const DISCONNECT_TIMEOUT: i32 = 102;

/// Translate a disconnect result for delivery.
///
/// `is_died` marks a completion forced by peer death; the shifted code lets
/// the caller tell a crash from a clean stop.
pub fn disconnect_code(result_code: i32, is_died: bool) -> i32 {
    if is_died {
        result_code - 1
    } else {
        result_code
    }
}
