//! Result codes carried on the installer completion path.
//!
//! Kept as plain `i32` constants: they travel through the completion
//! signal and the cross-device sinks exactly as the installer produced
//! them, and the caller-visible surface is integer codes.

/// Acquisition completed and the component is installed.
pub const OK: i32 = 0;

/// The installer never completed inside the configured budget.
pub const FREE_INSTALL_TIMEOUT: i32 = 0x82_0101;

/// The connection to the installer front end could not be established.
pub const CONNECT_ERROR: i32 = 0x82_0102;

/// The installer front end died while the request was in flight.
pub const SERVICE_CENTER_CRASH: i32 = 0x82_0103;

/// The installer reported a failure it could not classify.
pub const UNDEFINED: i32 = 0x82_0104;
