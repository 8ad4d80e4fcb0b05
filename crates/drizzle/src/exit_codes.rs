//! Exit code constants

/// Success exit code
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Failed to bind the listening socket
pub const BIND_ERROR: i32 = 2;
