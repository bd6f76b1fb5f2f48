//! Readiness probing
//!
//! Confirms through the local SOCKS endpoint that the managed instance is
//! actually routing traffic, and reports the exit address it uses.

pub mod client;
pub mod exit_check;
pub mod readiness;

// Public re-exports
pub use client::{HttpProbeClient, ProbeClient};
pub use exit_check::ExitStatus;
pub use readiness::{is_ready_page, normalize_wait};
