//! Tor Browser process management
//!
//! Executable resolution, process-table discovery, launching and the
//! lifecycle controller that ties them together.

pub mod controller;
pub mod discovery;
pub mod launcher;
pub mod location;
pub mod table;

// Public re-exports
pub use controller::TorProcess;
pub use discovery::InstanceMatcher;
pub use launcher::{CommandLauncher, Launcher, ManagedChild, LAUNCH_ARGS};
pub use location::ExecutableLocation;
pub use table::{ProcessTable, SystemProcessTable};
