//! Daemon subsystem: per-protocol supervision, signal handling, and the
//! operator-facing state file.

#[cfg(feature = "daemon")]
pub mod signals;
pub mod state_file;
#[cfg(feature = "daemon")]
pub mod supervisor;
