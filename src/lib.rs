#![forbid(unsafe_code)]

//! Chain Sentinel: security automation engine for blockchain networks.
//!
//! One generic cycle engine drives every protection domain:
//! 1. **Detection**: each pass fetches fresh reports from the consensus
//!    authority and evaluates a per-protocol predicate (score threshold,
//!    authority flag, blacklist membership)
//! 2. **Escalation**: repeated anomalies climb a ladder from alert to
//!    escalated action, with bounded immediate retry of every action
//! 3. **Ledger**: every committed transition is appended to a durable,
//!    append-only remediation ledger, with periodic batch finalization
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use chain_sentinel::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use chain_sentinel::core::config::Config;
//! use chain_sentinel::protocols::ProtocolKind;
//! ```

pub mod prelude;

pub mod authority;
pub mod core;
pub mod daemon;
pub mod engine;
pub mod ledger;
pub mod protocols;
