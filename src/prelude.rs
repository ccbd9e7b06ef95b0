//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use chain_sentinel::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SentinelError};

// Authority
pub use crate::authority::sealer::{AesGcmSealer, PassthroughSealer, PayloadSealer};
pub use crate::authority::{ActionRequest, ActionTier, AuthorityClient, EntityKey, Report};

// Engine
pub use crate::engine::{
    AutomationEngine, DetectionPredicate, EngineHandle, EscalationRecord, LadderState,
    PassSummary,
};
pub use crate::protocols::{ProtocolKind, ProtocolProfile};

// Ledger
pub use crate::ledger::dual::{DualLedger, DualLedgerConfig};
pub use crate::ledger::memory::MemoryLedger;
pub use crate::ledger::{EntryStatus, LedgerEntry, LedgerRecorder};

// Daemon
#[cfg(feature = "daemon")]
pub use crate::daemon::supervisor::Supervisor;
