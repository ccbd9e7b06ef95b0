//! Shared automation-cycle engine.
//!
//! Leaves first: [`classifier`] decides whether a report is anomalous,
//! [`escalation`] tracks each entity's ladder, [`retry`] bounds a single
//! action, [`finalize`] closes batches of passes, [`cycle`] ties them together
//! under one lock, and [`scheduler`] drives passes at a fixed cadence.

pub mod classifier;
pub mod cycle;
pub mod escalation;
pub mod finalize;
pub mod retry;
pub mod scheduler;

pub use classifier::{Clause, Detection, DetectionPredicate};
pub use cycle::{AutomationEngine, EngineStats, PassSummary};
pub use escalation::{EscalationRecord, EscalationStore, LadderState};
pub use scheduler::EngineHandle;
