//! Append-only remediation ledger: entry model, recorder contract, and sinks.
//!
//! Every escalation transition the engine commits becomes one [`LedgerEntry`].
//! Sinks never reject a well-formed entry; their own failures degrade (fallback
//! file, stderr, discard) rather than propagate into a monitoring pass.

pub mod dual;
pub mod jsonl;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Event type recorded for each periodic finalization checkpoint.
pub const CYCLE_FINALIZATION: &str = "Cycle Finalization";
/// Event type recorded when an emergency release completes.
pub const EMERGENCY_RELEASE: &str = "Emergency Release";
/// Event type recorded when an emergency release exhausts its retries.
pub const EMERGENCY_RELEASE_FAILED: &str = "Emergency Release Failed";

/// Hex characters kept from the SHA-256 digest for entry ids.
const ID_HEX_LEN: usize = 32;

/// Outcome recorded with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// The authority accepted the action.
    Success,
    /// Retries exhausted without the authority accepting the action.
    Failed,
}

impl EntryStatus {
    /// Lowercase label as stored in the ledger.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable ledger record. Field names are part of the ledger format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Deterministic id derived from protocol, subject, and event type.
    pub id: String,
    /// Unix seconds.
    pub timestamp: i64,
    /// Event type, e.g. `"Alert Issued"`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// `"success"` or `"failed"`.
    pub status: String,
    /// Free-form context.
    pub details: String,
}

impl LedgerEntry {
    /// Entry about one entity, stamped with the current time.
    pub fn for_entity(
        protocol: &str,
        entity: &str,
        event_type: &str,
        status: EntryStatus,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: entry_id(protocol, entity, event_type),
            timestamp: unix_now(),
            event_type: event_type.to_string(),
            status: status.as_str().to_string(),
            details: details.into(),
        }
    }

    /// Finalization checkpoint entry for `cycle`.
    pub fn finalization(protocol: &str, cycle: u64, batch_size: u64) -> Self {
        Self {
            id: entry_id(protocol, &format!("cycle:{cycle}"), CYCLE_FINALIZATION),
            timestamp: unix_now(),
            event_type: CYCLE_FINALIZATION.to_string(),
            status: EntryStatus::Success.as_str().to_string(),
            details: format!("{protocol}: finalized batch of {batch_size} passes at cycle {cycle}"),
        }
    }
}

/// Deterministic entry id: identical (protocol, subject, event) triples share
/// an id and are told apart by timestamp.
#[must_use]
pub fn entry_id(protocol: &str, subject: &str, event_type: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [protocol, subject, event_type] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let mut id = hex::encode(hasher.finalize());
    id.truncate(ID_HEX_LEN);
    id
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Contract of the ledger recorder.
///
/// `append` returns only once the entry is durably queued, never mutates or
/// drops fields, and never calls back into the engine, so it is safe to call
/// while an engine lock is held.
pub trait LedgerRecorder: Send + Sync {
    /// Append one entry.
    fn append(&self, entry: LedgerEntry);

    /// Push buffered entries to durable storage. Default: nothing buffered.
    fn flush(&self) {}

    /// Entries accepted so far, when the recorder counts them.
    fn appended(&self) -> u64 {
        0
    }
}

impl<T: LedgerRecorder + ?Sized> LedgerRecorder for Arc<T> {
    fn append(&self, entry: LedgerEntry) {
        (**self).append(entry);
    }

    fn flush(&self) {
        (**self).flush();
    }

    fn appended(&self) -> u64 {
        (**self).appended()
    }
}
