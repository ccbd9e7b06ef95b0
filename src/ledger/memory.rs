//! In-memory ledger for embedding and tests.

use parking_lot::Mutex;

use super::{LedgerEntry, LedgerRecorder};

/// Ledger that keeps every entry in memory, in append order.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MemoryLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries in append order.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().clone()
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Entries whose event type equals `event_type`.
    pub fn of_type(&self, event_type: &str) -> Vec<LedgerEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Event types in append order.
    pub fn event_types(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

impl LedgerRecorder for MemoryLedger {
    fn append(&self, entry: LedgerEntry) {
        self.entries.lock().push(entry);
    }

    fn appended(&self) -> u64 {
        u64::try_from(self.len()).unwrap_or(u64::MAX)
    }
}
