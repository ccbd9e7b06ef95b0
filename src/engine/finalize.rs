//! Batched finalization checkpoint.

use tracing::{info, warn};

use crate::authority::AuthorityClient;
use crate::ledger::{LedgerEntry, LedgerRecorder};

/// Completed-pass counter. Never resets for the life of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleCounter {
    count: u64,
    batch_size: u64,
}

impl CycleCounter {
    pub fn new(batch_size: u64) -> Self {
        Self {
            count: 0,
            batch_size: batch_size.max(1),
        }
    }

    pub const fn count(&self) -> u64 {
        self.count
    }

    pub const fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// Count one completed pass. Returns the cycle number when it closes a batch.
    pub fn advance(&mut self) -> Option<u64> {
        self.count = self.count.saturating_add(1);
        (self.count % self.batch_size == 0).then_some(self.count)
    }
}

/// Ask the authority to close the batch ending at `cycle`.
///
/// Success is recorded; failure is only logged and never retried, since the
/// next checkpoint supersedes it.
pub fn finalize_batch(
    authority: &dyn AuthorityClient,
    ledger: &dyn LedgerRecorder,
    protocol: &'static str,
    cycle: u64,
    batch_size: u64,
) -> bool {
    match authority.finalize_batch(protocol, cycle) {
        Ok(()) => {
            ledger.append(LedgerEntry::finalization(protocol, cycle, batch_size));
            info!(protocol, cycle, "batch finalized");
            true
        }
        Err(err) => {
            warn!(protocol, cycle, error = %err, "batch finalization failed");
            false
        }
    }
}
