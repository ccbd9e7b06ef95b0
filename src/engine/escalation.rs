//! Escalation ladder and the per-entity state store.
//!
//! Ladder: **Normal** → **Alerted** → **Escalated** → **Failed**.
//!
//! Each anomalous observation bumps `violation_count`; below the escalation
//! threshold the low-severity action is requested, at or above it the
//! high-severity one. `Failed` closes the current ladder only: the entity is
//! re-evaluated next pass, and a recovery (observed, not anomalous) drops the
//! record entirely so a relapse starts over at `Normal`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::authority::{ActionTier, EntityKey};

/// Position of one entity on the escalation ladder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderState {
    /// No open anomaly.
    #[default]
    Normal,
    /// Low-severity action accepted.
    Alerted,
    /// High-severity action accepted.
    Escalated,
    /// Retries exhausted on the last attempted action.
    Failed,
}

impl fmt::Display for LadderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Alerted => write!(f, "alerted"),
            Self::Escalated => write!(f, "escalated"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Counters for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationRecord {
    /// Consecutive anomalous observations since the last reset.
    pub violation_count: u32,
    /// Consecutive failed remediation attempts since the last reset.
    pub retry_count: u32,
    /// Ladder position after the last committed transition.
    pub state: LadderState,
}

impl EscalationRecord {
    /// Whether the record carries anything worth keeping.
    pub fn is_clear(&self) -> bool {
        self.violation_count == 0 && self.retry_count == 0 && self.state == LadderState::Normal
    }
}

/// Which tier a violation count maps to under `threshold`.
#[must_use]
pub const fn tier_for(violation_count: u32, threshold: u32) -> ActionTier {
    if violation_count < threshold {
        ActionTier::Alert
    } else {
        ActionTier::Escalate
    }
}

/// Entity key → record table owned by one engine.
///
/// Not internally synchronized: the engine keeps it behind its pass lock.
#[derive(Debug, Default)]
pub struct EscalationStore {
    records: HashMap<EntityKey, EscalationRecord>,
}

impl EscalationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record; a never-seen or recovered entity reads as all zeros.
    pub fn get(&self, key: &str) -> EscalationRecord {
        self.records.get(key).copied().unwrap_or_default()
    }

    /// Count an anomalous observation and pick the tier to attempt.
    pub fn observe_anomaly(&mut self, key: &EntityKey, threshold: u32) -> (ActionTier, u32) {
        let record = self.records.entry(key.clone()).or_default();
        record.violation_count = record.violation_count.saturating_add(1);
        (tier_for(record.violation_count, threshold), record.violation_count)
    }

    /// Mutable retry counter for the action about to be attempted.
    pub fn retry_slot(&mut self, key: &EntityKey) -> &mut u32 {
        &mut self.records.entry(key.clone()).or_default().retry_count
    }

    /// The authority accepted `tier`.
    pub fn commit_success(&mut self, key: &EntityKey, tier: ActionTier) {
        let record = self.records.entry(key.clone()).or_default();
        record.retry_count = 0;
        record.state = match tier {
            ActionTier::Alert => LadderState::Alerted,
            ActionTier::Escalate => LadderState::Escalated,
            ActionTier::Release => LadderState::Normal,
        };
    }

    /// Retries exhausted on `tier`; the counter restarts for the next attempt.
    ///
    /// A failed release leaves the ladder where it was.
    pub fn commit_exhausted(&mut self, key: &EntityKey, tier: ActionTier) {
        let record = self.records.entry(key.clone()).or_default();
        record.retry_count = 0;
        if tier != ActionTier::Release {
            record.state = LadderState::Failed;
        } else if record.is_clear() {
            self.records.remove(key.as_str());
        }
    }

    /// Entity observed and not anomalous. Returns the record that was dropped,
    /// if there was anything to reset.
    pub fn recover(&mut self, key: &str) -> Option<EscalationRecord> {
        self.records.remove(key).filter(|r| !r.is_clear())
    }

    /// Administrator reset; same effect as a recovery.
    pub fn clear(&mut self, key: &str) -> Option<EscalationRecord> {
        self.records.remove(key)
    }

    /// Entities with a record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Entities currently at a given ladder state.
    pub fn count_in(&self, state: LadderState) -> usize {
        self.records.values().filter(|r| r.state == state).count()
    }

    /// Sorted snapshot for inspection.
    pub fn snapshot(&self) -> Vec<(EntityKey, EscalationRecord)> {
        let mut out: Vec<_> = self
            .records
            .iter()
            .map(|(k, r)| (k.clone(), *r))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}
