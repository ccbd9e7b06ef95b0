//! The automation cycle: fetch → classify → escalate/act → record → finalize.
//!
//! One [`AutomationEngine`] runs one protocol. Its escalation store and cycle
//! counter live behind a single lock that is held for the *whole* pass and for
//! every manual entry point, so a scheduled pass and an administrator action
//! can never interleave their mutations.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::classifier::Detection;
use super::escalation::{EscalationRecord, EscalationStore, LadderState};
use super::finalize::{CycleCounter, finalize_batch};
use super::retry::{RetryOutcome, RetryPolicy};
use crate::authority::sealer::{PayloadSealer, seal_or_passthrough};
use crate::authority::{ActionRequest, ActionTier, AuthorityClient, EntityKey, Report};
use crate::core::errors::{Result, SentinelError};
use crate::ledger::{EntryStatus, LedgerEntry, LedgerRecorder};
use crate::protocols::ProtocolProfile;

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// Cycle number this pass completed.
    pub cycle: u64,
    pub reports: usize,
    pub anomalies: usize,
    pub actions_succeeded: usize,
    pub actions_failed: usize,
    pub recovered: usize,
    /// `Some(ok)` when this pass closed a finalization batch.
    pub finalized: Option<bool>,
}

/// Point-in-time counters for status reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub cycles: u64,
    pub tracked_entities: usize,
    pub escalated_entities: usize,
    pub failed_entities: usize,
    pub coalesced_ticks: u64,
}

struct EngineState {
    store: EscalationStore,
    cycles: CycleCounter,
}

/// Engine for one protocol.
pub struct AutomationEngine {
    profile: ProtocolProfile,
    authority: Arc<dyn AuthorityClient>,
    ledger: Arc<dyn LedgerRecorder>,
    sealer: Arc<dyn PayloadSealer>,
    state: Mutex<EngineState>,
    coalesced: AtomicU64,
}

impl AutomationEngine {
    pub fn new(
        profile: ProtocolProfile,
        authority: Arc<dyn AuthorityClient>,
        ledger: Arc<dyn LedgerRecorder>,
        sealer: Arc<dyn PayloadSealer>,
    ) -> Self {
        let cycles = CycleCounter::new(profile.batch_size);
        Self {
            profile,
            authority,
            ledger,
            sealer,
            state: Mutex::new(EngineState {
                store: EscalationStore::new(),
                cycles,
            }),
            coalesced: AtomicU64::new(0),
        }
    }

    pub fn profile(&self) -> &ProtocolProfile {
        &self.profile
    }

    pub fn name(&self) -> &'static str {
        self.profile.name
    }

    // ──────────────────── scheduled pass ────────────────────

    /// Run one pass, waiting for the lock if a manual action holds it.
    ///
    /// A fetch failure is logged and returned; the cycle counter does not
    /// advance and nothing is mutated.
    pub fn run_pass(&self) -> Result<PassSummary> {
        let mut state = self.state.lock();
        self.pass_locked(&mut state)
    }

    /// Run one pass only if the engine is idle. `None` means the tick was
    /// coalesced into the pass already in progress.
    pub fn try_run_pass(&self) -> Option<Result<PassSummary>> {
        let Some(mut state) = self.state.try_lock() else {
            self.note_coalesced();
            return None;
        };
        Some(self.pass_locked(&mut state))
    }

    pub(crate) fn note_coalesced(&self) {
        let total = self.coalesced.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(protocol = self.name(), total, "tick coalesced");
    }

    fn pass_locked(&self, state: &mut MutexGuard<'_, EngineState>) -> Result<PassSummary> {
        let protocol = self.name();
        let reports = self.authority.fetch_reports(protocol).inspect_err(|err| {
            warn!(protocol, error = %err, "report fetch failed, skipping pass");
        })?;
        let blacklist = if self.profile.predicate.needs_blacklist() && !reports.is_empty() {
            self.authority.fetch_blacklist(protocol).inspect_err(|err| {
                warn!(protocol, error = %err, "blacklist fetch failed, skipping pass");
            })?
        } else {
            HashSet::new()
        };

        let mut summary = PassSummary {
            reports: reports.len(),
            ..PassSummary::default()
        };

        for report in &reports {
            match self.profile.predicate.evaluate(report, &blacklist) {
                Some(detection) => {
                    summary.anomalies += 1;
                    if self.escalate(&mut state.store, report, &detection) {
                        summary.actions_succeeded += 1;
                    } else {
                        summary.actions_failed += 1;
                    }
                }
                None => {
                    if let Some(previous) = state.store.recover(report.key.as_str()) {
                        summary.recovered += 1;
                        debug!(
                            protocol,
                            entity = %report.key,
                            violations = previous.violation_count,
                            "entity recovered"
                        );
                    }
                }
            }
        }

        if let Some(cycle) = state.cycles.advance() {
            summary.finalized = Some(finalize_batch(
                self.authority.as_ref(),
                self.ledger.as_ref(),
                protocol,
                cycle,
                state.cycles.batch_size(),
            ));
        }
        summary.cycle = state.cycles.count();
        Ok(summary)
    }

    /// Advance the ladder for an anomalous report and act on it.
    fn escalate(&self, store: &mut EscalationStore, report: &Report, detection: &Detection) -> bool {
        let (tier, violations) = store.observe_anomaly(&report.key, self.profile.escalation_threshold);
        let reason = format!("{detection}; violations={violations}");
        self.remediate(store, report, tier, &reason)
    }

    /// Seal, act with bounded retry, commit the ladder state, and record the outcome.
    fn remediate(&self, store: &mut EscalationStore, report: &Report, tier: ActionTier, reason: &str) -> bool {
        let protocol = self.name();
        let key = &report.key;
        let sealed = seal_or_passthrough(self.sealer.as_ref(), &report.payload, key.as_str());
        let request = ActionRequest {
            protocol,
            key,
            tier,
            payload: &sealed,
        };

        let policy = RetryPolicy::new(self.profile.max_retries);
        let outcome = policy.run(store.retry_slot(key), |_| self.authority.apply_action(&request));

        match outcome {
            RetryOutcome::Succeeded { attempts } => {
                store.commit_success(key, tier);
                let event = self.profile.labels.success(tier);
                self.ledger.append(LedgerEntry::for_entity(
                    protocol,
                    key.as_str(),
                    event,
                    EntryStatus::Success,
                    format!("{protocol}: {event} for {key} ({reason})"),
                ));
                debug!(protocol, entity = %key, %tier, attempts, "action accepted");
                true
            }
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                store.commit_exhausted(key, tier);
                let event = self.profile.labels.failure(tier);
                self.ledger.append(LedgerEntry::for_entity(
                    protocol,
                    key.as_str(),
                    event,
                    EntryStatus::Failed,
                    format!("{protocol}: {event} for {key} after {attempts} attempts ({reason}): {last_error}"),
                ));
                warn!(
                    protocol,
                    entity = %key,
                    %tier,
                    attempts,
                    error = %last_error,
                    "retries exhausted"
                );
                false
            }
        }
    }

    // ──────────────────── manual entry points ────────────────────

    /// Administrator-triggered action on one entity, outside the schedule.
    ///
    /// Does not count as a violation; runs under the pass lock with the same
    /// retry budget. Returns whether the authority accepted the action.
    pub fn manual_action(&self, key: &EntityKey, tier: ActionTier, reason: &str) -> Result<bool> {
        if tier == ActionTier::Release {
            return self.emergency_release(key, Duration::ZERO);
        }
        let report = self.lookup(key)?;
        let mut state = self.state.lock();
        info!(protocol = self.name(), entity = %key, %tier, reason, "manual action");
        Ok(self.remediate(&mut state.store, &report, tier, &format!("manual: {reason}")))
    }

    /// Lift remediation from an entity after `cooldown`.
    ///
    /// The cooldown elapses before the lock is taken, so scheduled passes keep
    /// running meanwhile. On success the entity's record is dropped.
    pub fn emergency_release(&self, key: &EntityKey, cooldown: Duration) -> Result<bool> {
        let report = self.lookup(key)?;
        if !cooldown.is_zero() {
            info!(protocol = self.name(), entity = %key, ?cooldown, "emergency release cooling down");
            thread::sleep(cooldown);
        }
        let mut state = self.state.lock();
        let released = self.remediate(&mut state.store, &report, ActionTier::Release, "emergency release");
        if released {
            state.store.clear(key.as_str());
        }
        Ok(released)
    }

    /// [`Self::emergency_release`] with the profile's cooldown.
    pub fn emergency_release_default(&self, key: &EntityKey) -> Result<bool> {
        self.emergency_release(key, self.profile.emergency_cooldown)
    }

    /// Administrator reset of one entity's ladder.
    pub fn clear(&self, key: &EntityKey) -> Option<EscalationRecord> {
        let cleared = self.state.lock().store.clear(key.as_str());
        if cleared.is_some() {
            info!(protocol = self.name(), entity = %key, "escalation record cleared");
        }
        cleared
    }

    fn lookup(&self, key: &EntityKey) -> Result<Report> {
        self.authority
            .get_by_id(self.name(), key)?
            .ok_or_else(|| SentinelError::EntityNotFound {
                entity: key.to_string(),
            })
    }

    // ──────────────────── inspection ────────────────────

    /// Current record of one entity (all zeros when untracked).
    pub fn record(&self, key: &str) -> EscalationRecord {
        self.state.lock().store.get(key)
    }

    pub fn cycle_count(&self) -> u64 {
        self.state.lock().cycles.count()
    }

    pub fn tracked_entities(&self) -> usize {
        self.state.lock().store.len()
    }

    pub fn coalesced_ticks(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Vec<(EntityKey, EscalationRecord)> {
        self.state.lock().store.snapshot()
    }

    pub fn stats(&self) -> EngineStats {
        let state = self.state.lock();
        EngineStats {
            cycles: state.cycles.count(),
            tracked_entities: state.store.len(),
            escalated_entities: state.store.count_in(LadderState::Escalated),
            failed_entities: state.store.count_in(LadderState::Failed),
            coalesced_ticks: self.coalesced_ticks(),
        }
    }

    /// Hold the pass lock until the returned guard drops.
    #[cfg(test)]
    pub(crate) fn hold_lock(&self) -> impl Drop + '_ {
        self.state.lock()
    }
}
