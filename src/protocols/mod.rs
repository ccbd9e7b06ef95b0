//! Protocol catalog: the security domains the engine is instantiated for.
//!
//! Each protocol is a thin profile over the shared engine: cadence, ladder
//! thresholds, retry budget, detection clauses, and the event labels it writes
//! to the ledger. Domain logic itself lives in the authority.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::authority::ActionTier;
use crate::core::errors::{Result, SentinelError};
use crate::engine::classifier::{Clause, DetectionPredicate};
use crate::ledger::{EMERGENCY_RELEASE, EMERGENCY_RELEASE_FAILED};

/// Default pass cadence.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
/// Default violations before escalating.
pub const DEFAULT_ESCALATION_THRESHOLD: u32 = 3;
/// Default consecutive failures before giving up on an action.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default passes per finalization batch.
pub const DEFAULT_BATCH_SIZE: u64 = 1000;
/// Default emergency-release cooldown.
pub const DEFAULT_EMERGENCY_COOLDOWN: Duration = Duration::from_secs(2);

// ──────────────────── labels ────────────────────

/// Ledger event types a protocol writes for its two tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventLabels {
    pub alert: &'static str,
    pub escalate: &'static str,
    pub alert_failed: &'static str,
    pub escalate_failed: &'static str,
}

impl EventLabels {
    pub const fn new(
        alert: &'static str,
        escalate: &'static str,
        alert_failed: &'static str,
        escalate_failed: &'static str,
    ) -> Self {
        Self {
            alert,
            escalate,
            alert_failed,
            escalate_failed,
        }
    }

    /// Event type recorded when `tier` is accepted.
    pub const fn success(&self, tier: ActionTier) -> &'static str {
        match tier {
            ActionTier::Alert => self.alert,
            ActionTier::Escalate => self.escalate,
            ActionTier::Release => EMERGENCY_RELEASE,
        }
    }

    /// Event type recorded when `tier` exhausts its retries.
    pub const fn failure(&self, tier: ActionTier) -> &'static str {
        match tier {
            ActionTier::Alert => self.alert_failed,
            ActionTier::Escalate => self.escalate_failed,
            ActionTier::Release => EMERGENCY_RELEASE_FAILED,
        }
    }
}

// ──────────────────── profile ────────────────────

/// Everything one engine instance needs to know about its protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolProfile {
    pub name: &'static str,
    pub summary: &'static str,
    #[serde(with = "duration_ms")]
    pub interval: Duration,
    pub escalation_threshold: u32,
    pub max_retries: u32,
    pub batch_size: u64,
    #[serde(with = "duration_ms")]
    pub emergency_cooldown: Duration,
    pub predicate: DetectionPredicate,
    pub labels: EventLabels,
}

impl ProtocolProfile {
    /// Profile with the default numeric policy.
    pub fn new(name: &'static str, predicate: DetectionPredicate, labels: EventLabels) -> Self {
        Self {
            name,
            summary: "",
            interval: DEFAULT_INTERVAL,
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            max_retries: DEFAULT_MAX_RETRIES,
            batch_size: DEFAULT_BATCH_SIZE,
            emergency_cooldown: DEFAULT_EMERGENCY_COOLDOWN,
            predicate,
            labels,
        }
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub const fn with_escalation_threshold(mut self, threshold: u32) -> Self {
        self.escalation_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub const fn with_emergency_cooldown(mut self, cooldown: Duration) -> Self {
        self.emergency_cooldown = cooldown;
        self
    }

    #[must_use]
    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.predicate = self.predicate.with_score_threshold(threshold);
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

// ──────────────────── catalog ────────────────────

/// Known protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolKind {
    AssetFreeze,
    BandwidthAbuse,
    OracleDrift,
    ValidatorMisbehavior,
    Phishing,
    PrivilegeEscalation,
    DoubleSpend,
    Sybil,
    ShardConsistency,
    ContractExploit,
    NodeHealth,
    LiquidityDrain,
    Governance,
    FrontRunning,
    DataIntegrity,
    KeyCompromise,
    ReplayAttack,
    SpamFilter,
    BridgeSecurity,
    DdosMitigation,
}

struct CatalogEntry {
    kind: ProtocolKind,
    name: &'static str,
    summary: &'static str,
    interval_secs: u64,
    threshold: u32,
    retries: u32,
    clauses: &'static [Clause],
    labels: EventLabels,
}

const SCORE_OR_FLAG: &[Clause] = &[Clause::ScoreAtLeast(0.8), Clause::Flagged];
const FLAG_OR_LIST: &[Clause] = &[Clause::Flagged, Clause::Blacklisted];
const ALL_SIGNALS: &[Clause] = &[Clause::ScoreAtLeast(0.8), Clause::Flagged, Clause::Blacklisted];

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry { kind: ProtocolKind::AssetFreeze, name: "asset_freeze",
        summary: "freeze tokens tied to suspicious transfers",
        interval_secs: 10, threshold: 3, retries: 3, clauses: ALL_SIGNALS,
        labels: EventLabels::new("Asset Flagged", "Asset Frozen", "Asset Flag Failed", "Asset Freeze Failed") },
    CatalogEntry { kind: ProtocolKind::BandwidthAbuse, name: "bandwidth_abuse",
        summary: "throttle nodes exceeding their bandwidth allowance",
        interval_secs: 5, threshold: 3, retries: 3, clauses: SCORE_OR_FLAG,
        labels: EventLabels::new("Bandwidth Warning Issued", "Node Throttled", "Bandwidth Warning Failed", "Node Throttle Failed") },
    CatalogEntry { kind: ProtocolKind::OracleDrift, name: "oracle_drift",
        summary: "quarantine oracles whose feeds drift from consensus",
        interval_secs: 15, threshold: 3, retries: 3, clauses: SCORE_OR_FLAG,
        labels: EventLabels::new("Oracle Drift Alert", "Oracle Quarantined", "Oracle Drift Alert Failed", "Oracle Quarantine Failed") },
    CatalogEntry { kind: ProtocolKind::ValidatorMisbehavior, name: "validator_misbehavior",
        summary: "slash validators with repeated equivocation or downtime",
        interval_secs: 10, threshold: 3, retries: 5, clauses: SCORE_OR_FLAG,
        labels: EventLabels::new("Alert Issued", "Validator Slashed", "Alert Failed", "Validator Slash Failed") },
    CatalogEntry { kind: ProtocolKind::Phishing, name: "phishing",
        summary: "block phishing domains and lure contracts",
        interval_secs: 20, threshold: 3, retries: 3, clauses: ALL_SIGNALS,
        labels: EventLabels::new("Phishing Warning Issued", "Phishing Source Blocked", "Phishing Warning Failed", "Phishing Block Failed") },
    CatalogEntry { kind: ProtocolKind::PrivilegeEscalation, name: "privilege_escalation",
        summary: "revoke roles gained outside governance",
        interval_secs: 10, threshold: 3, retries: 3, clauses: FLAG_OR_LIST,
        labels: EventLabels::new("Privilege Alert Issued", "Privileges Revoked", "Privilege Alert Failed", "Privilege Revocation Failed") },
    CatalogEntry { kind: ProtocolKind::DoubleSpend, name: "double_spend",
        summary: "reject conflicting spends of the same output",
        interval_secs: 5, threshold: 3, retries: 5, clauses: SCORE_OR_FLAG,
        labels: EventLabels::new("Double Spend Alert", "Transaction Rejected", "Double Spend Alert Failed", "Transaction Rejection Failed") },
    CatalogEntry { kind: ProtocolKind::Sybil, name: "sybil",
        summary: "isolate identity clusters controlled by one operator",
        interval_secs: 30, threshold: 4, retries: 3, clauses: ALL_SIGNALS,
        labels: EventLabels::new("Sybil Alert Issued", "Identity Cluster Isolated", "Sybil Alert Failed", "Cluster Isolation Failed") },
    CatalogEntry { kind: ProtocolKind::ShardConsistency, name: "shard_consistency",
        summary: "resynchronize shard pairs with diverging state roots",
        interval_secs: 15, threshold: 3, retries: 4, clauses: SCORE_OR_FLAG,
        labels: EventLabels::new("Shard Inconsistency Alert", "Shard Resync Forced", "Shard Alert Failed", "Shard Resync Failed") },
    CatalogEntry { kind: ProtocolKind::ContractExploit, name: "contract_exploit",
        summary: "pause contracts showing exploit patterns",
        interval_secs: 5, threshold: 3, retries: 3, clauses: ALL_SIGNALS,
        labels: EventLabels::new("Exploit Alert Issued", "Contract Paused", "Exploit Alert Failed", "Contract Pause Failed") },
    CatalogEntry { kind: ProtocolKind::NodeHealth, name: "node_health",
        summary: "evict nodes failing health probes",
        interval_secs: 10, threshold: 5, retries: 3, clauses: SCORE_OR_FLAG,
        labels: EventLabels::new("Health Warning Issued", "Node Evicted", "Health Warning Failed", "Node Eviction Failed") },
    CatalogEntry { kind: ProtocolKind::LiquidityDrain, name: "liquidity_drain",
        summary: "lock pools losing liquidity abnormally fast",
        interval_secs: 5, threshold: 3, retries: 3, clauses: SCORE_OR_FLAG,
        labels: EventLabels::new("Liquidity Alert Issued", "Pool Locked", "Liquidity Alert Failed", "Pool Lock Failed") },
    CatalogEntry { kind: ProtocolKind::Governance, name: "governance",
        summary: "veto proposals backed by manipulated voting power",
        interval_secs: 30, threshold: 3, retries: 3, clauses: ALL_SIGNALS,
        labels: EventLabels::new("Governance Alert Issued", "Proposal Vetoed", "Governance Alert Failed", "Proposal Veto Failed") },
    CatalogEntry { kind: ProtocolKind::FrontRunning, name: "front_running",
        summary: "penalize accounts reordering mempool transactions",
        interval_secs: 5, threshold: 4, retries: 3, clauses: SCORE_OR_FLAG,
        labels: EventLabels::new("Front-Running Alert", "Account Penalized", "Front-Running Alert Failed", "Account Penalty Failed") },
    CatalogEntry { kind: ProtocolKind::DataIntegrity, name: "data_integrity",
        summary: "quarantine blocks failing integrity checks",
        interval_secs: 20, threshold: 3, retries: 5, clauses: SCORE_OR_FLAG,
        labels: EventLabels::new("Integrity Alert Issued", "Data Quarantined", "Integrity Alert Failed", "Data Quarantine Failed") },
    CatalogEntry { kind: ProtocolKind::KeyCompromise, name: "key_compromise",
        summary: "revoke keys observed signing from unknown hosts",
        interval_secs: 10, threshold: 3, retries: 5, clauses: ALL_SIGNALS,
        labels: EventLabels::new("Key Compromise Alert", "Key Revoked", "Key Alert Failed", "Key Revocation Failed") },
    CatalogEntry { kind: ProtocolKind::ReplayAttack, name: "replay_attack",
        summary: "block peers rebroadcasting stale signed messages",
        interval_secs: 5, threshold: 3, retries: 3, clauses: FLAG_OR_LIST,
        labels: EventLabels::new("Replay Alert Issued", "Replay Source Blocked", "Replay Alert Failed", "Replay Block Failed") },
    CatalogEntry { kind: ProtocolKind::SpamFilter, name: "spam_filter",
        summary: "ban accounts flooding the mempool",
        interval_secs: 10, threshold: 5, retries: 3, clauses: ALL_SIGNALS,
        labels: EventLabels::new("Spam Warning Issued", "Account Banned", "Spam Warning Failed", "Account Ban Failed") },
    CatalogEntry { kind: ProtocolKind::BridgeSecurity, name: "bridge_security",
        summary: "halt bridge routes with unbacked mints",
        interval_secs: 15, threshold: 3, retries: 4, clauses: ALL_SIGNALS,
        labels: EventLabels::new("Bridge Alert Issued", "Bridge Route Halted", "Bridge Alert Failed", "Bridge Halt Failed") },
    CatalogEntry { kind: ProtocolKind::DdosMitigation, name: "ddos_mitigation",
        summary: "rate-limit and then blackhole flooding peers",
        interval_secs: 5, threshold: 3, retries: 3, clauses: ALL_SIGNALS,
        labels: EventLabels::new("Rate Limit Applied", "Peer Blackholed", "Rate Limit Failed", "Blackhole Failed") },
];

impl ProtocolKind {
    /// Every protocol, in catalog order.
    pub const ALL: [Self; 20] = [
        Self::AssetFreeze,
        Self::BandwidthAbuse,
        Self::OracleDrift,
        Self::ValidatorMisbehavior,
        Self::Phishing,
        Self::PrivilegeEscalation,
        Self::DoubleSpend,
        Self::Sybil,
        Self::ShardConsistency,
        Self::ContractExploit,
        Self::NodeHealth,
        Self::LiquidityDrain,
        Self::Governance,
        Self::FrontRunning,
        Self::DataIntegrity,
        Self::KeyCompromise,
        Self::ReplayAttack,
        Self::SpamFilter,
        Self::BridgeSecurity,
        Self::DdosMitigation,
    ];

    fn entry(self) -> &'static CatalogEntry {
        // Catalog rows are declared in `ALL` order.
        &CATALOG[self as usize]
    }

    /// Stable snake_case name used in config and the ledger.
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// Look a protocol up by name.
    pub fn from_name(name: &str) -> Result<Self> {
        CATALOG
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.kind)
            .ok_or_else(|| SentinelError::UnknownProtocol {
                name: name.to_string(),
            })
    }

    /// Default profile for this protocol.
    pub fn profile(self) -> ProtocolProfile {
        let e = self.entry();
        let mut profile = ProtocolProfile::new(
            e.name,
            DetectionPredicate::new(e.clauses.to_vec()),
            e.labels,
        )
        .with_interval(Duration::from_secs(e.interval_secs))
        .with_escalation_threshold(e.threshold)
        .with_max_retries(e.retries);
        profile.summary = e.summary;
        profile
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProtocolKind {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Default profiles for the whole catalog.
pub fn catalog() -> Vec<ProtocolProfile> {
    ProtocolKind::ALL.iter().map(|k| k.profile()).collect()
}
