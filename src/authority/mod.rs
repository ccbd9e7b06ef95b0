//! Boundary to the consensus authority: the reports it supplies and the
//! remediation actions it executes.
//!
//! The authority is a black box. It decides *what* is risky (scores, flags,
//! blacklists) and *how* an action is carried out (freeze, slash, ban). The
//! engine only decides *when* to ask and *how hard* to push.

pub mod sealer;

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;

// ──────────────────── entity key ────────────────────

/// Opaque identifier of a monitored subject (node, token, validator, shard pair, ...).
///
/// Unique within one protocol, not across protocols.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Wrap a raw identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for EntityKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ──────────────────── report ────────────────────

/// Per-cycle snapshot of one entity as seen by the authority.
///
/// Ephemeral: fetched fresh every pass and never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Subject of the report.
    pub key: EntityKey,
    /// Numeric anomaly signal, when the domain produces one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Boolean anomaly signal raised directly by the authority.
    #[serde(default)]
    pub flagged: bool,
    /// Secondary identifiers (addresses, URLs, peer ids) checked against the blacklist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Opaque domain data, sealed before it is handed back to the authority.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payload: Vec<u8>,
}

impl Report {
    /// Report carrying only a key; all signals quiet.
    pub fn new(key: impl Into<EntityKey>) -> Self {
        Self {
            key: key.into(),
            score: None,
            flagged: false,
            aliases: Vec::new(),
            payload: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    #[must_use]
    pub fn flagged(mut self) -> Self {
        self.flagged = true;
        self
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }
}

// ──────────────────── actions ────────────────────

/// Severity tier of a remediation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTier {
    /// Low severity: warn, alert, flag for review.
    Alert,
    /// High severity: freeze, slash, ban, block.
    Escalate,
    /// Administrator-driven reversal after an emergency cooldown.
    Release,
}

impl ActionTier {
    /// Short stable name used in errors and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Escalate => "escalate",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for ActionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remediation call handed to the authority.
#[derive(Debug, Clone, Copy)]
pub struct ActionRequest<'a> {
    /// Protocol issuing the action.
    pub protocol: &'static str,
    /// Target entity.
    pub key: &'a EntityKey,
    /// Requested severity.
    pub tier: ActionTier,
    /// Sealed payload (or the original bytes if sealing failed).
    pub payload: &'a [u8],
}

// ──────────────────── client contract ────────────────────

/// Contract of the consensus authority.
///
/// Calls are synchronous and idempotent per key: re-applying the same action
/// is safe. Implementations must be shareable across engines running on
/// different threads.
pub trait AuthorityClient: Send + Sync {
    /// Current batch of reports for one protocol. An empty batch is normal.
    fn fetch_reports(&self, protocol: &'static str) -> Result<Vec<Report>>;

    /// Identifiers the authority currently blacklists for this protocol.
    fn fetch_blacklist(&self, _protocol: &'static str) -> Result<HashSet<String>> {
        Ok(HashSet::new())
    }

    /// Execute a remediation action. `Err` is a transient failure.
    fn apply_action(&self, request: &ActionRequest<'_>) -> Result<()>;

    /// Close out a batch of `cycle` completed passes.
    fn finalize_batch(&self, protocol: &'static str, cycle: u64) -> Result<()>;

    /// Look up a single entity, used by manual and emergency entry points.
    fn get_by_id(&self, protocol: &'static str, key: &EntityKey) -> Result<Option<Report>>;
}
