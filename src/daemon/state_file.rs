//! `state.json`: periodic snapshot of every engine for `sentinel status`.
//!
//! Written atomically (write to `.tmp`, then `rename()`) every
//! [`STATE_WRITE_INTERVAL_SECS`] seconds so readers always see a consistent
//! snapshot.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::errors::{Result, SentinelError};
use crate::engine::AutomationEngine;

/// How often the supervisor writes `state.json` (seconds).
pub const STATE_WRITE_INTERVAL_SECS: u64 = 30;

/// Age past which a reader warns that the supervisor may be stalled.
pub const STATE_STALE_THRESHOLD_SECS: i64 = 90;

// ──────────────────── schema ────────────────────

/// Top-level state file. Every field defaults so older or newer writers parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelState {
    pub version: String,
    pub pid: u32,
    pub started_at: String,
    pub uptime_seconds: u64,
    pub last_updated: String,
    pub config_hash: String,
    pub ledger_entries: u64,
    pub protocols: BTreeMap<String, ProtocolState>,
}

/// Counters of one engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolState {
    pub cycles: u64,
    pub tracked_entities: usize,
    pub escalated_entities: usize,
    pub failed_entities: usize,
    pub coalesced_ticks: u64,
}

impl SentinelState {
    /// Age of the snapshot, if `last_updated` parses.
    pub fn age_seconds(&self) -> Option<i64> {
        let updated = chrono::DateTime::parse_from_rfc3339(&self.last_updated).ok()?;
        Some(
            chrono::Utc::now()
                .signed_duration_since(updated)
                .num_seconds(),
        )
    }

    pub fn is_stale(&self) -> bool {
        self.age_seconds()
            .is_some_and(|age| age > STATE_STALE_THRESHOLD_SECS)
    }
}

// ──────────────────── writer ────────────────────

/// Rate-limited state file writer.
pub struct StateWriter {
    path: PathBuf,
    start_time: Instant,
    started_at_iso: String,
    write_interval: Duration,
    last_write: Option<Instant>,
}

impl StateWriter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            start_time: Instant::now(),
            started_at_iso: now_iso(),
            write_interval: Duration::from_secs(STATE_WRITE_INTERVAL_SECS),
            last_write: None,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.write_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write if the interval elapsed. Returns whether a write was attempted.
    pub fn maybe_write(
        &mut self,
        engines: &[Arc<AutomationEngine>],
        config_hash: &str,
        ledger_entries: u64,
    ) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last_write
            && now.duration_since(last) < self.write_interval
        {
            return false;
        }
        if let Err(e) = self.write_now(engines, config_hash, ledger_entries) {
            warn!(path = %self.path.display(), error = %e, "failed to write state file");
        }
        // Advance even on failure so a persistent error does not spam the log.
        self.last_write = Some(now);
        true
    }

    /// Write unconditionally.
    pub fn write_now(
        &self,
        engines: &[Arc<AutomationEngine>],
        config_hash: &str,
        ledger_entries: u64,
    ) -> Result<()> {
        let state = self.snapshot(engines, config_hash, ledger_entries);
        write_state_atomic(&self.path, &state)
    }

    pub fn snapshot(
        &self,
        engines: &[Arc<AutomationEngine>],
        config_hash: &str,
        ledger_entries: u64,
    ) -> SentinelState {
        let protocols = engines
            .iter()
            .map(|engine| {
                let stats = engine.stats();
                (
                    engine.name().to_string(),
                    ProtocolState {
                        cycles: stats.cycles,
                        tracked_entities: stats.tracked_entities,
                        escalated_entities: stats.escalated_entities,
                        failed_entities: stats.failed_entities,
                        coalesced_ticks: stats.coalesced_ticks,
                    },
                )
            })
            .collect();

        SentinelState {
            version: env!("CARGO_PKG_VERSION").to_string(),
            pid: std::process::id(),
            started_at: self.started_at_iso.clone(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            last_updated: now_iso(),
            config_hash: config_hash.to_string(),
            ledger_entries,
            protocols,
        }
    }
}

/// Read the state file (for `sentinel status`).
pub fn read_state(path: &Path) -> Result<SentinelState> {
    let raw = fs::read_to_string(path).map_err(|source| SentinelError::io(path, source))?;
    let state: SentinelState = serde_json::from_str(&raw)?;
    if state.is_stale() {
        warn!(
            age_seconds = state.age_seconds().unwrap_or_default(),
            "state file is old; supervisor may be stalled"
        );
    }
    Ok(state)
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Write atomically: `.tmp` sibling, fsync, rename. The temp file is removed on failure.
fn write_state_atomic(path: &Path, state: &SentinelState) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| SentinelError::io(parent, source))?;
    }

    let json = serde_json::to_string_pretty(state)?;

    let result = (|| -> std::io::Result<()> {
        {
            let mut opts = OpenOptions::new();
            opts.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt as _;
                opts.mode(0o644);
            }
            let mut file = opts.open(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(SentinelError::io(path, source));
    }
    Ok(())
}
