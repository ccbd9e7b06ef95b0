#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chain_sentinel::authority::sealer::PayloadSealer;
use chain_sentinel::authority::{ActionRequest, ActionTier, AuthorityClient, EntityKey, Report};
use chain_sentinel::core::errors::{Result, SentinelError};
use chain_sentinel::engine::{AutomationEngine, Clause, DetectionPredicate};
use chain_sentinel::ledger::memory::MemoryLedger;
use chain_sentinel::protocols::{EventLabels, ProtocolProfile};
use parking_lot::Mutex;

// ──────────────────── scripted authority ────────────────────

/// One recorded `apply_action` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCall {
    pub key: String,
    pub tier: ActionTier,
    pub payload: Vec<u8>,
}

/// Authority whose every answer is scripted by the test.
///
/// Action outcomes are consumed per entity from a queue; once a queue is
/// empty the entity falls back to its sticky outcome (default: success).
#[derive(Default)]
pub struct ScriptedAuthority {
    reports: Mutex<Vec<Report>>,
    blacklist: Mutex<HashSet<String>>,
    known: Mutex<HashMap<String, Report>>,
    scripts: Mutex<HashMap<String, VecDeque<bool>>>,
    sticky_fail: Mutex<HashSet<(String, ActionTier)>>,
    calls: Mutex<Vec<ActionCall>>,
    finalized: Mutex<Vec<u64>>,
    fail_fetch: AtomicBool,
    fail_finalize: AtomicBool,
    fetches: AtomicUsize,
    blacklist_fetches: AtomicUsize,
    action_delay: Mutex<Option<Duration>>,
}

impl ScriptedAuthority {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Batch returned by every following fetch.
    pub fn set_reports(&self, reports: Vec<Report>) {
        self.reports.lock().clone_from(&reports);
        let mut known = self.known.lock();
        for report in reports {
            known.insert(report.key.as_str().to_string(), report);
        }
    }

    /// Make an entity resolvable through `get_by_id` without reporting it.
    pub fn register(&self, report: Report) {
        self.known
            .lock()
            .insert(report.key.as_str().to_string(), report);
    }

    pub fn set_blacklist<I: IntoIterator<Item = &'static str>>(&self, items: I) {
        *self.blacklist.lock() = items.into_iter().map(str::to_string).collect();
    }

    /// Queue outcomes (`true` = accepted) for the next calls on `key`.
    pub fn script(&self, key: &str, outcomes: &[bool]) {
        self.scripts
            .lock()
            .entry(key.to_string())
            .or_default()
            .extend(outcomes.iter().copied());
    }

    /// Every unscripted call of `tier` on `key` fails.
    pub fn always_fail(&self, key: &str, tier: ActionTier) {
        self.sticky_fail.lock().insert((key.to_string(), tier));
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_finalize(&self, fail: bool) {
        self.fail_finalize.store(fail, Ordering::SeqCst);
    }

    /// Slow down every action call (lock interplay tests).
    pub fn set_action_delay(&self, delay: Duration) {
        *self.action_delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<ActionCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, key: &str) -> Vec<ActionCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.key == key)
            .cloned()
            .collect()
    }

    pub fn finalized(&self) -> Vec<u64> {
        self.finalized.lock().clone()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn blacklist_fetches(&self) -> usize {
        self.blacklist_fetches.load(Ordering::SeqCst)
    }
}

impl AuthorityClient for ScriptedAuthority {
    fn fetch_reports(&self, protocol: &'static str) -> Result<Vec<Report>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SentinelError::AuthorityFetch {
                protocol,
                details: "authority unreachable".to_string(),
            });
        }
        Ok(self.reports.lock().clone())
    }

    fn fetch_blacklist(&self, _protocol: &'static str) -> Result<HashSet<String>> {
        self.blacklist_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.blacklist.lock().clone())
    }

    fn apply_action(&self, request: &ActionRequest<'_>) -> Result<()> {
        if let Some(delay) = *self.action_delay.lock() {
            std::thread::sleep(delay);
        }
        let key = request.key.as_str().to_string();
        self.calls.lock().push(ActionCall {
            key: key.clone(),
            tier: request.tier,
            payload: request.payload.to_vec(),
        });

        let scripted = self
            .scripts
            .lock()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        let accepted = scripted
            .unwrap_or_else(|| !self.sticky_fail.lock().contains(&(key.clone(), request.tier)));
        if accepted {
            Ok(())
        } else {
            Err(SentinelError::action(key, request.tier.as_str(), "authority rejected"))
        }
    }

    fn finalize_batch(&self, _protocol: &'static str, cycle: u64) -> Result<()> {
        if self.fail_finalize.load(Ordering::SeqCst) {
            return Err(SentinelError::FinalizeFailed {
                cycle,
                details: "consensus busy".to_string(),
            });
        }
        self.finalized.lock().push(cycle);
        Ok(())
    }

    fn get_by_id(&self, _protocol: &'static str, key: &EntityKey) -> Result<Option<Report>> {
        Ok(self.known.lock().get(key.as_str()).cloned())
    }
}

// ──────────────────── sealers ────────────────────

/// Sealer that counts calls and optionally fails; sealed bytes are prefixed
/// with `sealed:` so tests can tell them apart.
#[derive(Default)]
pub struct CountingSealer {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl CountingSealer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let sealer = Self::default();
        sealer.fail.store(true, Ordering::SeqCst);
        Arc::new(sealer)
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PayloadSealer for CountingSealer {
    fn seal(&self, payload: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SentinelError::Seal {
                details: "hsm offline".to_string(),
            });
        }
        let mut sealed = b"sealed:".to_vec();
        sealed.extend_from_slice(payload);
        Ok(sealed)
    }
}

// ──────────────────── engine fixtures ────────────────────

/// Labels used by [`test_profile`].
pub const LABELS: EventLabels =
    EventLabels::new("Alert Issued", "Entity Blocked", "Alert Failed", "Block Failed");

/// Profile flagging on score >= 0.8, the authority flag, or the blacklist.
pub fn test_profile(threshold: u32, max_retries: u32, batch_size: u64) -> ProtocolProfile {
    ProtocolProfile::new(
        "test_protocol",
        DetectionPredicate::new(vec![
            Clause::ScoreAtLeast(0.8),
            Clause::Flagged,
            Clause::Blacklisted,
        ]),
        LABELS,
    )
    .with_escalation_threshold(threshold)
    .with_max_retries(max_retries)
    .with_batch_size(batch_size)
    .with_interval(Duration::from_millis(20))
    .with_emergency_cooldown(Duration::ZERO)
}

pub struct Harness {
    pub engine: Arc<AutomationEngine>,
    pub authority: Arc<ScriptedAuthority>,
    pub ledger: Arc<MemoryLedger>,
    pub sealer: Arc<CountingSealer>,
}

pub fn harness(profile: ProtocolProfile) -> Harness {
    harness_with_sealer(profile, CountingSealer::new())
}

pub fn harness_with_sealer(profile: ProtocolProfile, sealer: Arc<CountingSealer>) -> Harness {
    let authority = ScriptedAuthority::new();
    let ledger = Arc::new(MemoryLedger::new());
    let engine = Arc::new(AutomationEngine::new(
        profile,
        authority.clone(),
        ledger.clone(),
        sealer.clone(),
    ));
    Harness {
        engine,
        authority,
        ledger,
        sealer,
    }
}

// ──────────────────── CLI runner ────────────────────

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_sentinel") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) {
        "sentinel.exe"
    } else {
        "sentinel"
    };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve sentinel binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("sentinel-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = Command::new(&bin_path)
        .args(args)
        .env("SENTINEL_LOG", "debug")
        .env_remove("SENTINEL_OUTPUT_FORMAT")
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute sentinel command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}
