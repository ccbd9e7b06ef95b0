//! Configuration system: TOML file + env var overrides + smart defaults.
//!
//! Numeric policy resolves per protocol as: `[protocols.<name>]` override,
//! then the global `[engine]` override, then the catalog default.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::authority::sealer::{AesGcmSealer, KEY_LEN, PassthroughSealer, PayloadSealer};
use crate::core::errors::{Result, SentinelError};
use crate::ledger::dual::DualLedgerConfig;
use crate::ledger::jsonl::JsonlConfig;
use crate::protocols::{ProtocolKind, ProtocolProfile};

/// Accepted pass cadence range, milliseconds.
pub const MIN_INTERVAL_MS: u64 = 1_000;
pub const MAX_INTERVAL_MS: u64 = 300_000;

/// Full sentinel configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub protocols: BTreeMap<String, ProtocolOverride>,
    pub ledger: LedgerConfig,
    pub sealer: SealerConfig,
    pub paths: PathsConfig,
}

/// Global overrides applied to every protocol. Unset values keep the catalog default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub interval_ms: Option<u64>,
    pub escalation_threshold: Option<u32>,
    pub max_retries: Option<u32>,
    pub batch_size: Option<u64>,
    /// Delay before an emergency release takes the engine lock.
    pub emergency_cooldown_ms: u64,
}

/// Per-protocol overrides (`[protocols.<name>]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProtocolOverride {
    pub enabled: bool,
    pub interval_ms: Option<u64>,
    pub escalation_threshold: Option<u32>,
    pub max_retries: Option<u32>,
    pub batch_size: Option<u64>,
    pub score_threshold: Option<f64>,
}

/// Ledger sinks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    pub jsonl_path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    /// SQLite mirror; `None` keeps JSONL only.
    pub sqlite_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
    pub fsync_interval_secs: u64,
    pub channel_capacity: usize,
}

/// Payload sealing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SealerConfig {
    pub enabled: bool,
    /// 64 hex chars. Never serialized, so it stays out of hashes and dumps.
    #[serde(skip_serializing)]
    pub key_hex: Option<String>,
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub state_file: PathBuf,
}

// ──────────────────── defaults ────────────────────

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_ms: None,
            escalation_threshold: None,
            max_retries: None,
            batch_size: None,
            emergency_cooldown_ms: 2_000,
        }
    }
}

impl Default for ProtocolOverride {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: None,
            escalation_threshold: None,
            max_retries: None,
            batch_size: None,
            score_threshold: None,
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[SNT-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("sentinel")
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let data = data_dir();
        let jsonl = JsonlConfig::default();
        Self {
            jsonl_path: data.join("ledger.jsonl"),
            fallback_path: None,
            sqlite_path: Some(data.join("ledger.sqlite3")),
            max_size_bytes: jsonl.max_size_bytes,
            max_rotated_files: jsonl.max_rotated_files,
            fsync_interval_secs: jsonl.fsync_interval_secs,
            channel_capacity: DualLedgerConfig::default().channel_capacity,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_file: home_dir().join(".config").join("sentinel").join("config.toml"),
            state_file: data_dir().join("state.json"),
        }
    }
}

// ──────────────────── loading ────────────────────

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default path.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SentinelError::io(&path_buf, source))?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(SentinelError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.normalize()?;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate TOML text without touching the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut cfg: Self = toml::from_str(raw)?;
        cfg.normalize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging and the state file.
    ///
    /// FNV-1a over canonical JSON; stable across processes and releases.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        set_opt("SENTINEL_INTERVAL_MS", &mut lookup, &mut self.engine.interval_ms)?;
        set_opt(
            "SENTINEL_ESCALATION_THRESHOLD",
            &mut lookup,
            &mut self.engine.escalation_threshold,
        )?;
        set_opt("SENTINEL_MAX_RETRIES", &mut lookup, &mut self.engine.max_retries)?;
        set_opt("SENTINEL_BATCH_SIZE", &mut lookup, &mut self.engine.batch_size)?;
        set_val(
            "SENTINEL_EMERGENCY_COOLDOWN_MS",
            &mut lookup,
            &mut self.engine.emergency_cooldown_ms,
        )?;

        if let Some(raw) = lookup("SENTINEL_LEDGER_JSONL_PATH") {
            self.ledger.jsonl_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("SENTINEL_LEDGER_SQLITE_PATH") {
            self.ledger.sqlite_path = match raw.trim() {
                "off" | "none" => None,
                path => Some(PathBuf::from(path)),
            };
        }
        if let Some(raw) = lookup("SENTINEL_STATE_FILE") {
            self.paths.state_file = PathBuf::from(raw);
        }

        set_val("SENTINEL_SEALER_ENABLED", &mut lookup, &mut self.sealer.enabled)?;
        if let Some(raw) = lookup("SENTINEL_SEALER_KEY") {
            self.sealer.key_hex = Some(raw.trim().to_string());
        }

        // Restrict the run to a comma-separated subset of the catalog.
        if let Some(raw) = lookup("SENTINEL_PROTOCOLS") {
            let wanted = raw
                .split(',')
                .map(normalize_protocol_name)
                .filter(|s| !s.is_empty())
                .map(|name| ProtocolKind::from_name(&name))
                .collect::<Result<Vec<_>>>()?;
            for kind in ProtocolKind::ALL {
                self.protocols.entry(kind.name().to_string()).or_default().enabled = wanted.contains(&kind);
            }
        }

        Ok(())
    }

    fn normalize(&mut self) -> Result<()> {
        let mut normalized: BTreeMap<String, ProtocolOverride> = BTreeMap::new();
        for (raw, value) in std::mem::take(&mut self.protocols) {
            let name = normalize_protocol_name(&raw);
            if normalized.contains_key(&name) {
                return Err(SentinelError::InvalidConfig {
                    details: format!("protocols.{raw} duplicates protocols.{name} after normalization"),
                });
            }
            normalized.insert(name, value);
        }
        self.protocols = normalized;

        if let Some(key) = &mut self.sealer.key_hex {
            *key = key.trim().to_string();
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(ms) = self.engine.interval_ms {
            validate_interval("engine.interval_ms", ms)?;
        }
        validate_min("engine.escalation_threshold", self.engine.escalation_threshold.map(u64::from))?;
        validate_min("engine.max_retries", self.engine.max_retries.map(u64::from))?;
        validate_min("engine.batch_size", self.engine.batch_size)?;

        for (name, o) in &self.protocols {
            ProtocolKind::from_name(name)?;
            if let Some(ms) = o.interval_ms {
                validate_interval(&format!("protocols.{name}.interval_ms"), ms)?;
            }
            validate_min(
                &format!("protocols.{name}.escalation_threshold"),
                o.escalation_threshold.map(u64::from),
            )?;
            validate_min(&format!("protocols.{name}.max_retries"), o.max_retries.map(u64::from))?;
            validate_min(&format!("protocols.{name}.batch_size"), o.batch_size)?;
            if let Some(t) = o.score_threshold
                && !(t.is_finite() && t >= 0.0)
            {
                return Err(SentinelError::InvalidConfig {
                    details: format!("protocols.{name}.score_threshold must be finite and >= 0, got {t}"),
                });
            }
        }

        if self.ledger.max_rotated_files == 0 {
            return Err(SentinelError::InvalidConfig {
                details: "ledger.max_rotated_files must be >= 1".to_string(),
            });
        }
        if self.ledger.channel_capacity == 0 {
            return Err(SentinelError::InvalidConfig {
                details: "ledger.channel_capacity must be >= 1".to_string(),
            });
        }

        if self.sealer.enabled {
            let Some(key) = &self.sealer.key_hex else {
                return Err(SentinelError::InvalidConfig {
                    details: "sealer.enabled requires sealer.key_hex (or SENTINEL_SEALER_KEY)".to_string(),
                });
            };
            let decoded = hex::decode(key).map_err(|e| SentinelError::InvalidConfig {
                details: format!("sealer.key_hex is not valid hex: {e}"),
            })?;
            if decoded.len() != KEY_LEN {
                return Err(SentinelError::InvalidConfig {
                    details: format!("sealer.key_hex must decode to {KEY_LEN} bytes, got {}", decoded.len()),
                });
            }
        }

        Ok(())
    }

    // ──────────────────── effective settings ────────────────────

    /// Effective profile of one protocol after overrides.
    pub fn profile(&self, kind: ProtocolKind) -> ProtocolProfile {
        let o = self.protocols.get(kind.name());
        let mut profile = kind
            .profile()
            .with_emergency_cooldown(Duration::from_millis(self.engine.emergency_cooldown_ms));

        if let Some(ms) = o.and_then(|o| o.interval_ms).or(self.engine.interval_ms) {
            profile = profile.with_interval(Duration::from_millis(ms));
        }
        if let Some(t) = o
            .and_then(|o| o.escalation_threshold)
            .or(self.engine.escalation_threshold)
        {
            profile = profile.with_escalation_threshold(t);
        }
        if let Some(r) = o.and_then(|o| o.max_retries).or(self.engine.max_retries) {
            profile = profile.with_max_retries(r);
        }
        if let Some(b) = o.and_then(|o| o.batch_size).or(self.engine.batch_size) {
            profile = profile.with_batch_size(b);
        }
        if let Some(t) = o.and_then(|o| o.score_threshold) {
            profile = profile.with_score_threshold(t);
        }
        profile
    }

    /// Whether a protocol should run. Protocols default to enabled.
    pub fn is_enabled(&self, kind: ProtocolKind) -> bool {
        self.protocols.get(kind.name()).is_none_or(|o| o.enabled)
    }

    /// Effective profiles of every enabled protocol, in catalog order.
    pub fn enabled_profiles(&self) -> Vec<ProtocolProfile> {
        ProtocolKind::ALL
            .into_iter()
            .filter(|k| self.is_enabled(*k))
            .map(|k| self.profile(k))
            .collect()
    }

    /// Dual-ledger options derived from `[ledger]`.
    pub fn dual_ledger_config(&self) -> DualLedgerConfig {
        DualLedgerConfig {
            jsonl: JsonlConfig {
                path: self.ledger.jsonl_path.clone(),
                fallback_path: self.ledger.fallback_path.clone(),
                max_size_bytes: self.ledger.max_size_bytes,
                max_rotated_files: self.ledger.max_rotated_files,
                fsync_interval_secs: self.ledger.fsync_interval_secs,
            },
            sqlite_path: self.ledger.sqlite_path.clone(),
            channel_capacity: self.ledger.channel_capacity,
        }
    }

    /// Sealer described by `[sealer]`.
    pub fn build_sealer(&self) -> Result<Arc<dyn PayloadSealer>> {
        match (&self.sealer.key_hex, self.sealer.enabled) {
            (Some(key), true) => Ok(Arc::new(AesGcmSealer::from_hex(key)?)),
            (None, true) => Err(SentinelError::InvalidConfig {
                details: "sealer enabled without a key".to_string(),
            }),
            (_, false) => Ok(Arc::new(PassthroughSealer)),
        }
    }
}

/// Accept `Spam-Filter` and ` spam_filter ` for `spam_filter`.
fn normalize_protocol_name(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('-', "_")
}

fn validate_interval(name: &str, ms: u64) -> Result<()> {
    if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&ms) {
        return Err(SentinelError::InvalidConfig {
            details: format!("{name} must be in [{MIN_INTERVAL_MS}, {MAX_INTERVAL_MS}], got {ms}"),
        });
    }
    Ok(())
}

fn validate_min(name: &str, value: Option<u64>) -> Result<()> {
    if value == Some(0) {
        return Err(SentinelError::InvalidConfig {
            details: format!("{name} must be >= 1"),
        });
    }
    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| SentinelError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn set_val<T, F>(name: &str, lookup: &mut F, slot: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = parse_env(name, &raw)?;
    }
    Ok(())
}

fn set_opt<T, F>(name: &str, lookup: &mut F, slot: &mut Option<T>) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = Some(parse_env(name, &raw)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;

    use super::{Config, SentinelError};
    use crate::protocols::ProtocolKind;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.enabled_profiles().len(), ProtocolKind::ALL.len());
    }

    #[test]
    fn catalog_defaults_survive_without_overrides() {
        let cfg = Config::default();
        let profile = cfg.profile(ProtocolKind::Sybil);
        assert_eq!(profile, ProtocolKind::Sybil.profile().with_emergency_cooldown(profile.emergency_cooldown));
    }

    #[test]
    fn protocol_override_beats_engine_override() {
        let cfg = Config::from_toml_str(
            r#"
            [engine]
            escalation_threshold = 4
            max_retries = 5

            [protocols.phishing]
            escalation_threshold = 2
            interval_ms = 1500
            score_threshold = 0.6
            "#,
        )
        .unwrap();

        let phishing = cfg.profile(ProtocolKind::Phishing);
        assert_eq!(phishing.escalation_threshold, 2);
        assert_eq!(phishing.max_retries, 5);
        assert_eq!(phishing.interval.as_millis(), 1500);

        let sybil = cfg.profile(ProtocolKind::Sybil);
        assert_eq!(sybil.escalation_threshold, 4);
    }

    #[test]
    fn disabled_protocols_are_skipped() {
        let cfg = Config::from_toml_str(
            r"
            [protocols.spam_filter]
            enabled = false
            ",
        )
        .unwrap();
        assert!(!cfg.is_enabled(ProtocolKind::SpamFilter));
        assert!(
            cfg.enabled_profiles()
                .iter()
                .all(|p| p.name != "spam_filter")
        );
    }

    #[test]
    fn protocol_names_are_normalized() {
        let cfg = Config::from_toml_str(
            r#"
            [protocols."Spam-Filter"]
            enabled = false
            "#,
        )
        .unwrap();
        assert!(!cfg.is_enabled(ProtocolKind::SpamFilter));
    }

    #[test]
    fn unknown_protocol_rejected() {
        let err = Config::from_toml_str("[protocols.tea_party]\n").unwrap_err();
        assert!(matches!(err, SentinelError::UnknownProtocol { .. }));
    }

    #[test]
    fn interval_out_of_range_rejected() {
        let mut cfg = Config::default();
        cfg.engine.interval_ms = Some(10);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("engine.interval_ms"));
    }

    #[test]
    fn zero_threshold_rejected() {
        let err = Config::from_toml_str(
            r"
            [protocols.oracle_drift]
            max_retries = 0
            ",
        )
        .unwrap_err();
        assert!(err.to_string().contains("protocols.oracle_drift.max_retries"));
    }

    #[test]
    fn sealer_requires_valid_key() {
        let mut cfg = Config::default();
        cfg.sealer.enabled = true;
        assert!(cfg.validate().is_err());

        cfg.sealer.key_hex = Some("abcd".to_string());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("32 bytes"));

        cfg.sealer.key_hex = Some(KEY.to_string());
        assert!(cfg.validate().is_ok());
        assert!(cfg.build_sealer().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let env = vars(&[
            ("SENTINEL_MAX_RETRIES", "4"),
            ("SENTINEL_EMERGENCY_COOLDOWN_MS", "250"),
            ("SENTINEL_LEDGER_SQLITE_PATH", "off"),
            ("SENTINEL_SEALER_ENABLED", "true"),
            ("SENTINEL_SEALER_KEY", KEY),
        ]);
        let mut cfg = Config::default();
        cfg.apply_env_overrides_from(|name| env.get(name).cloned())
            .unwrap();
        cfg.validate().unwrap();

        assert_eq!(cfg.engine.max_retries, Some(4));
        assert_eq!(cfg.engine.emergency_cooldown_ms, 250);
        assert!(cfg.ledger.sqlite_path.is_none());
        assert!(cfg.sealer.enabled);
        assert_eq!(cfg.profile(ProtocolKind::NodeHealth).max_retries, 4);
    }

    #[test]
    fn env_protocol_subset() {
        let env = vars(&[("SENTINEL_PROTOCOLS", "phishing, spam_filter")]);
        let mut cfg = Config::default();
        cfg.apply_env_overrides_from(|name| env.get(name).cloned())
            .unwrap();
        let names: Vec<_> = cfg.enabled_profiles().iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["phishing", "spam_filter"]);
    }

    #[test]
    fn env_protocol_subset_accepts_unnormalized_names() {
        let env = vars(&[("SENTINEL_PROTOCOLS", " Spam-Filter ,PHISHING")]);
        let mut cfg = Config::default();
        cfg.apply_env_overrides_from(|name| env.get(name).cloned())
            .unwrap();
        let names: Vec<_> = cfg.enabled_profiles().iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["phishing", "spam_filter"]);
    }

    #[test]
    fn env_protocol_subset_keeps_file_overrides() {
        let mut cfg: Config = toml::from_str(
            r#"
            [protocols."Spam-Filter"]
            interval_ms = 5000
            "#,
        )
        .unwrap();
        cfg.normalize().unwrap();
        let env = vars(&[("SENTINEL_PROTOCOLS", "spam_filter")]);
        cfg.apply_env_overrides_from(|name| env.get(name).cloned())
            .unwrap();
        cfg.validate().unwrap();

        let profile = cfg.profile(ProtocolKind::SpamFilter);
        assert_eq!(profile.interval.as_millis(), 5000);
        assert!(cfg.is_enabled(ProtocolKind::SpamFilter));
        assert!(!cfg.is_enabled(ProtocolKind::Phishing));
    }

    #[test]
    fn colliding_protocol_names_rejected() {
        let err = Config::from_toml_str(
            r#"
            [protocols."Spam-Filter"]
            interval_ms = 5000

            [protocols.spam_filter]
            interval_ms = 7000
            "#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "SNT-1001");
        assert!(err.to_string().contains("spam_filter"));
    }

    #[test]
    fn env_invalid_number_rejected() {
        let env = vars(&[("SENTINEL_BATCH_SIZE", "lots")]);
        let mut cfg = Config::default();
        let err = cfg
            .apply_env_overrides_from(|name| env.get(name).cloned())
            .unwrap_err();
        assert_eq!(err.code(), "SNT-1003");
    }

    #[test]
    fn stable_hash_changes_when_config_changes() {
        let mut cfg = Config::default();
        let before = cfg.stable_hash().unwrap();
        assert_eq!(before, cfg.stable_hash().unwrap());
        cfg.engine.batch_size = Some(10);
        assert_ne!(before, cfg.stable_hash().unwrap());
    }

    #[test]
    fn stable_hash_ignores_sealer_key() {
        let mut cfg = Config::default();
        let before = cfg.stable_hash().unwrap();
        cfg.sealer.key_hex = Some(KEY.to_string());
        assert_eq!(before, cfg.stable_hash().unwrap());
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let err = Config::load(Some(Path::new("/nonexistent/sentinel/config.toml"))).unwrap_err();
        assert!(matches!(err, SentinelError::MissingConfig { .. }));
    }

    #[test]
    fn load_reads_file_and_records_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[engine]\nbatch_size = 50\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.paths.config_file, path);
        assert_eq!(cfg.engine.batch_size, Some(50));
    }

    #[test]
    fn dual_ledger_config_mirrors_ledger_section() {
        let mut cfg = Config::default();
        cfg.ledger.channel_capacity = 7;
        cfg.ledger.max_rotated_files = 2;
        let dual = cfg.dual_ledger_config();
        assert_eq!(dual.channel_capacity, 7);
        assert_eq!(dual.jsonl.max_rotated_files, 2);
        assert_eq!(dual.jsonl.path, cfg.ledger.jsonl_path);
    }
}
