//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use chain_sentinel::authority::sealer::AesGcmSealer;
use chain_sentinel::core::config::Config;
use chain_sentinel::core::errors::SentinelError;
use chain_sentinel::daemon::state_file::{SentinelState, read_state};
use chain_sentinel::ledger::LedgerEntry;
use chain_sentinel::ledger::jsonl::read_tail_of_type;

/// Security automation engine for blockchain networks.
#[derive(Debug, Parser)]
#[command(
    name = "sentinel",
    author,
    version,
    about = "Chain Sentinel - periodic detection, escalation, and remediation",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List the protocol catalog with effective settings.
    Protocols,
    /// Inspect and validate configuration.
    Config(ConfigArgs),
    /// Read the remediation ledger.
    Ledger(LedgerArgs),
    /// Show the supervisor's last state snapshot.
    Status(StatusArgs),
    /// Payload sealer utilities.
    Sealer(SealerArgs),
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Load, validate, and print the config hash.
    Check,
    /// Print the effective configuration.
    Show,
}

#[derive(Debug, Clone, Args)]
struct LedgerArgs {
    #[command(subcommand)]
    command: LedgerCommand,
}

#[derive(Debug, Clone, Subcommand)]
enum LedgerCommand {
    /// Print the most recent entries of a JSONL ledger.
    Tail(TailArgs),
}

#[derive(Debug, Clone, Args)]
struct TailArgs {
    /// Ledger file; defaults to `[ledger].jsonl_path`.
    #[arg(long, value_name = "PATH")]
    path: Option<PathBuf>,
    /// Number of entries.
    #[arg(long, default_value_t = 20)]
    limit: usize,
    /// Only entries of this event type.
    #[arg(long = "type", value_name = "EVENT")]
    event_type: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct StatusArgs {
    /// State file; defaults to `[paths].state_file`.
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct SealerArgs {
    #[command(subcommand)]
    command: SealerCommand,
}

#[derive(Debug, Clone, Subcommand)]
enum SealerCommand {
    /// Generate a fresh AES-256 key for `[sealer].key_hex`.
    Keygen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<SentinelError> for CliError {
    fn from(err: SentinelError) -> Self {
        match err {
            SentinelError::InvalidConfig { .. }
            | SentinelError::MissingConfig { .. }
            | SentinelError::ConfigParse { .. }
            | SentinelError::UnknownProtocol { .. } => Self::User(err.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// Install the diagnostics subscriber. `SENTINEL_LOG` wins over the flags.
pub fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_env("SENTINEL_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Protocols => run_protocols(cli),
        Command::Config(args) => run_config(cli, args),
        Command::Ledger(args) => run_ledger(cli, args),
        Command::Status(args) => run_status(cli, args),
        Command::Sealer(args) => run_sealer(cli, args),
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Ok(Config::load(cli.config.as_deref())?)
}

// ---------------------------------------------------------------------------
// protocols
// ---------------------------------------------------------------------------

fn run_protocols(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let profiles: Vec<_> = chain_sentinel::protocols::ProtocolKind::ALL
        .into_iter()
        .map(|kind| (config.is_enabled(kind), config.profile(kind)))
        .collect();

    match output_mode(cli) {
        OutputMode::Json => {
            let rows: Vec<Value> = profiles
                .iter()
                .map(|(enabled, profile)| {
                    let mut row = serde_json::to_value(profile)?;
                    row["enabled"] = json!(enabled);
                    Ok(row)
                })
                .collect::<Result<_, serde_json::Error>>()?;
            write_json_line(&json!({ "command": "protocols", "protocols": rows }))
        }
        OutputMode::Human => {
            let mut out = io::stdout().lock();
            writeln!(
                out,
                "{:<22} {:>3} {:>7} {:>9} {:>7} {:>6}  {}",
                "PROTOCOL", "ON", "EVERY", "ESCALATE", "RETRY", "BATCH", "ESCALATED ACTION"
            )?;
            for (enabled, p) in &profiles {
                writeln!(
                    out,
                    "{:<22} {:>3} {:>6}s {:>9} {:>7} {:>6}  {}",
                    p.name,
                    if *enabled { "yes" } else { "no" },
                    p.interval.as_secs(),
                    p.escalation_threshold,
                    p.max_retries,
                    p.batch_size,
                    p.labels.escalate,
                )?;
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let hash = config.stable_hash()?;
    let enabled = config.enabled_profiles().len();

    match (&args.command, output_mode(cli)) {
        (ConfigCommand::Check, OutputMode::Json) => write_json_line(&json!({
            "command": "config check",
            "valid": true,
            "path": config.paths.config_file,
            "hash": hash,
            "enabled_protocols": enabled,
        })),
        (ConfigCommand::Check, OutputMode::Human) => {
            println!("config ok: {}", config.paths.config_file.display());
            println!("  hash:               {hash}");
            println!("  enabled protocols:  {enabled}");
            println!("  sealing:            {}", if config.sealer.enabled { "aes-256-gcm" } else { "off" });
            Ok(())
        }
        (ConfigCommand::Show, OutputMode::Json) => write_json_line(&serde_json::to_value(&config)?),
        (ConfigCommand::Show, OutputMode::Human) => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| CliError::Runtime(format!("failed to render config: {e}")))?;
            print!("{rendered}");
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// ledger
// ---------------------------------------------------------------------------

fn run_ledger(cli: &Cli, args: &LedgerArgs) -> Result<(), CliError> {
    let LedgerCommand::Tail(tail) = &args.command;
    let path = match &tail.path {
        Some(path) => path.clone(),
        None => load_config(cli)?.ledger.jsonl_path,
    };

    let entries = read_tail_of_type(&path, tail.limit, tail.event_type.as_deref())?;

    match output_mode(cli) {
        OutputMode::Json => {
            for entry in &entries {
                write_json_line(&serde_json::to_value(entry)?)?;
            }
            Ok(())
        }
        OutputMode::Human => {
            let mut out = io::stdout().lock();
            for entry in &entries {
                writeln!(out, "{}", format_entry(entry))?;
            }
            Ok(())
        }
    }
}

fn format_entry(entry: &LedgerEntry) -> String {
    let when = chrono::DateTime::from_timestamp(entry.timestamp, 0)
        .map_or_else(|| entry.timestamp.to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());
    format!(
        "{when}  {:<7} {:<28} {}  [{}]",
        entry.status, entry.event_type, entry.details, entry.id
    )
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

fn run_status(cli: &Cli, args: &StatusArgs) -> Result<(), CliError> {
    let path = match &args.state {
        Some(path) => path.clone(),
        None => load_config(cli)?.paths.state_file,
    };
    let state = read_state(&path)?;

    match output_mode(cli) {
        OutputMode::Json => write_json_line(&serde_json::to_value(&state)?),
        OutputMode::Human => print_status_human(&state),
    }
}

fn print_status_human(state: &SentinelState) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "sentinel {} (pid {}), up {}s, config {}",
        state.version, state.pid, state.uptime_seconds, state.config_hash
    )?;
    if state.is_stale() {
        writeln!(out, "WARNING: snapshot is stale (last updated {})", state.last_updated)?;
    }
    writeln!(out, "ledger entries: {}", state.ledger_entries)?;
    writeln!(
        out,
        "{:<22} {:>8} {:>8} {:>9} {:>6} {:>9}",
        "PROTOCOL", "CYCLES", "TRACKED", "ESCALATED", "FAILED", "COALESCED"
    )?;
    for (name, p) in &state.protocols {
        writeln!(
            out,
            "{name:<22} {:>8} {:>8} {:>9} {:>6} {:>9}",
            p.cycles, p.tracked_entities, p.escalated_entities, p.failed_entities, p.coalesced_ticks
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// sealer
// ---------------------------------------------------------------------------

fn run_sealer(cli: &Cli, args: &SealerArgs) -> Result<(), CliError> {
    let SealerCommand::Keygen = args.command;
    let (_sealer, key_hex) = AesGcmSealer::generate();
    match output_mode(cli) {
        OutputMode::Json => write_json_line(&json!({ "key_hex": key_hex })),
        OutputMode::Human => {
            println!("{key_hex}");
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// output helpers
// ---------------------------------------------------------------------------

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("SENTINEL_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
