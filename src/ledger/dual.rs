//! Dual-write ledger: a dedicated writer thread fans entries out to the JSONL
//! file and (optionally) SQLite.
//!
//! Engines hold a cheap [`DualLedger`] handle. `append` performs a *blocking*
//! bounded send: it returns once the entry sits in the writer's queue, and an
//! entry is never dropped for back-pressure. SQLite failures disable that sink
//! for the rest of the run; the JSONL sink carries its own fallback chain.

#![allow(missing_docs)]

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;

use super::jsonl::{JsonlConfig, JsonlWriter};
#[cfg(feature = "sqlite")]
use super::sqlite::SqliteLedger;
use super::{LedgerEntry, LedgerRecorder};
use crate::core::errors::{Result, SentinelError};

/// Default bounded queue capacity.
const CHANNEL_CAPACITY: usize = 1024;

/// Idle interval after which a degraded JSONL sink retries its primary path.
const RECOVER_INTERVAL: Duration = Duration::from_secs(30);

enum Command {
    Append(LedgerEntry),
    Flush(Sender<()>),
    Shutdown,
}

/// Options for the dual-write ledger.
#[derive(Debug, Clone)]
pub struct DualLedgerConfig {
    /// JSONL file (always active).
    pub jsonl: JsonlConfig,
    /// SQLite database; `None` disables it.
    pub sqlite_path: Option<PathBuf>,
    /// Bounded queue capacity.
    pub channel_capacity: usize,
}

impl Default for DualLedgerConfig {
    fn default() -> Self {
        Self {
            jsonl: JsonlConfig::default(),
            sqlite_path: None,
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

/// Cloneable handle to the ledger writer thread.
#[derive(Clone)]
pub struct DualLedger {
    tx: Sender<Command>,
    appended: Arc<AtomicU64>,
    join: Arc<Mutex<Option<thread::JoinHandle<()>>>>,
}

impl DualLedger {
    /// Spawn the writer thread.
    pub fn spawn(config: DualLedgerConfig) -> Result<Self> {
        let (tx, rx) = bounded::<Command>(config.channel_capacity.max(1));
        let join = thread::Builder::new()
            .name("sentinel-ledger".to_string())
            .spawn(move || writer_main(&rx, config.jsonl, config.sqlite_path))
            .map_err(|e| SentinelError::Runtime {
                details: format!("failed to spawn ledger thread: {e}"),
            })?;

        Ok(Self {
            tx,
            appended: Arc::new(AtomicU64::new(0)),
            join: Arc::new(Mutex::new(Some(join))),
        })
    }

    /// Drain the queue, stop the writer thread, and wait for it.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.join.lock().take() {
            let _ = handle.join();
        }
    }
}

impl LedgerRecorder for DualLedger {
    fn append(&self, entry: LedgerEntry) {
        match self.tx.send(Command::Append(entry)) {
            Ok(()) => {
                self.appended.fetch_add(1, Ordering::Relaxed);
            }
            Err(crossbeam_channel::SendError(Command::Append(entry))) => {
                // Writer already gone (shutdown); keep the entry visible.
                let _ = writeln!(io::stderr(), "{}", closed_line(&entry));
            }
            Err(_) => {}
        }
    }

    fn flush(&self) {
        let (ack_tx, ack_rx) = bounded(1);
        if self.tx.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// Entries accepted into the queue so far.
    fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }
}

/// Stderr line for an entry that arrived after the writer shut down.
fn closed_line(entry: &LedgerEntry) -> String {
    let json = serde_json::to_string(entry).unwrap_or_default();
    let err = SentinelError::ChannelClosed { component: "ledger" };
    format!("{err}: {json}")
}

// ──────────────────── writer thread ────────────────────

struct Sinks {
    jsonl: JsonlWriter,
    #[cfg(feature = "sqlite")]
    sqlite: Option<SqliteLedger>,
}

impl Sinks {
    fn open(jsonl: JsonlConfig, sqlite_path: Option<PathBuf>) -> Self {
        #[cfg(feature = "sqlite")]
        let sqlite = sqlite_path.and_then(|path| match SqliteLedger::open(&path) {
            Ok(db) => Some(db),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[SNT-LEDGER] sqlite disabled: {e}");
                None
            }
        });
        #[cfg(not(feature = "sqlite"))]
        let _ = sqlite_path;

        Self {
            jsonl: JsonlWriter::open(jsonl),
            #[cfg(feature = "sqlite")]
            sqlite,
        }
    }

    fn write(&mut self, entry: &LedgerEntry) {
        self.jsonl.write_entry(entry);
        #[cfg(feature = "sqlite")]
        {
            let failed = self.sqlite.as_ref().and_then(|db| db.insert(entry).err());
            if let Some(e) = failed {
                let _ = writeln!(io::stderr(), "[SNT-LEDGER] sqlite insert failed, disabling: {e}");
                self.sqlite = None;
            }
        }
    }
}

fn writer_main(rx: &Receiver<Command>, jsonl: JsonlConfig, sqlite_path: Option<PathBuf>) {
    let mut sinks = Sinks::open(jsonl, sqlite_path);

    loop {
        let command = match rx.recv_timeout(RECOVER_INTERVAL) {
            Ok(command) => command,
            Err(RecvTimeoutError::Timeout) => {
                sinks.jsonl.try_recover();
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        match command {
            Command::Append(entry) => {
                sinks.write(&entry);
                // Flush once the burst is drained.
                if rx.is_empty() {
                    sinks.jsonl.flush();
                }
            }
            Command::Flush(ack) => {
                sinks.jsonl.fsync();
                sinks.jsonl.try_recover();
                let _ = ack.send(());
            }
            Command::Shutdown => break,
        }
    }

    // Drain anything queued behind the shutdown sentinel.
    while let Ok(command) = rx.try_recv() {
        match command {
            Command::Append(entry) => sinks.write(&entry),
            Command::Flush(ack) => {
                let _ = ack.send(());
            }
            Command::Shutdown => {}
        }
    }
    sinks.jsonl.fsync();
}
