//! JSONL ledger sink: one self-contained JSON object per line.
//!
//! Lines are assembled in memory and written with a single `write_all` so a
//! concurrent tail never sees a partial entry. Degradation chain:
//! 1. Primary file path
//! 2. Fallback path (e.g. on a different volume)
//! 3. stderr with `[SNT-LEDGER]` prefix
//! 4. Silent discard (a ledger failure must never take the process down)

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions, rename};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use super::{LedgerEntry, LedgerRecorder};
use crate::core::errors::{Result, SentinelError};

/// Where the writer currently sends lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkState {
    Primary,
    Fallback,
    Stderr,
    Discard,
}

impl SinkState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
            Self::Stderr => "stderr",
            Self::Discard => "discard",
        }
    }
}

/// Configuration for the JSONL ledger file.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    /// Primary ledger file.
    pub path: PathBuf,
    /// Optional fallback file, ideally on another filesystem.
    pub fallback_path: Option<PathBuf>,
    /// Rotate once the file would exceed this many bytes.
    pub max_size_bytes: u64,
    /// Rotated generations kept (`ledger.jsonl.1` .. `.N`).
    pub max_rotated_files: u32,
    /// Seconds between forced `fsync` calls.
    pub fsync_interval_secs: u64,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/sentinel/ledger.jsonl"),
            fallback_path: None,
            max_size_bytes: 64 * 1024 * 1024,
            max_rotated_files: 5,
            fsync_interval_secs: 10,
        }
    }
}

/// Append-only JSONL writer with rotation and fallback.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: SinkState,
    bytes_written: u64,
    last_fsync: SystemTime,
}

impl JsonlWriter {
    /// Open the ledger file, falling through the degradation chain on failure.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            writer: None,
            state: SinkState::Discard,
            bytes_written: 0,
            last_fsync: SystemTime::now(),
        };
        w.open_primary();
        w
    }

    /// Write one entry as one line.
    pub fn write_entry(&mut self, entry: &LedgerEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[SNT-LEDGER] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    /// Flush the userspace buffer to the OS.
    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut()
            && w.flush().is_err()
        {
            self.degrade();
        }
    }

    /// Flush and `fsync` the underlying file.
    pub fn fsync(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
            let _ = w.get_ref().sync_data();
        }
        self.last_fsync = SystemTime::now();
    }

    /// Current sink: `primary`, `fallback`, `stderr`, or `discard`.
    pub fn state(&self) -> &'static str {
        self.state.as_str()
    }

    /// Bytes in the current file.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Try to return to the primary path after a degradation.
    pub fn try_recover(&mut self) {
        if self.state == SinkState::Primary {
            return;
        }
        if let Ok((file, size)) = open_append(&self.config.path) {
            self.writer = Some(BufWriter::new(file));
            self.state = SinkState::Primary;
            self.bytes_written = size;
        }
    }

    // ──────────────────────── internals ────────────────────────

    fn write_line(&mut self, line: &str) {
        if self.bytes_written + line.len() as u64 > self.config.max_size_bytes
            && matches!(self.state, SinkState::Primary | SinkState::Fallback)
        {
            self.rotate();
        }

        match self.state {
            SinkState::Primary | SinkState::Fallback => {
                let written = self
                    .writer
                    .as_mut()
                    .is_some_and(|w| w.write_all(line.as_bytes()).is_ok());
                if written {
                    self.bytes_written += line.len() as u64;
                    self.maybe_fsync();
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            SinkState::Stderr => {
                let _ = write!(io::stderr(), "[SNT-LEDGER] {line}");
            }
            SinkState::Discard => {}
        }
    }

    fn maybe_fsync(&mut self) {
        let elapsed = SystemTime::now()
            .duration_since(self.last_fsync)
            .unwrap_or(Duration::ZERO);
        if elapsed.as_secs() >= self.config.fsync_interval_secs {
            self.fsync();
        }
    }

    fn open_primary(&mut self) {
        match open_append(&self.config.path) {
            Ok((file, size)) => {
                self.writer = Some(BufWriter::new(file));
                self.state = SinkState::Primary;
                self.bytes_written = size;
            }
            Err(_) => self.open_fallback(),
        }
    }

    fn open_fallback(&mut self) {
        let opened = self
            .config
            .fallback_path
            .as_deref()
            .and_then(|fb| open_append(fb).ok().map(|opened| (fb.to_path_buf(), opened)));
        if let Some((path, (file, size))) = opened {
            let _ = writeln!(
                io::stderr(),
                "[SNT-LEDGER] primary path failed, using fallback: {}",
                path.display()
            );
            self.writer = Some(BufWriter::new(file));
            self.state = SinkState::Fallback;
            self.bytes_written = size;
        } else {
            let _ = writeln!(io::stderr(), "[SNT-LEDGER] no writable ledger file, using stderr");
            self.state = SinkState::Stderr;
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        match self.state {
            SinkState::Primary => self.open_fallback(),
            SinkState::Fallback => {
                let _ = writeln!(io::stderr(), "[SNT-LEDGER] fallback write failed, using stderr");
                self.state = SinkState::Stderr;
            }
            SinkState::Stderr | SinkState::Discard => self.state = SinkState::Discard,
        }
    }

    fn rotate(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
        self.writer = None;

        let base = match self.state {
            SinkState::Primary => self.config.path.clone(),
            SinkState::Fallback => match &self.config.fallback_path {
                Some(p) => p.clone(),
                None => return,
            },
            SinkState::Stderr | SinkState::Discard => return,
        };

        // .N is dropped, .N-1 → .N, …, current → .1
        let _ = fs::remove_file(rotated_name(&base, self.config.max_rotated_files));
        for i in (1..self.config.max_rotated_files).rev() {
            let _ = rename(rotated_name(&base, i), rotated_name(&base, i + 1));
        }
        let _ = rename(&base, rotated_name(&base, 1));

        match open_append(&base) {
            Ok((file, _)) => {
                self.writer = Some(BufWriter::new(file));
                self.bytes_written = 0;
            }
            Err(_) => self.degrade(),
        }
    }
}

// ──────────────────────── recorder ────────────────────────

/// [`LedgerRecorder`] over a [`JsonlWriter`]. Each append is flushed before
/// returning.
pub struct JsonlLedger {
    writer: Mutex<JsonlWriter>,
}

impl JsonlLedger {
    /// Open the ledger file described by `config`.
    pub fn open(config: JsonlConfig) -> Self {
        Self {
            writer: Mutex::new(JsonlWriter::open(config)),
        }
    }

    /// Current sink state of the underlying writer.
    pub fn state(&self) -> &'static str {
        self.writer.lock().state()
    }
}

impl LedgerRecorder for JsonlLedger {
    fn append(&self, entry: LedgerEntry) {
        let mut writer = self.writer.lock();
        writer.write_entry(&entry);
        writer.flush();
    }

    fn flush(&self) {
        self.writer.lock().fsync();
    }
}

// ──────────────────────── reading ────────────────────────

/// Read the last `limit` well-formed entries of a ledger file, oldest first.
/// Malformed lines (e.g. a torn tail after a crash) are skipped.
pub fn read_tail(path: &Path, limit: usize) -> Result<Vec<LedgerEntry>> {
    read_tail_of_type(path, limit, None)
}

/// Like [`read_tail`], keeping only entries whose `type` equals `event_type`.
///
/// The filter runs before the window, so older matches are still found.
pub fn read_tail_of_type(path: &Path, limit: usize, event_type: Option<&str>) -> Result<Vec<LedgerEntry>> {
    let file = File::open(path).map_err(|source| SentinelError::io(path, source))?;
    let mut tail = VecDeque::with_capacity(limit.min(1024));
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| SentinelError::io(path, source))?;
        let Ok(entry) = serde_json::from_str::<LedgerEntry>(&line) else {
            continue;
        };
        if event_type.is_some_and(|wanted| entry.event_type != wanted) {
            continue;
        }
        if tail.len() == limit {
            tail.pop_front();
        }
        if limit > 0 {
            tail.push_back(entry);
        }
    }
    Ok(tail.into())
}

// ──────────────────────── helpers ────────────────────────

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| SentinelError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SentinelError::io(path, source))?;
    let size = file.metadata().map_or(0, |m| m.len());
    Ok((file, size))
}

/// `ledger.jsonl` → `ledger.jsonl.3`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

// ──────────────────────── tests ────────────────────────
