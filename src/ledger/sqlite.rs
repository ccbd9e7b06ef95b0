//! SQLite ledger sink: WAL-mode table for querying remediation history.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, params};

use super::LedgerEntry;
use crate::core::errors::{Result, SentinelError};

/// SQLite-backed ledger store.
pub struct SqliteLedger {
    conn: Connection,
    path: PathBuf,
}

impl SqliteLedger {
    /// Open (or create) the database at `path`, applying schema and PRAGMAs.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| SentinelError::io(parent, source))?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        apply_pragmas(&conn)?;
        apply_schema(&conn)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert one entry.
    pub fn insert(&self, entry: &LedgerEntry) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO ledger (entry_id, timestamp, event_type, status, details)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![
                entry.id,
                entry.timestamp,
                entry.event_type,
                entry.status,
                entry.details,
            ])?;
        Ok(())
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT entry_id, timestamp, event_type, status, details
             FROM ledger ORDER BY seq DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All entries of one event type, oldest first.
    pub fn by_type(&self, event_type: &str) -> Result<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT entry_id, timestamp, event_type, status, details
             FROM ledger WHERE event_type = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt
            .query_map(params![event_type], row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Total number of entries.
    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ledger", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        event_type: row.get(2)?,
        status: row.get(3)?,
        details: row.get(4)?,
    })
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS ledger (
            seq        INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id   TEXT    NOT NULL,
            timestamp  INTEGER NOT NULL,
            event_type TEXT    NOT NULL,
            status     TEXT    NOT NULL,
            details    TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_ledger_type ON ledger (event_type);
        CREATE INDEX IF NOT EXISTS idx_ledger_entry_id ON ledger (entry_id);",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::EntryStatus;

    #[test]
    fn insert_and_query_recent() {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteLedger::open(&dir.path().join("ledger.sqlite3")).unwrap();

        for event in ["Alert Issued", "Alert Issued", "Validator Slashed"] {
            db.insert(&LedgerEntry::for_entity(
                "validator_misbehavior",
                "val-1",
                event,
                EntryStatus::Success,
                "",
            ))
            .unwrap();
        }

        assert_eq!(db.count().unwrap(), 3);
        let recent = db.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event_type, "Validator Slashed");
        assert_eq!(db.by_type("Alert Issued").unwrap().len(), 2);
    }

    #[test]
    fn duplicate_ids_are_kept_as_separate_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteLedger::open(&dir.path().join("dup.sqlite3")).unwrap();
        let entry = LedgerEntry::for_entity("p", "k", "T", EntryStatus::Failed, "x");
        db.insert(&entry).unwrap();
        db.insert(&entry).unwrap();
        assert_eq!(db.count().unwrap(), 2);
        assert_eq!(db.recent(1).unwrap()[0], entry);
    }

    #[test]
    fn reopen_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.sqlite3");
        {
            let db = SqliteLedger::open(&path).unwrap();
            db.insert(&LedgerEntry::finalization("p", 1000, 1000)).unwrap();
        }
        let db = SqliteLedger::open(&path).unwrap();
        assert_eq!(db.path(), path.as_path());
        assert_eq!(db.count().unwrap(), 1);
    }
}
