//! Durable translation table backed by a single SQLite file.

use std::path::Path;

use rusqlite::{params, Connection};
use tracing::error;

/// Result of store operations, surfaced directly from the SQLite binding.
pub type Result<T> = rusqlite::Result<T>;

/// Handle over the on-disk `translations` table.
///
/// Every connection switches to write-ahead journaling so concurrent
/// readers (the change watcher, the integrity probe, external tooling)
/// never block the single writer.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open the store, creating the file and table as needed.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS translations \
             (original TEXT PRIMARY KEY, translated TEXT)",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Probe a store file for corruption on a short-lived connection.
    pub fn check_integrity(path: &Path) -> bool {
        let probe = |path: &Path| -> Result<String> {
            let conn = Connection::open(path)?;
            conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))
        };
        match probe(path) {
            Ok(verdict) => verdict == "ok",
            Err(err) => {
                error!("store integrity probe failed: {err}");
                false
            }
        }
    }

    /// All rows, ordered by original path.
    pub fn load(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT original, translated FROM translations ORDER BY original")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect()
    }

    /// Insert the row for `original`, replacing any previous pairing.
    pub fn upsert(&self, original: &str, translated: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO translations (original, translated) VALUES (?1, ?2)",
            params![original, translated],
        )?;
        Ok(())
    }

    /// Delete the row for `original`, if any.
    pub fn remove(&self, original: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM translations WHERE original = ?1", params![original])?;
        Ok(())
    }

    /// Delete every row.
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM translations", [])?;
        Ok(())
    }
}
