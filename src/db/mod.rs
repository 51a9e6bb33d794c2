//! SQLite-based local cache for the recording catalog.
//!
//! The database lives at `~/.mediathek/mediathek.db`. Synced data
//! (conference groups, conferences, events, recordings, related events) is
//! a cache of the remote API and can be rebuilt at any time; user data
//! (watchlist, playback progress, recommendations, offline events) is keyed
//! by event GUID so it survives a full re-sync.

use std::path::PathBuf;

use rusqlite::Connection;

pub mod types;
pub use types::*;

pub struct MediaDb {
    conn: Connection,
}

impl MediaDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Self) -> Result<T, DbError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(val) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) the database at `~/.mediathek/mediathek.db` and
    /// apply the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.mediathek/mediathek.db`.
    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".mediathek").join("mediathek.db"))
    }

    /// Delete all synced catalog data, leaving user data untouched.
    ///
    /// Children first so FK constraints hold at every step.
    pub fn clear_synced_data(&self) -> Result<(), DbError> {
        self.with_transaction(|db| {
            db.conn.execute("DELETE FROM related_events", [])?;
            db.conn.execute("DELETE FROM recordings", [])?;
            db.conn.execute("DELETE FROM events", [])?;
            db.conn.execute("DELETE FROM conferences", [])?;
            db.conn.execute("DELETE FROM conference_groups", [])?;
            Ok(())
        })
    }
}

pub mod conferences;
pub mod events;
pub mod recordings;
pub mod userdata;

// =============================================================================
// Shared test utilities
// =============================================================================

#[cfg(test)]
pub mod test_utils {
    use super::MediaDb;

    /// Create a temporary database for testing.
    ///
    /// We leak the `TempDir` so the directory persists for the duration of
    /// the test. Test temp dirs are cleaned up by the OS.
    pub fn test_db() -> MediaDb {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.db");
        std::mem::forget(dir);
        MediaDb::open_at(path).expect("Failed to open test database")
    }
}

// =============================================================================
// Tests
// =============================================================================
