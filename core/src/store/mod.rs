//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The engine calls store methods; it never executes SQL directly.
//! The rating_run table is append-only; the schema rejects UPDATE and
//! DELETE on it.

use crate::error::{RatingError, RatingResult};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

mod rating_run;
mod scenario;

pub struct RatingStore {
    conn: Mutex<Connection>,
}

impl RatingStore {
    pub fn open(path: &str) -> RatingResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RatingResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store with the schema applied.
    pub fn in_memory_migrated() -> RatingResult<Self> {
        let store = Self::in_memory()?;
        store.migrate()?;
        Ok(store)
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RatingResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(include_str!("../../../migrations/001_rating_run.sql"))?;
        conn.execute_batch(include_str!("../../../migrations/002_scenario.sql"))?;
        Ok(())
    }

    fn conn(&self) -> RatingResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RatingError::StorePoisoned)
    }
}
