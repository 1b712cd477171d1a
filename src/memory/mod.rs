// src/memory/mod.rs — Run history persistence

pub mod schema;
pub mod store;

use rusqlite::Connection;
use std::path::Path;

/// Owns the SQLite connection behind the run-history store. WAL mode
/// keeps CLI reads from blocking an API server writing the same file.
pub struct RunHistory {
    pub store: store::Store,
}

impl RunHistory {
    /// Open (or create) the history database at `path`.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::from_conn(conn)
    }

    /// Fully in-memory history, for tests and ephemeral servers.
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::from_conn(conn)
    }

    fn from_conn(conn: Connection) -> anyhow::Result<Self> {
        schema::run_migrations(&conn)?;
        Ok(Self {
            store: store::Store::new(conn),
        })
    }
}
