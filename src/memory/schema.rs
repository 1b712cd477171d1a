// src/memory/schema.rs — Run-history schema revisions

use rusqlite::{params, Connection};

/// One schema revision. Applied in version order, forward only; the
/// history database is disposable, so there is no rollback path.
struct Revision {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const REVISIONS: &[Revision] = &[Revision {
    version: 1,
    name: "initial_schema",
    sql: include_str!("migrations/001_initial_schema.sql"),
}];

/// Bring the database up to the latest schema version. Called on every
/// open; revisions already recorded in `_migrations` are skipped, so
/// repeated calls are no-ops.
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let applied: u32 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |r| {
            r.get(0)
        })?;

    for rev in REVISIONS.iter().filter(|r| r.version > applied) {
        tracing::info!("applying schema revision {} ({})", rev.version, rev.name);
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(rev.sql)?;
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            params![rev.version, rev.name],
        )?;
        tx.commit()?;
    }

    Ok(())
}
