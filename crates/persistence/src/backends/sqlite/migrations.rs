//! Migration bookkeeping for SQLite.
//!
//! Applied migration ids are recorded in `_orbis_migrations`. Each
//! migration runs in its own transaction together with its bookkeeping row,
//! so a failed migration leaves no partial schema behind.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use super::engine::query_failed;
use crate::error::StorageResult;
use crate::schema::{Dialect, Migration, SqliteDdl, TranslatingCompiler};

const MIGRATIONS_TABLE: &str = "_orbis_migrations";

fn ensure_table(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        MIGRATIONS_TABLE
    ))
    .map_err(|e| query_failed("Failed to create migrations table", e))
}

/// Applies `migration`, authored in `source`, unless it was applied before.
pub(crate) fn apply(conn: &mut Connection, migration: &Migration, source: Dialect) -> StorageResult<()> {
    ensure_table(conn)?;

    let compiler = TranslatingCompiler::new(source, SqliteDdl)?;
    let statements = migration.compile(&compiler)?;

    let tx = conn
        .transaction()
        .map_err(|e| query_failed("Failed to begin migration transaction", e))?;

    let already: Option<String> = tx
        .query_row(
            &format!("SELECT id FROM {} WHERE id = ?1", MIGRATIONS_TABLE),
            rusqlite::params![migration.id],
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| query_failed("Failed to read migrations table", e))?;
    if already.is_some() {
        tracing::debug!(migration = %migration.id, "Migration already applied");
        return Ok(());
    }

    for statement in &statements {
        tracing::debug!(migration = %migration.id, sql = %statement, "Applying DDL");
        tx.execute_batch(statement)
            .map_err(|e| query_failed(&format!("Migration {} failed", migration.id), e))?;
    }

    tx.execute(
        &format!("INSERT INTO {} (id, applied_at) VALUES (?1, ?2)", MIGRATIONS_TABLE),
        rusqlite::params![migration.id, Utc::now().to_rfc3339()],
    )
    .map_err(|e| query_failed("Failed to record migration", e))?;

    tx.commit()
        .map_err(|e| query_failed("Failed to commit migration", e))?;

    tracing::info!(
        migration = %migration.id,
        statements = statements.len(),
        source = %source,
        "Applied migration"
    );
    Ok(())
}

/// Returns applied migration ids in application order.
pub(crate) fn applied(conn: &Connection) -> StorageResult<Vec<String>> {
    ensure_table(conn)?;
    let mut stmt = conn
        .prepare(&format!(
            "SELECT id FROM {} ORDER BY applied_at, rowid",
            MIGRATIONS_TABLE
        ))
        .map_err(|e| query_failed("Failed to read migrations table", e))?;
    let ids = stmt
        .query_map([], |r| r.get::<_, String>(0))
        .map_err(|e| query_failed("Failed to read migrations table", e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| query_failed("Failed to read migrations table", e))?;
    Ok(ids)
}
