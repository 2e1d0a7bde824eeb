//! SQLite engine.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};

use super::migrations;
use super::values::read_row;
use crate::core::{MigrationEngine, QueryEngine};
use crate::error::{BackendError, StorageError, StorageResult};
use crate::query::{Row, ScopedInsert, ScopedQuery, Value};
use crate::schema::{Dialect, Migration};

pub(crate) const ENGINE_NAME: &str = "sqlite";

/// SQLite engine backed by an r2d2 connection pool.
pub struct SqliteEngine {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteEngineConfig,
    is_memory: bool,
}

impl Debug for SqliteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEngine")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .field("connections", &self.pool.state().connections)
            .finish_non_exhaustive()
    }
}

/// Configuration for the SQLite engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteEngineConfig {
    /// Maximum number of connections in the pool. In-memory databases always use one.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for file databases.
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// Enable foreign key constraints.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,
}

fn default_max_connections() -> u32 {
    8
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteEngineConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

impl SqliteEngine {
    /// Creates an engine over a private in-memory database.
    pub fn in_memory() -> StorageResult<Self> {
        Self::with_config(":memory:", SqliteEngineConfig::default())
    }

    /// Opens or creates a file database.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        Self::with_config(path, SqliteEngineConfig::default())
    }

    /// Creates an engine with custom configuration.
    pub fn with_config<P: AsRef<Path>>(path: P, config: SqliteEngineConfig) -> StorageResult<Self> {
        let is_memory = path.as_ref().to_string_lossy() == ":memory:";

        let busy_timeout = Duration::from_millis(u64::from(config.busy_timeout_ms));
        let foreign_keys = config.enable_foreign_keys;
        let wal = config.enable_wal && !is_memory;
        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        }
        .with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if foreign_keys {
                conn.pragma_update(None, "foreign_keys", true)?;
            }
            if wal {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
            }
            Ok(())
        });

        // Every connection to :memory: opens a separate database, so the
        // pool is pinned to one long-lived connection.
        let mut builder = Pool::builder()
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms));
        builder = if is_memory {
            builder
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            builder
                .max_size(config.max_connections)
                .min_idle(Some(config.min_connections.min(config.max_connections)))
        };

        let pool = builder.build(manager).map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: ENGINE_NAME.to_string(),
                message: e.to_string(),
            })
        })?;

        tracing::info!(
            path = %path.as_ref().display(),
            is_memory,
            max_connections = pool.max_size(),
            "Opened SQLite engine"
        );

        Ok(Self {
            pool,
            config,
            is_memory,
        })
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &SqliteEngineConfig {
        &self.config
    }

    /// Returns whether `table` exists.
    pub fn table_exists(&self, table: &str) -> StorageResult<bool> {
        let conn = self.get_connection()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                rusqlite::params![table],
                |r| r.get(0),
            )
            .map_err(|e| query_failed("Failed to inspect sqlite_master", e))?;
        Ok(count > 0)
    }

    /// Get a connection from the pool.
    pub(crate) fn get_connection(&self) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: ENGINE_NAME.to_string(),
                message: e.to_string(),
            })
        })
    }

    fn execute(&self, sql: &str, params: &[Value]) -> StorageResult<u64> {
        tracing::trace!(sql, params = params.len(), "Executing statement");
        let conn = self.get_connection()?;
        let changed = conn
            .execute(sql, rusqlite::params_from_iter(params.iter()))
            .map_err(|e| query_failed("Statement failed", e))?;
        Ok(changed as u64)
    }
}

pub(crate) fn query_failed(message: &str, e: rusqlite::Error) -> StorageError {
    StorageError::Backend(BackendError::QueryFailed {
        backend_name: ENGINE_NAME.to_string(),
        message: format!("{}: {}", message, e),
        source: Some(Box::new(e)),
    })
}

#[async_trait]
impl QueryEngine for SqliteEngine {
    fn engine_name(&self) -> &'static str {
        ENGINE_NAME
    }

    async fn select(&self, query: &ScopedQuery) -> StorageResult<Vec<Row>> {
        let (sql, params) = query.select_sql(Dialect::Sqlite);
        tracing::trace!(sql = %sql, params = params.len(), "Executing select");

        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| query_failed("Failed to prepare select", e))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |r| {
                read_row(r, &columns)
            })
            .map_err(|e| query_failed("Select failed", e))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| query_failed("Failed to read row", e))?);
        }
        Ok(out)
    }

    async fn count(&self, query: &ScopedQuery) -> StorageResult<u64> {
        let (sql, params) = query.count_sql(Dialect::Sqlite);
        let conn = self.get_connection()?;
        let count: i64 = conn
            .query_row(&sql, rusqlite::params_from_iter(params.iter()), |r| r.get(0))
            .map_err(|e| query_failed("Count failed", e))?;
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, insert: &ScopedInsert) -> StorageResult<()> {
        let (sql, params) = insert.insert_sql(Dialect::Sqlite)?;
        self.execute(&sql, &params)?;
        Ok(())
    }

    async fn update(&self, query: &ScopedQuery, assignments: &Row) -> StorageResult<u64> {
        let (sql, params) = query.update_sql(Dialect::Sqlite, assignments)?;
        self.execute(&sql, &params)
    }

    async fn delete(&self, query: &ScopedQuery) -> StorageResult<u64> {
        let (sql, params) = query.delete_sql(Dialect::Sqlite);
        self.execute(&sql, &params)
    }
}

#[async_trait]
impl MigrationEngine for SqliteEngine {
    async fn apply_migration(&self, migration: &Migration, source: Dialect) -> StorageResult<()> {
        let mut conn = self.get_connection()?;
        migrations::apply(&mut conn, migration, source)
    }

    async fn applied_migrations(&self) -> StorageResult<Vec<String>> {
        let conn = self.get_connection()?;
        migrations::applied(&conn)
    }
}
