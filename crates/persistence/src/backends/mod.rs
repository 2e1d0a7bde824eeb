//! Storage engine implementations.
//!
//! | Engine | Feature | Description |
//! |--------|---------|-------------|
//! | [`memory::InMemoryEngine`] | always | Rows in process memory, for tests and embedding |
//! | [`sqlite::SqliteEngine`] | `sqlite` (default) | Embedded SQLite, in-memory or file |
//!
//! Both implement [`QueryEngine`](crate::core::QueryEngine) and
//! [`MigrationEngine`](crate::core::MigrationEngine).

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;
