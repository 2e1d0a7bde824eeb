//! Storage engine traits.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::query::{Row, ScopedInsert, ScopedQuery};
use crate::schema::{Dialect, Migration};

/// Executes tenant-scoped queries against a store.
///
/// Engines accept only [`ScopedQuery`] and [`ScopedInsert`], which cannot be
/// built outside this crate's scoping path. An engine must apply the query's
/// full predicate; it never adds or removes tenant conditions itself.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Returns a short name for this engine, used in logs and errors.
    fn engine_name(&self) -> &'static str;

    /// Returns the rows matching the query, ordered and paged as requested.
    async fn select(&self, query: &ScopedQuery) -> StorageResult<Vec<Row>>;

    /// Counts the rows matching the query.
    async fn count(&self, query: &ScopedQuery) -> StorageResult<u64>;

    /// Inserts one row.
    async fn insert(&self, insert: &ScopedInsert) -> StorageResult<()>;

    /// Applies `assignments` to every matching row and returns how many changed.
    async fn update(&self, query: &ScopedQuery, assignments: &Row) -> StorageResult<u64>;

    /// Deletes every matching row and returns how many were removed.
    async fn delete(&self, query: &ScopedQuery) -> StorageResult<u64>;
}

/// An engine that can apply schema migrations.
#[async_trait]
pub trait MigrationEngine: Send + Sync {
    /// Applies a migration authored in `source` dialect.
    ///
    /// Applying a migration whose id was already applied is a no-op.
    async fn apply_migration(&self, migration: &Migration, source: Dialect) -> StorageResult<()>;

    /// Returns the ids of applied migrations, in application order.
    async fn applied_migrations(&self) -> StorageResult<Vec<String>>;
}
