//! In-memory storage engine.
//!
//! Rows are kept per table in insertion order behind a single
//! `parking_lot::RwLock`. Predicates are evaluated with
//! [`Predicate::matches`](crate::query::Predicate::matches), so results agree
//! with the SQL engines on NULL handling. Intended for tests and for
//! embedding the isolation layer without a database.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::{MigrationEngine, QueryEngine};
use crate::error::{BackendError, StorageResult};
use crate::query::{OrderBy, Row, ScopedInsert, ScopedQuery, SortOrder, Value};
use crate::schema::{Dialect, Migration, SchemaOperation};

const ENGINE_NAME: &str = "memory";

/// A table-per-`Vec` engine held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    applied: RwLock<Vec<String>>,
}

impl InMemoryEngine {
    /// Creates an engine with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `table` if it does not exist.
    pub fn create_table(&self, table: &str) {
        self.tables.write().entry(table.to_string()).or_default();
    }

    /// Drops `table` and its rows. Returns whether it existed.
    pub fn drop_table(&self, table: &str) -> bool {
        self.tables.write().remove(table).is_some()
    }

    /// Returns whether `table` exists.
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.read().contains_key(table)
    }

    /// Total rows in `table` regardless of tenant, for diagnostics.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, Vec::len)
    }

    fn unknown_table(table: &str) -> BackendError {
        BackendError::UnknownTable {
            backend_name: ENGINE_NAME.to_string(),
            table: table.to_string(),
        }
    }
}

fn compare_rows(a: &Row, b: &Row, order_by: &[OrderBy]) -> Ordering {
    for term in order_by {
        let left = a.get(&term.column).unwrap_or(&Value::Null);
        let right = b.get(&term.column).unwrap_or(&Value::Null);
        // NULLs sort first, as in SQLite
        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => left.sql_cmp(right).unwrap_or(Ordering::Equal),
        };
        let ordering = match term.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl QueryEngine for InMemoryEngine {
    fn engine_name(&self) -> &'static str {
        ENGINE_NAME
    }

    async fn select(&self, query: &ScopedQuery) -> StorageResult<Vec<Row>> {
        let tables = self.tables.read();
        let rows = tables
            .get(query.table())
            .ok_or_else(|| Self::unknown_table(query.table()))?;

        let mut matched: Vec<Row> = rows.iter().filter(|r| query.matches(r)).cloned().collect();
        drop(tables);

        if !query.order_by().is_empty() {
            matched.sort_by(|a, b| compare_rows(a, b, query.order_by()));
        }
        let offset = query.offset().unwrap_or(0);
        let limit = query.limit().unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, query: &ScopedQuery) -> StorageResult<u64> {
        let tables = self.tables.read();
        let rows = tables
            .get(query.table())
            .ok_or_else(|| Self::unknown_table(query.table()))?;
        Ok(rows.iter().filter(|r| query.matches(r)).count() as u64)
    }

    async fn insert(&self, insert: &ScopedInsert) -> StorageResult<()> {
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(insert.table())
            .ok_or_else(|| Self::unknown_table(insert.table()))?;
        rows.push(insert.row().clone());
        Ok(())
    }

    async fn update(&self, query: &ScopedQuery, assignments: &Row) -> StorageResult<u64> {
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(query.table())
            .ok_or_else(|| Self::unknown_table(query.table()))?;

        let mut updated = 0;
        for row in rows.iter_mut().filter(|r| query.matches(r)) {
            for (column, value) in assignments.iter() {
                row.set(column, value.clone());
            }
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete(&self, query: &ScopedQuery) -> StorageResult<u64> {
        let mut tables = self.tables.write();
        let rows = tables
            .get_mut(query.table())
            .ok_or_else(|| Self::unknown_table(query.table()))?;

        let before = rows.len();
        rows.retain(|r| !query.matches(r));
        Ok((before - rows.len()) as u64)
    }
}

#[async_trait]
impl MigrationEngine for InMemoryEngine {
    /// Creates and drops tables. Column-level operations are accepted and
    /// ignored, since rows here are schemaless.
    async fn apply_migration(&self, migration: &Migration, _source: Dialect) -> StorageResult<()> {
        // One guard spans the check and the record
        let mut applied = self.applied.write();
        if applied.contains(&migration.id) {
            tracing::debug!(migration = %migration.id, "Migration already applied");
            return Ok(());
        }

        for op in &migration.operations {
            match op {
                SchemaOperation::CreateTable(create) => self.create_table(&create.name),
                SchemaOperation::DropTable { name } => {
                    self.drop_table(name);
                }
                _ => {}
            }
        }
        applied.push(migration.id.clone());
        drop(applied);
        tracing::info!(migration = %migration.id, engine = ENGINE_NAME, "Applied migration");
        Ok(())
    }

    async fn applied_migrations(&self) -> StorageResult<Vec<String>> {
        Ok(self.applied.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::filter::{Entity, FilterRegistry};
    use crate::query::{Predicate, Query};
    use crate::schema::{ColumnDef, CreateTable};
    use crate::tenant::{TenantContext, TenantId};

    struct Note;
    impl Entity for Note {
        const NAME: &'static str = "Note";
        const TABLE: &'static str = "notes";
    }

    fn registry() -> Arc<FilterRegistry> {
        Arc::new(FilterRegistry::builder().tenant_scoped::<Note>().build().unwrap())
    }

    fn seed(engine: &InMemoryEngine) {
        engine.create_table("notes");
        let mut tables = engine.tables.write();
        let rows = tables.get_mut("notes").unwrap();
        for (id, tenant, rank) in [(1, "a", 3), (2, "a", 1), (3, "b", 2), (4, "a", 2)] {
            rows.push(
                Row::new()
                    .with("id", id)
                    .with("tenant_id", tenant)
                    .with("rank", rank),
            );
        }
    }

    #[tokio::test]
    async fn test_select_orders_and_pages() {
        let engine = InMemoryEngine::new();
        seed(&engine);
        let ctx = TenantContext::new(TenantId::new("a"));
        let q = registry().scope(&ctx, Query::<Note>::all().order_by("rank").offset(1).limit(1));

        let rows = engine.select(&q).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&Value::Int(4)));
    }

    #[tokio::test]
    async fn test_update_and_delete_respect_scope() {
        let engine = InMemoryEngine::new();
        seed(&engine);
        let ctx = TenantContext::new(TenantId::new("b"));
        let r = registry();

        let updated = engine
            .update(&r.scope(&ctx, Query::<Note>::all()), &Row::new().with("rank", 9))
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let deleted = engine
            .delete(&r.scope(&ctx, Query::<Note>::filter(Predicate::eq("id", 1))))
            .await
            .unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(engine.row_count("notes"), 4);
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let engine = InMemoryEngine::new();
        let ctx = TenantContext::new(TenantId::new("a"));
        let result = engine.select(&registry().scope(&ctx, Query::<Note>::all())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_apply_migration_is_idempotent() {
        let engine = InMemoryEngine::new();
        let migration = Migration::new("0001")
            .with_operation(CreateTable::new("notes").column(ColumnDef::new("id", "int")));

        engine.apply_migration(&migration, Dialect::SqlServer).await.unwrap();
        engine.apply_migration(&migration, Dialect::SqlServer).await.unwrap();

        assert!(engine.has_table("notes"));
        assert_eq!(engine.applied_migrations().await.unwrap(), vec!["0001"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_apply_records_once() {
        let engine = Arc::new(InMemoryEngine::new());
        let migration = Arc::new(
            Migration::new("0001")
                .with_operation(CreateTable::new("notes").column(ColumnDef::new("id", "int"))),
        );

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let migration = Arc::clone(&migration);
                tokio::spawn(async move {
                    engine
                        .apply_migration(&migration, Dialect::SqlServer)
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(engine.applied_migrations().await.unwrap(), vec!["0001"]);
    }
}
