//! The tenant-scoped query executor.

use std::sync::Arc;

use super::builder::Query;
use super::scoped::{ScopedInsert, SystemAccess};
use super::value::{Row, Value};
use crate::core::QueryEngine;
use crate::error::{RegistryError, StorageResult, TenantError};
use crate::filter::{Entity, EntityFilter, EntityType, FilterRegistry};
use crate::tenant::{TenantContext, ambient};

/// Runs queries through the filter registry before they reach the engine.
///
/// Business code holds one of these instead of the engine. Every read,
/// update and delete is scoped with the tenant predicate for the entity
/// type, evaluated against the context passed in. Inserts are stamped with
/// the context's tenant.
///
/// ```
/// # block_on(async {
/// use std::sync::Arc;
/// use orbis_persistence::backends::memory::InMemoryEngine;
/// use orbis_persistence::filter::{Entity, FilterRegistry};
/// use orbis_persistence::query::{Query, Row, TenantScopedExecutor};
/// use orbis_persistence::tenant::{TenantContext, TenantId};
///
/// struct Invoice;
/// impl Entity for Invoice {
///     const NAME: &'static str = "Invoice";
///     const TABLE: &'static str = "invoices";
/// }
///
/// let registry = Arc::new(FilterRegistry::builder().tenant_scoped::<Invoice>().build().unwrap());
/// let engine = Arc::new(InMemoryEngine::new());
/// engine.create_table("invoices");
/// let executor = TenantScopedExecutor::new(registry, engine);
///
/// let acme = TenantContext::new(TenantId::new("acme"));
/// executor.insert::<Invoice>(&acme, Row::new().with("id", 1)).await.unwrap();
///
/// let globex = TenantContext::new(TenantId::new("globex"));
/// assert_eq!(executor.count(&acme, Query::<Invoice>::all()).await.unwrap(), 1);
/// assert_eq!(executor.count(&globex, Query::<Invoice>::all()).await.unwrap(), 0);
/// # });
/// # fn block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct TenantScopedExecutor<Q: ?Sized> {
    registry: Arc<FilterRegistry>,
    engine: Arc<Q>,
}

impl<Q: ?Sized> Clone for TenantScopedExecutor<Q> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<Q: QueryEngine + ?Sized> TenantScopedExecutor<Q> {
    /// Creates an executor.
    pub fn new(registry: Arc<FilterRegistry>, engine: Arc<Q>) -> Self {
        Self { registry, engine }
    }

    /// The filter registry.
    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.registry
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Arc<Q> {
        &self.engine
    }

    /// Returns the rows of `E` visible to `ctx` that match `query`.
    pub async fn find<E: Entity>(
        &self,
        ctx: &TenantContext,
        query: Query<E>,
    ) -> StorageResult<Vec<Row>> {
        let scoped = self.registry.scope(ctx, query);
        self.engine.select(&scoped).await
    }

    /// Counts the rows of `E` visible to `ctx` that match `query`.
    pub async fn count<E: Entity>(&self, ctx: &TenantContext, query: Query<E>) -> StorageResult<u64> {
        let scoped = self.registry.scope(ctx, query);
        self.engine.count(&scoped).await
    }

    /// [`find`](Self::find) using the ambient task-local context.
    pub async fn find_ambient<E: Entity>(&self, query: Query<E>) -> StorageResult<Vec<Row>> {
        let ctx = ambient::current();
        self.find(&ctx, query).await
    }

    /// [`count`](Self::count) using the ambient task-local context.
    pub async fn count_ambient<E: Entity>(&self, query: Query<E>) -> StorageResult<u64> {
        let ctx = ambient::current();
        self.count(&ctx, query).await
    }

    /// Returns matching rows of `E` across all tenants.
    pub async fn find_system<E: Entity>(
        &self,
        access: &SystemAccess,
        query: Query<E>,
    ) -> StorageResult<Vec<Row>> {
        let scoped = self.registry.scope_system(access, query);
        self.engine.select(&scoped).await
    }

    /// Counts matching rows of `E` across all tenants.
    pub async fn count_system<E: Entity>(
        &self,
        access: &SystemAccess,
        query: Query<E>,
    ) -> StorageResult<u64> {
        let scoped = self.registry.scope_system(access, query);
        self.engine.count(&scoped).await
    }

    /// Inserts a row of `E` owned by the tenant in `ctx`.
    ///
    /// For tenant-scoped entities the tenant column is set from the context.
    /// A row that already names a different tenant is rejected. Rows of
    /// custom-filtered entities must satisfy the filter under `ctx`.
    /// Unfiltered entities are inserted unchanged. Returns the row as stored.
    pub async fn insert<E: Entity>(&self, ctx: &TenantContext, row: Row) -> StorageResult<Row> {
        let entity = EntityType::of::<E>();
        let row = self.prepare_insert(&entity, ctx, row)?;
        let insert = ScopedInsert::new(entity, row);
        self.engine.insert(&insert).await?;
        tracing::debug!(entity = %entity, tenant = ?ctx.tenant_id(), "Inserted row");
        Ok(insert.row().clone())
    }

    /// Updates the rows of `E` visible to `ctx` that match `query`.
    ///
    /// Assignments may not touch the columns that decide tenant ownership:
    /// the tenant column of a tenant-scoped entity, or any column the custom
    /// filter's predicate reads under `ctx`. Column names are compared
    /// ignoring ASCII case.
    pub async fn update<E: Entity>(
        &self,
        ctx: &TenantContext,
        query: Query<E>,
        assignments: Row,
    ) -> StorageResult<u64> {
        let entity = EntityType::of::<E>();
        if let Some(filter) = self.registry.filter(&entity) {
            let guarded = guarded_columns(filter, ctx);
            if let Some((column, _)) = assignments
                .iter()
                .find(|(name, _)| guarded.iter().any(|g| g.eq_ignore_ascii_case(name)))
            {
                tracing::warn!(
                    entity = %entity,
                    column,
                    filter = filter.kind(),
                    "Rejected update of tenant ownership column"
                );
                return Err(TenantError::TenantColumnImmutable {
                    entity: entity.name().to_string(),
                    column: column.to_string(),
                }
                .into());
            }
        }
        let scoped = self.registry.scope(ctx, query);
        self.engine.update(&scoped, &assignments).await
    }

    /// Deletes the rows of `E` visible to `ctx` that match `query`.
    pub async fn delete<E: Entity>(&self, ctx: &TenantContext, query: Query<E>) -> StorageResult<u64> {
        let scoped = self.registry.scope(ctx, query);
        self.engine.delete(&scoped).await
    }

    fn prepare_insert(
        &self,
        entity: &EntityType,
        ctx: &TenantContext,
        mut row: Row,
    ) -> StorageResult<Row> {
        let Some(filter) = self.registry.filter(entity) else {
            tracing::error!(entity = %entity, "Insert into unregistered entity type");
            return Err(RegistryError::MissingRegistration {
                entity: entity.name().to_string(),
            }
            .into());
        };

        if let EntityFilter::Unfiltered { .. } = filter {
            return Ok(row);
        }

        let Some(tenant) = ctx.tenant_id() else {
            tracing::warn!(entity = %entity, "Insert without tenant in context");
            return Err(TenantError::MissingTenant {
                entity: entity.name().to_string(),
            }
            .into());
        };

        match filter {
            EntityFilter::TenantScoped { column } => {
                for key in row.matching_columns(column) {
                    match row.remove(&key) {
                        None | Some(Value::Null) => {}
                        Some(Value::Text(existing)) if existing == tenant.as_str() => {}
                        Some(other) => {
                            tracing::warn!(
                                entity = %entity,
                                tenant = %tenant,
                                row_tenant = %other,
                                "Rejected insert for another tenant"
                            );
                            return Err(TenantError::TenantMismatch {
                                entity: entity.name().to_string(),
                                context_tenant: tenant.clone(),
                                row_tenant: other.to_string(),
                            }
                            .into());
                        }
                    }
                }
                row.set(column.as_str(), tenant);
            }
            EntityFilter::Custom(factory) => {
                let predicate = factory.predicate(ctx);
                let canonical = predicate
                    .columns()
                    .into_iter()
                    .all(|column| canonicalize_column(&mut row, column));
                if !canonical || !predicate.matches(&row) {
                    tracing::warn!(entity = %entity, tenant = %tenant, "Rejected insert outside tenant scope");
                    return Err(TenantError::RowOutsideScope {
                        entity: entity.name().to_string(),
                        context_tenant: tenant.clone(),
                    }
                    .into());
                }
            }
            EntityFilter::Unfiltered { .. } => {}
        }
        Ok(row)
    }
}

/// Columns an update must not assign for `filter` under `ctx`.
fn guarded_columns(filter: &EntityFilter, ctx: &TenantContext) -> Vec<String> {
    match filter {
        EntityFilter::TenantScoped { column } => vec![column.clone()],
        EntityFilter::Custom(factory) => factory
            .predicate(ctx)
            .columns()
            .into_iter()
            .map(String::from)
            .collect(),
        EntityFilter::Unfiltered { .. } => Vec::new(),
    }
}

/// Renames a case variant of `column` in `row` to `column` itself, so the
/// filter predicate sees the value the engine will store. Returns false when
/// the row carries more than one spelling of the column.
fn canonicalize_column(row: &mut Row, column: &str) -> bool {
    let keys = row.matching_columns(column);
    match keys.as_slice() {
        [] => true,
        [only] if only == column => true,
        [only] => {
            if let Some(value) = row.remove(only) {
                row.set(column, value);
            }
            true
        }
        _ => false,
    }
}
