//! The tenant filter registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::entity::{Entity, EntityType};
use crate::config::TenancyConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::query::{FailClosedReason, Predicate, Query, Scope, ScopedQuery, SystemAccess};
use crate::tenant::TenantContext;

static COLUMN_NAME: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$"));

/// Builds the tenant predicate for an entity type from the live context.
///
/// A factory is called on every query with the context of that query. It
/// must not cache tenant ids between calls. Closures of the right shape
/// implement this trait.
pub trait PredicateFactory: Send + Sync {
    /// Returns the predicate restricting rows to those `ctx` may see.
    fn predicate(&self, ctx: &TenantContext) -> Predicate;
}

impl<F> PredicateFactory for F
where
    F: Fn(&TenantContext) -> Predicate + Send + Sync,
{
    fn predicate(&self, ctx: &TenantContext) -> Predicate {
        self(ctx)
    }
}

/// How an entity type is filtered.
#[derive(Clone)]
pub enum EntityFilter {
    /// Rows carry the tenant id in `column`; the predicate is `column = tenant`.
    TenantScoped {
        /// Tenant column name.
        column: String,
    },
    /// A custom predicate factory.
    Custom(Arc<dyn PredicateFactory>),
    /// Shared across tenants. Requires a stated reason.
    Unfiltered {
        /// Why the entity is shared.
        reason: String,
    },
}

impl EntityFilter {
    /// Short description used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            EntityFilter::TenantScoped { .. } => "tenant-scoped",
            EntityFilter::Custom(_) => "custom",
            EntityFilter::Unfiltered { .. } => "unfiltered",
        }
    }

    /// The tenant column, for tenant-scoped entities.
    pub fn tenant_column(&self) -> Option<&str> {
        match self {
            EntityFilter::TenantScoped { column } => Some(column),
            _ => None,
        }
    }
}

impl fmt::Debug for EntityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityFilter::TenantScoped { column } => f
                .debug_struct("TenantScoped")
                .field("column", column)
                .finish(),
            EntityFilter::Custom(_) => f.write_str("Custom(..)"),
            EntityFilter::Unfiltered { reason } => f
                .debug_struct("Unfiltered")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Collects filter registrations at startup.
///
/// Errors are collected as registrations are made and reported by
/// [`build`](Self::build), so a misconfigured registry never comes into
/// existence.
///
/// ```
/// use orbis_persistence::filter::{Entity, FilterRegistry};
///
/// struct Invoice;
/// impl Entity for Invoice {
///     const NAME: &'static str = "Invoice";
///     const TABLE: &'static str = "invoices";
/// }
///
/// struct Country;
/// impl Entity for Country {
///     const NAME: &'static str = "Country";
///     const TABLE: &'static str = "countries";
/// }
///
/// let registry = FilterRegistry::builder()
///     .tenant_scoped::<Invoice>()
///     .unfiltered::<Country>("ISO reference data shared by all tenants")
///     .build()
///     .unwrap();
/// assert_eq!(registry.len(), 2);
///
/// let duplicate = FilterRegistry::builder()
///     .tenant_scoped::<Invoice>()
///     .tenant_scoped::<Invoice>()
///     .build();
/// assert!(duplicate.is_err());
/// ```
#[derive(Debug)]
pub struct FilterRegistryBuilder {
    default_column: String,
    entries: HashMap<&'static str, (EntityType, EntityFilter)>,
    errors: Vec<RegistryError>,
}

impl Default for FilterRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterRegistryBuilder {
    /// Creates a builder whose default tenant column is `tenant_id`.
    pub fn new() -> Self {
        Self::with_config(&TenancyConfig::default())
    }

    /// Creates a builder using the configured tenant column.
    pub fn with_config(config: &TenancyConfig) -> Self {
        Self {
            default_column: config.tenant_column.clone(),
            entries: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Registers `E` as tenant-scoped on the default tenant column.
    pub fn tenant_scoped<E: Entity>(self) -> Self {
        let column = self.default_column.clone();
        self.tenant_scoped_on::<E>(column)
    }

    /// Registers `E` as tenant-scoped on `column`.
    pub fn tenant_scoped_on<E: Entity>(self, column: impl Into<String>) -> Self {
        self.register(
            EntityType::of::<E>(),
            EntityFilter::TenantScoped {
                column: column.into(),
            },
        )
    }

    /// Registers `E` with a custom predicate factory.
    pub fn custom<E: Entity>(self, factory: impl PredicateFactory + 'static) -> Self {
        self.register(EntityType::of::<E>(), EntityFilter::Custom(Arc::new(factory)))
    }

    /// Registers `E` as intentionally shared across tenants.
    pub fn unfiltered<E: Entity>(self, reason: impl Into<String>) -> Self {
        self.register(
            EntityType::of::<E>(),
            EntityFilter::Unfiltered {
                reason: reason.into(),
            },
        )
    }

    /// Registers a filter for an entity type.
    pub fn register(mut self, entity: EntityType, filter: EntityFilter) -> Self {
        if let Some((_, existing)) = self.entries.get(entity.name()) {
            self.errors.push(RegistryError::DuplicateRegistration {
                entity: entity.name().to_string(),
                existing: existing.kind().to_string(),
            });
            return self;
        }

        match &filter {
            EntityFilter::TenantScoped { column } if !is_valid_column(column) => {
                self.errors.push(RegistryError::InvalidColumn {
                    entity: entity.name().to_string(),
                    column: column.clone(),
                });
                return self;
            }
            EntityFilter::Unfiltered { reason } if reason.trim().is_empty() => {
                self.errors.push(RegistryError::MissingReason {
                    entity: entity.name().to_string(),
                });
                return self;
            }
            _ => {}
        }

        tracing::debug!(entity = %entity, filter = ?filter, "Registered entity filter");
        self.entries.insert(entity.name(), (entity, filter));
        self
    }

    /// Freezes the registrations.
    ///
    /// Returns the first configuration error encountered, if any.
    pub fn build(self) -> RegistryResult<FilterRegistry> {
        if let Some(err) = self.errors.into_iter().next() {
            tracing::error!(error = %err, "Filter registry configuration rejected");
            return Err(err);
        }

        let unfiltered = self
            .entries
            .values()
            .filter(|(_, f)| matches!(f, EntityFilter::Unfiltered { .. }))
            .count();
        tracing::info!(
            entities = self.entries.len(),
            unfiltered,
            "Filter registry built"
        );

        Ok(FilterRegistry {
            filters: self.entries,
        })
    }

    /// Freezes the registrations, additionally requiring that every entity
    /// type in `catalog` is registered.
    pub fn build_for(self, catalog: &[EntityType]) -> RegistryResult<FilterRegistry> {
        let registry = self.build()?;
        if let Some(missing) = catalog.iter().find(|e| !registry.is_registered(e)) {
            let err = RegistryError::MissingRegistration {
                entity: missing.name().to_string(),
            };
            tracing::error!(error = %err, "Filter registry configuration rejected");
            return Err(err);
        }
        Ok(registry)
    }
}

fn is_valid_column(column: &str) -> bool {
    match COLUMN_NAME.as_ref() {
        Ok(re) => re.is_match(column),
        Err(_) => false,
    }
}

/// Immutable mapping from entity type to [`EntityFilter`].
///
/// Built once at startup and shared behind an `Arc`. Every query is scoped
/// here: the filter's predicate is evaluated against the context of that
/// query and conjoined with the caller's predicate.
///
/// | Situation | Tenant predicate | Log |
/// |-----------|------------------|-----|
/// | tenant-scoped, tenant present | `column = tenant` | `debug` |
/// | custom, tenant present | factory result | `debug` |
/// | tenant-scoped or custom, no tenant | `FALSE` | `warn`, `fail_closed = true` |
/// | unfiltered | `TRUE` | `debug` |
/// | not registered | `FALSE` | `error`, `fail_closed = true` |
/// | [`SystemAccess`] | `TRUE` | `info`, `audit = true` |
#[derive(Debug)]
pub struct FilterRegistry {
    filters: HashMap<&'static str, (EntityType, EntityFilter)>,
}

impl FilterRegistry {
    /// Starts a registry builder.
    pub fn builder() -> FilterRegistryBuilder {
        FilterRegistryBuilder::new()
    }

    /// Returns the filter registered for `entity`.
    pub fn filter(&self, entity: &EntityType) -> Option<&EntityFilter> {
        self.filters.get(entity.name()).map(|(_, f)| f)
    }

    /// Returns true if `entity` has a registration.
    pub fn is_registered(&self, entity: &EntityType) -> bool {
        self.filters.contains_key(entity.name())
    }

    /// Registered entity types, sorted by name.
    pub fn entity_types(&self) -> Vec<EntityType> {
        let mut types: Vec<EntityType> = self.filters.values().map(|(e, _)| *e).collect();
        types.sort();
        types
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Computes the tenant predicate for `entity` under `ctx`.
    pub fn tenant_predicate(&self, entity: &EntityType, ctx: &TenantContext) -> (Scope, Predicate) {
        let Some(filter) = self.filter(entity) else {
            tracing::error!(
                entity = %entity,
                fail_closed = true,
                correlation_id = ?ctx.correlation_id(),
                "Query against unregistered entity type; returning no rows"
            );
            return (
                Scope::FailClosed(FailClosedReason::Unregistered),
                Predicate::False,
            );
        };

        if let EntityFilter::Unfiltered { reason } = filter {
            tracing::debug!(entity = %entity, reason = %reason, "Unfiltered entity query");
            return (Scope::Unfiltered, Predicate::True);
        }

        let Some(tenant) = ctx.tenant_id() else {
            tracing::warn!(
                entity = %entity,
                fail_closed = true,
                correlation_id = ?ctx.correlation_id(),
                user_id = ?ctx.user_id(),
                "No tenant in context; returning no rows"
            );
            return (Scope::FailClosed(FailClosedReason::NoTenant), Predicate::False);
        };

        let predicate = match filter {
            EntityFilter::TenantScoped { column } => Predicate::eq(column.as_str(), tenant),
            EntityFilter::Custom(factory) => factory.predicate(ctx),
            EntityFilter::Unfiltered { .. } => Predicate::True,
        };
        tracing::debug!(
            entity = %entity,
            tenant = %tenant,
            filter = filter.kind(),
            "Tenant-scoped query"
        );
        (Scope::Tenant(tenant.clone()), predicate)
    }

    /// Scopes a query to the tenant in `ctx`.
    pub fn scope<E: Entity>(&self, ctx: &TenantContext, query: Query<E>) -> ScopedQuery {
        let parts = query.into_parts();
        let (scope, tenant_predicate) = self.tenant_predicate(&parts.entity, ctx);
        ScopedQuery::new(parts, scope, tenant_predicate)
    }

    /// Scopes a query without a tenant restriction.
    ///
    /// Still requires `E` to be registered; an unregistered entity fails
    /// closed even with system access.
    pub fn scope_system<E: Entity>(&self, access: &SystemAccess, query: Query<E>) -> ScopedQuery {
        let parts = query.into_parts();
        if !self.is_registered(&parts.entity) {
            let (scope, predicate) =
                self.tenant_predicate(&parts.entity, &TenantContext::anonymous());
            return ScopedQuery::new(parts, scope, predicate);
        }
        tracing::info!(
            entity = %parts.entity,
            reason = %access.reason(),
            audit = true,
            "Tenant filter bypassed with system access"
        );
        ScopedQuery::new(parts, Scope::System, Predicate::True)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Row;
    use crate::tenant::TenantId;

    struct Invoice;
    impl Entity for Invoice {
        const NAME: &'static str = "Invoice";
        const TABLE: &'static str = "invoices";
    }

    struct Country;
    impl Entity for Country {
        const NAME: &'static str = "Country";
        const TABLE: &'static str = "countries";
    }

    struct Document;
    impl Entity for Document {
        const NAME: &'static str = "Document";
        const TABLE: &'static str = "documents";
    }

    fn registry() -> FilterRegistry {
        FilterRegistry::builder()
            .tenant_scoped::<Invoice>()
            .unfiltered::<Country>("reference data")
            .build()
            .unwrap()
    }

    #[test]
    fn test_tenant_scoped_predicate() {
        let ctx = TenantContext::new(TenantId::new("a"));
        let q = registry().scope(&ctx, Query::<Invoice>::all());
        assert_eq!(q.scope(), &Scope::Tenant(TenantId::new("a")));
        assert_eq!(q.tenant_predicate(), &Predicate::eq("tenant_id", "a"));
    }

    #[test]
    fn test_no_tenant_fails_closed() {
        let q = registry().scope(&TenantContext::anonymous(), Query::<Invoice>::all());
        assert!(q.is_fail_closed());
        assert_eq!(q.tenant_predicate(), &Predicate::False);
        assert!(!q.matches(&Row::new().with("tenant_id", "a")));
    }

    #[test]
    fn test_unregistered_fails_closed() {
        let ctx = TenantContext::new(TenantId::new("a"));
        let q = registry().scope(&ctx, Query::<Document>::all());
        assert_eq!(q.scope(), &Scope::FailClosed(FailClosedReason::Unregistered));
        assert_eq!(q.tenant_predicate(), &Predicate::False);
    }

    #[test]
    fn test_unfiltered_with_and_without_tenant() {
        let r = registry();
        let anon = r.scope(&TenantContext::anonymous(), Query::<Country>::all());
        assert_eq!(anon.scope(), &Scope::Unfiltered);
        assert_eq!(anon.tenant_predicate(), &Predicate::True);
    }

    #[test]
    fn test_custom_factory_sees_live_context() {
        let r = FilterRegistry::builder()
            .custom::<Document>(|ctx: &TenantContext| match ctx.tenant_id() {
                Some(t) => Predicate::eq("owner_org", t).or(Predicate::eq("visibility", "public")),
                None => Predicate::False,
            })
            .build()
            .unwrap();

        for tenant in ["a", "b", "c"] {
            let ctx = TenantContext::new(TenantId::new(tenant));
            let q = r.scope(&ctx, Query::<Document>::all());
            assert!(q.matches(&Row::new().with("owner_org", tenant)));
            assert!(!q.matches(&Row::new().with("owner_org", "zzz")));
        }
    }

    #[test]
    fn test_custom_factory_not_called_without_tenant() {
        let r = FilterRegistry::builder()
            .custom::<Document>(|_: &TenantContext| Predicate::True)
            .build()
            .unwrap();
        let q = r.scope(&TenantContext::anonymous(), Query::<Document>::all());
        assert!(q.is_fail_closed());
    }

    #[test]
    fn test_duplicate_registration() {
        let err = FilterRegistry::builder()
            .tenant_scoped::<Invoice>()
            .unfiltered::<Invoice>("oops")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateRegistration {
                entity: "Invoice".to_string(),
                existing: "tenant-scoped".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_column_and_missing_reason() {
        let err = FilterRegistry::builder()
            .tenant_scoped_on::<Invoice>("tenant id; drop")
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidColumn { .. }));

        let err = FilterRegistry::builder()
            .unfiltered::<Country>(" ")
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingReason { .. }));
    }

    #[test]
    fn test_build_for_catalog() {
        let catalog = [EntityType::of::<Invoice>(), EntityType::of::<Document>()];
        let err = FilterRegistry::builder()
            .tenant_scoped::<Invoice>()
            .build_for(&catalog)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::MissingRegistration {
                entity: "Document".to_string()
            }
        );
    }

    #[test]
    fn test_configured_default_column() {
        let config = TenancyConfig::new().with_tenant_column("org_id");
        let r = FilterRegistryBuilder::with_config(&config)
            .tenant_scoped::<Invoice>()
            .build()
            .unwrap();
        let filter = r.filter(&EntityType::of::<Invoice>()).unwrap();
        assert_eq!(filter.tenant_column(), Some("org_id"));
    }

    #[test]
    fn test_system_scope() {
        let access = SystemAccess::grant("support investigation").unwrap();
        let q = registry().scope_system(&access, Query::<Invoice>::all());
        assert_eq!(q.scope(), &Scope::System);
        assert!(q.matches(&Row::new().with("tenant_id", "anyone")));

        let q = registry().scope_system(&access, Query::<Document>::all());
        assert!(q.is_fail_closed());
    }
}
