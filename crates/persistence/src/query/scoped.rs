//! Tenant-scoped queries: the only query shape storage engines accept.

use std::fmt;

use super::builder::{OrderBy, QueryParts, SortOrder};
use super::predicate::Predicate;
use super::value::{Row, Value};
use crate::error::ValidationError;
use crate::filter::EntityType;
use crate::schema::Dialect;
use crate::tenant::TenantId;

/// Why a query was scoped to match nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailClosedReason {
    /// The tenant context carries no tenant id.
    NoTenant,
    /// The entity type has no filter registration.
    Unregistered,
}

impl fmt::Display for FailClosedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailClosedReason::NoTenant => f.write_str("no tenant in context"),
            FailClosedReason::Unregistered => f.write_str("entity type not registered"),
        }
    }
}

/// How the tenant predicate of a [`ScopedQuery`] was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Restricted to one tenant's rows.
    Tenant(TenantId),
    /// The entity is registered as intentionally unfiltered.
    Unfiltered,
    /// Matches no rows.
    FailClosed(FailClosedReason),
    /// Tenant filtering bypassed through [`SystemAccess`].
    System,
}

/// A query whose predicate already includes the tenant restriction.
///
/// There is no public constructor. Instances come from
/// [`FilterRegistry::scope`](crate::filter::FilterRegistry::scope) and
/// [`FilterRegistry::scope_system`](crate::filter::FilterRegistry::scope_system),
/// so every query that reaches a [`QueryEngine`](crate::core::QueryEngine)
/// has passed through the filter registry.
#[derive(Debug, Clone)]
pub struct ScopedQuery {
    entity: EntityType,
    scope: Scope,
    predicate: Predicate,
    order_by: Vec<OrderBy>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl ScopedQuery {
    pub(crate) fn new(parts: QueryParts, scope: Scope, tenant_predicate: Predicate) -> Self {
        Self {
            entity: parts.entity,
            scope,
            predicate: Predicate::all([tenant_predicate, parts.predicate]),
            order_by: parts.order_by,
            limit: parts.limit,
            offset: parts.offset,
        }
    }

    /// The entity type.
    pub fn entity(&self) -> EntityType {
        self.entity
    }

    /// The backing table.
    pub fn table(&self) -> &'static str {
        self.entity.table()
    }

    /// How the tenant restriction was chosen.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns true if the query matches no rows by construction.
    pub fn is_fail_closed(&self) -> bool {
        matches!(self.scope, Scope::FailClosed(_))
    }

    /// The full predicate: the tenant predicate AND the caller predicate.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// The tenant half of the predicate.
    pub fn tenant_predicate(&self) -> &Predicate {
        match &self.predicate {
            Predicate::And { all } => &all[0],
            other => other,
        }
    }

    /// Sort terms.
    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    /// Row limit.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Rows skipped.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Returns true if the row satisfies the full predicate.
    pub fn matches(&self, row: &Row) -> bool {
        self.predicate.matches(row)
    }

    /// Renders `SELECT *` with ordering and paging.
    pub fn select_sql(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT * FROM {} WHERE {}",
            dialect.quote(self.table()),
            self.predicate.to_sql(dialect, &mut params)
        );

        let paged = self.limit.is_some() || self.offset.is_some();
        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|o| {
                    let dir = match o.order {
                        SortOrder::Asc => "ASC",
                        SortOrder::Desc => "DESC",
                    };
                    format!("{} {}", dialect.quote(&o.column), dir)
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        } else if paged && dialect == Dialect::SqlServer {
            sql.push_str(" ORDER BY (SELECT NULL)");
        }

        match dialect {
            Dialect::SqlServer if paged => {
                sql.push_str(&format!(" OFFSET {} ROWS", self.offset.unwrap_or(0)));
                if let Some(limit) = self.limit {
                    sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
                }
            }
            Dialect::SqlServer => {}
            Dialect::Postgres | Dialect::Sqlite => {
                match (self.limit, self.offset) {
                    (Some(limit), _) => sql.push_str(&format!(" LIMIT {}", limit)),
                    // SQLite requires LIMIT before OFFSET
                    (None, Some(_)) => sql.push_str(" LIMIT -1"),
                    (None, None) => {}
                }
                if let Some(offset) = self.offset {
                    sql.push_str(&format!(" OFFSET {}", offset));
                }
            }
        }

        (sql, params)
    }

    /// Renders `SELECT COUNT(*)`. Ordering and paging are ignored.
    pub fn count_sql(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            dialect.quote(self.table()),
            self.predicate.to_sql(dialect, &mut params)
        );
        (sql, params)
    }

    /// Renders `DELETE`. Ordering and paging are ignored.
    pub fn delete_sql(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            dialect.quote(self.table()),
            self.predicate.to_sql(dialect, &mut params)
        );
        (sql, params)
    }

    /// Renders `UPDATE ... SET` for the given assignments.
    pub fn update_sql(
        &self,
        dialect: Dialect,
        assignments: &Row,
    ) -> Result<(String, Vec<Value>), ValidationError> {
        if assignments.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "assignments".to_string(),
            });
        }
        let mut params = Vec::new();
        let sets: Vec<String> = assignments
            .iter()
            .map(|(column, value)| {
                params.push(value.clone());
                format!(
                    "{} = {}",
                    dialect.quote(column),
                    dialect.placeholder(params.len())
                )
            })
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            dialect.quote(self.table()),
            sets.join(", "),
            self.predicate.to_sql(dialect, &mut params)
        );
        Ok((sql, params))
    }
}

/// A row ready for insertion, already checked against the tenant context.
///
/// Like [`ScopedQuery`], it can only be produced by the executor.
#[derive(Debug, Clone)]
pub struct ScopedInsert {
    entity: EntityType,
    row: Row,
}

impl ScopedInsert {
    pub(crate) fn new(entity: EntityType, row: Row) -> Self {
        Self { entity, row }
    }

    /// The entity type.
    pub fn entity(&self) -> EntityType {
        self.entity
    }

    /// The backing table.
    pub fn table(&self) -> &'static str {
        self.entity.table()
    }

    /// The row, tenant column included.
    pub fn row(&self) -> &Row {
        &self.row
    }

    /// Renders `INSERT`.
    pub fn insert_sql(&self, dialect: Dialect) -> Result<(String, Vec<Value>), ValidationError> {
        if self.row.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "row".to_string(),
            });
        }
        let mut columns = Vec::with_capacity(self.row.len());
        let mut placeholders = Vec::with_capacity(self.row.len());
        let mut params = Vec::with_capacity(self.row.len());
        for (column, value) in self.row.iter() {
            columns.push(dialect.quote(column));
            params.push(value.clone());
            placeholders.push(dialect.placeholder(params.len()));
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            dialect.quote(self.table()),
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok((sql, params))
    }
}

/// A named capability to read across tenants.
///
/// Holding a `SystemAccess` is the only way to issue a query without a tenant
/// restriction. Granting one and using one are both logged at `info` level
/// with the stated reason. An absent tenant never grants this.
#[derive(Debug, Clone)]
pub struct SystemAccess {
    reason: String,
}

impl SystemAccess {
    /// Grants system access for a stated reason.
    pub fn grant(reason: impl Into<String>) -> Result<Self, ValidationError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "reason".to_string(),
            });
        }
        tracing::info!(reason = %reason, audit = true, "System access granted");
        Ok(Self { reason })
    }

    /// The reason given at grant time.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}
