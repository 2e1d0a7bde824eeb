//! Queries, predicates and tenant-scoped execution.
//!
//! Business code builds a [`Query`] with its own [`Predicate`] and hands it
//! to a [`TenantScopedExecutor`]. The executor asks the
//! [`FilterRegistry`](crate::filter::FilterRegistry) for the tenant
//! predicate of the entity type, evaluated against the current
//! [`TenantContext`](crate::tenant::TenantContext), and passes the engine a
//! [`ScopedQuery`] whose predicate is `tenant AND caller`.

mod builder;
mod executor;
mod predicate;
mod scoped;
mod value;

pub use builder::{OrderBy, Query, SortOrder};
pub use executor::TenantScopedExecutor;
pub use predicate::{CompareOp, Predicate};
pub use scoped::{FailClosedReason, Scope, ScopedInsert, ScopedQuery, SystemAccess};
pub use value::{Row, Value};
