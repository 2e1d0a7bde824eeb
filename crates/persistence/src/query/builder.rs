//! Caller-side query construction.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::predicate::Predicate;
use crate::filter::{Entity, EntityType};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Column name.
    pub column: String,
    /// Direction.
    pub order: SortOrder,
}

/// A query against entity type `E`, as written by business code.
///
/// A `Query` carries only the caller's own conditions. It cannot be executed
/// directly: it must go through
/// [`TenantScopedExecutor`](super::TenantScopedExecutor) or
/// [`FilterRegistry::scope`](crate::filter::FilterRegistry::scope), which
/// conjoin the tenant predicate and produce a [`ScopedQuery`](super::ScopedQuery).
///
/// ```
/// use orbis_persistence::filter::Entity;
/// use orbis_persistence::query::{Predicate, Query};
///
/// struct Invoice;
/// impl Entity for Invoice {
///     const NAME: &'static str = "Invoice";
///     const TABLE: &'static str = "invoices";
/// }
///
/// let query = Query::<Invoice>::filter(Predicate::gt("total", 100))
///     .order_by_desc("issued_at")
///     .limit(20);
/// assert_eq!(query.limit_value(), Some(20));
/// ```
pub struct Query<E> {
    predicate: Predicate,
    order_by: Vec<OrderBy>,
    limit: Option<usize>,
    offset: Option<usize>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Query<E> {
    /// A query matching every row the caller may see.
    pub fn all() -> Self {
        Self::filter(Predicate::True)
    }

    /// A query with a caller predicate.
    pub fn filter(predicate: Predicate) -> Self {
        Self {
            predicate,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            _entity: PhantomData,
        }
    }

    /// Adds a caller condition, conjoined with existing ones.
    pub fn and_where(mut self, predicate: Predicate) -> Self {
        self.predicate = match self.predicate {
            Predicate::True => predicate,
            existing => existing.and(predicate),
        };
        self
    }

    /// Sorts ascending by `column`.
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            order: SortOrder::Asc,
        });
        self
    }

    /// Sorts descending by `column`.
    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            order: SortOrder::Desc,
        });
        self
    }

    /// Limits the number of rows returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` rows.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The entity type queried.
    pub fn entity(&self) -> EntityType {
        EntityType::of::<E>()
    }

    /// The caller predicate.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// The row limit, if any.
    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    pub(crate) fn into_parts(self) -> QueryParts {
        QueryParts {
            entity: EntityType::of::<E>(),
            predicate: self.predicate,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl<E> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("entity", &E::NAME)
            .field("predicate", &self.predicate)
            .field("order_by", &self.order_by)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

/// An untyped query, as handed to the scoping step.
#[derive(Debug, Clone)]
pub(crate) struct QueryParts {
    pub(crate) entity: EntityType,
    pub(crate) predicate: Predicate,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) limit: Option<usize>,
    pub(crate) offset: Option<usize>,
}
