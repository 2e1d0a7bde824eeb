//! Tenant filter registration.
//!
//! Every entity type the application persists is registered here once, at
//! startup, as one of:
//!
//! - tenant-scoped on a column ([`FilterRegistryBuilder::tenant_scoped`]),
//! - filtered by a custom [`PredicateFactory`],
//! - intentionally unfiltered, with a reason ([`FilterRegistryBuilder::unfiltered`]).
//!
//! The resulting [`FilterRegistry`] is immutable and consulted on every query.

mod entity;
mod registry;

pub use entity::{Entity, EntityType};
pub use registry::{EntityFilter, FilterRegistry, FilterRegistryBuilder, PredicateFactory};
