//! Orbis persistence core.
//!
//! This crate provides two independent pieces of the Orbis data layer:
//!
//! - **Tenant isolation.** Every entity type is registered once at startup
//!   with a tenant filter. Every query is then conjoined with the tenant
//!   predicate for the caller's [`TenantContext`] before it reaches storage.
//!   A context without a tenant sees nothing.
//! - **Schema translation.** Migrations are written once against SQL Server
//!   and compiled for PostgreSQL (or SQLite) by rewriting column types
//!   through a [`TypeMappingTable`](schema::TypeMappingTable).
//!
//! # Features
//!
//! - `sqlite` (default) - the [`SqliteEngine`](backends::sqlite::SqliteEngine)
//! - `cli` - the `orbis-ddl` migration compiler binary
//!
//! # Architecture
//!
//! - [`tenant`] - Tenant identity and the request context
//! - [`filter`] - Entity filter registration
//! - [`query`] - Predicates, queries and the tenant-scoped executor
//! - [`core`] - Storage engine traits
//! - [`backends`] - Engine implementations
//! - [`schema`] - Schema operations, type mapping and DDL
//! - [`config`] - Configuration
//! - [`error`] - Error types
//!
//! # Tenant-scoped queries
//!
//! ```
//! use std::sync::Arc;
//! use orbis_persistence::filter::{Entity, FilterRegistry};
//! use orbis_persistence::query::{Predicate, Query, Scope};
//! use orbis_persistence::tenant::{TenantContext, TenantId};
//!
//! struct Invoice;
//! impl Entity for Invoice {
//!     const NAME: &'static str = "Invoice";
//!     const TABLE: &'static str = "invoices";
//! }
//!
//! let registry = Arc::new(
//!     FilterRegistry::builder()
//!         .tenant_scoped::<Invoice>()
//!         .build()
//!         .expect("registry configuration"),
//! );
//!
//! let ctx = TenantContext::new(TenantId::new("acme"));
//! let scoped = registry.scope(&ctx, Query::<Invoice>::filter(Predicate::gt("total", 100)));
//! assert_eq!(scoped.scope(), &Scope::Tenant(TenantId::new("acme")));
//!
//! // No tenant: the query is scoped to match nothing
//! let scoped = registry.scope(&TenantContext::anonymous(), Query::<Invoice>::all());
//! assert!(scoped.is_fail_closed());
//! ```
//!
//! # Schema translation
//!
//! ```
//! use orbis_persistence::schema::TypeMappingTable;
//!
//! let table = TypeMappingTable::sqlserver_to_postgres();
//! assert_eq!(table.map_type("nvarchar(50)"), "character varying(50)");
//! assert_eq!(table.map_type("geography"), "geography");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod filter;
pub mod query;
pub mod schema;
pub mod tenant;

// Re-export commonly used types at crate root
pub use config::{PersistenceConfig, TenancyConfig};
pub use error::{StorageError, StorageResult};
pub use filter::{Entity, EntityFilter, FilterRegistry};
pub use query::{Predicate, Query, Row, ScopedQuery, SystemAccess, TenantScopedExecutor, Value};
pub use schema::{Dialect, Migration, SchemaOperation, SchemaTranslator, TypeMappingTable};
pub use tenant::{TenantContext, TenantId};

// Re-export core traits
pub use core::{MigrationEngine, QueryEngine};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
