//! Tenant identity for multi-tenant data access.
//!
//! The query layer never decides *who* is asking; it receives a
//! [`TenantContext`] resolved upstream (typically from an authentication token)
//! and uses it to scope every query.
//!
//! # Core Types
//!
//! - [`TenantId`] - Stable tenant identifier
//! - [`TenantContext`] - Request-scoped tenant identity, possibly without a tenant
//! - [`TenantContextBuilder`] - Builds a context from untrusted request data
//! - [`TenantIdValidator`] - Length and character checks for tenant IDs
//! - [`ambient`] - Task-local context for call paths that cannot pass it explicitly
//!
//! # Examples
//!
//! ```
//! use orbis_persistence::tenant::{TenantContext, TenantId};
//!
//! // A request authenticated for tenant "acme"
//! let ctx = TenantContext::new(TenantId::new("acme")).with_correlation_id("req-1");
//!
//! // A background job with no tenant; tenant-scoped queries match nothing
//! let job = TenantContext::anonymous();
//! assert!(!job.has_tenant());
//! ```

pub mod ambient;
mod context;
mod id;
mod validation;

pub use context::{TenantContext, TenantContextBuilder};
pub use id::TenantId;
pub use validation::TenantIdValidator;
