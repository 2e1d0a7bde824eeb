//! Error types for the persistence core.
//!
//! Errors are split by category: registry configuration errors (fatal at
//! startup), tenant errors (write-side isolation violations), schema errors
//! (DDL compilation and migration loading), validation errors and backend
//! errors. [`StorageError`] wraps all of them.
//!
//! Two situations are deliberately *not* errors: a query issued without a
//! tenant (it fails closed and returns no rows) and an unrecognized column type
//! during translation (it maps to itself).

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::schema::Dialect;
use crate::tenant::TenantId;

/// The primary error type for all persistence operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filter registry configuration errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Tenant isolation errors
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Schema and migration errors
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Configuration errors raised while building the filter registry.
///
/// These are startup errors. A process that gets one must not serve traffic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The same entity type was registered twice.
    #[error("entity type {entity} is already registered with a {existing} filter")]
    DuplicateRegistration { entity: String, existing: String },

    /// A declared entity type has no filter registration.
    #[error("entity type {entity} has no filter registration; register it as tenant-scoped or explicitly unfiltered")]
    MissingRegistration { entity: String },

    /// The tenant column name for a registration is not usable.
    #[error("invalid tenant column '{column}' for entity type {entity}")]
    InvalidColumn { entity: String, column: String },

    /// An unfiltered registration was made without a reason.
    #[error("unfiltered registration for entity type {entity} requires a reason")]
    MissingReason { entity: String },
}

/// Errors related to tenant isolation on the write path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TenantError {
    /// A tenant-scoped write was attempted without a tenant in context.
    #[error("no tenant in context: cannot write tenant-scoped entity {entity}")]
    MissingTenant { entity: String },

    /// A row carried a tenant id other than the one in context.
    #[error("row for {entity} belongs to tenant {row_tenant}, but context tenant is {context_tenant}")]
    TenantMismatch {
        entity: String,
        context_tenant: TenantId,
        row_tenant: String,
    },

    /// A row written through a custom filter would not be visible to its writer.
    #[error("row for {entity} is outside the scope of tenant {context_tenant}")]
    RowOutsideScope {
        entity: String,
        context_tenant: TenantId,
    },

    /// An update tried to assign a column that decides tenant ownership.
    #[error("tenant column '{column}' of {entity} is immutable")]
    TenantColumnImmutable { entity: String, column: String },

    /// The tenant id failed validation.
    #[error("invalid tenant id '{tenant_id}': {reason}")]
    InvalidTenant { tenant_id: String, reason: String },
}

/// Errors related to DDL compilation and migration definitions.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The target dialect cannot express the operation.
    #[error("{dialect} does not support {operation}")]
    UnsupportedOperation {
        dialect: Dialect,
        operation: &'static str,
    },

    /// The operation is structurally invalid.
    #[error("invalid {operation} on table {table}: {message}")]
    InvalidOperation {
        operation: &'static str,
        table: String,
        message: String,
    },

    /// No built-in type mapping exists for the dialect pair.
    #[error("no type mapping from {from} to {to}")]
    NoTypeMapping { from: Dialect, to: Dialect },

    /// Two type rules in one table share a pattern.
    #[error("duplicate type rule for '{pattern}' in {source_dialect} mapping table")]
    DuplicateTypeRule {
        source_dialect: Dialect,
        pattern: String,
    },

    /// A migration document could not be parsed.
    #[error("failed to parse migration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors related to input validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Missing required field.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },
}

/// Errors originating in a storage engine.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Could not obtain a connection.
    #[error("connection failed for {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// A statement failed to execute.
    #[error("query failed on {backend_name}: {message}")]
    QueryFailed {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The referenced table does not exist in the engine.
    #[error("unknown table {table} in {backend_name}")]
    UnknownTable { backend_name: String, table: String },
}

/// Result alias used throughout the crate.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result alias for registry construction.
pub type RegistryResult<T> = Result<T, RegistryError>;
