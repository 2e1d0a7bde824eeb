//! Tenant context for data-access operations.
//!
//! This module defines [`TenantContext`], the request-scoped value that tells
//! the query layer which tenant is asking. It is handed to every query
//! explicitly; nothing in this crate stores it beyond the call it was passed to.

use super::id::TenantId;
use super::validation::TenantIdValidator;
use crate::error::{StorageError, ValidationError};

/// The tenant identity of one inbound request.
///
/// A context is built once per request (usually from an authentication token)
/// and never mutated afterwards. It may carry no tenant at all, which is how
/// background and system work is represented. Queries issued with such a
/// context against tenant-scoped entities match nothing; see
/// [`FilterRegistry`](crate::filter::FilterRegistry).
///
/// ```
/// use orbis_persistence::tenant::{TenantContext, TenantId};
///
/// let ctx = TenantContext::new(TenantId::new("acme")).with_user_id("user-1");
/// assert_eq!(ctx.tenant_id().map(|t| t.as_str()), Some("acme"));
///
/// let job = TenantContext::anonymous();
/// assert!(job.tenant_id().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    /// The tenant identifier, absent for tenant-agnostic work.
    tenant_id: Option<TenantId>,
    /// Optional correlation ID for request tracing.
    correlation_id: Option<String>,
    /// Optional user ID for audit purposes.
    user_id: Option<String>,
}

impl TenantContext {
    /// Creates a context for the given tenant.
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            correlation_id: None,
            user_id: None,
        }
    }

    /// Creates a context with no tenant.
    ///
    /// Tenant-scoped queries issued with this context return no rows.
    pub fn anonymous() -> Self {
        Self {
            tenant_id: None,
            correlation_id: None,
            user_id: None,
        }
    }

    /// Returns a builder for contexts assembled from external input.
    pub fn builder() -> TenantContextBuilder {
        TenantContextBuilder::new()
    }

    /// Creates a context with the specified correlation ID for tracing.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Creates a context with the specified user ID for auditing.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Returns the tenant ID, if any.
    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    /// Returns `true` if the context carries a tenant.
    pub fn has_tenant(&self) -> bool {
        self.tenant_id.is_some()
    }

    /// Returns the correlation ID, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Returns the user ID, if set.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns `true` if the given raw tenant value belongs to this context.
    pub fn owns(&self, tenant: &str) -> bool {
        self.tenant_id
            .as_ref()
            .is_some_and(|id| id.as_str() == tenant)
    }
}

/// Builder for tenant contexts resolved from request data.
///
/// Useful when the tenant comes from a header or token claim that may be
/// missing or malformed.
#[derive(Debug, Default)]
pub struct TenantContextBuilder {
    tenant_id: Option<TenantId>,
    correlation_id: Option<String>,
    user_id: Option<String>,
    require_tenant: bool,
}

impl TenantContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tenant ID.
    pub fn tenant_id(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Sets the tenant ID from a string.
    pub fn tenant_id_str(mut self, tenant_id: &str) -> Self {
        self.tenant_id = Some(TenantId::new(tenant_id));
        self
    }

    /// Sets the tenant ID from an optional claim value. Empty strings count as absent.
    pub fn tenant_claim(mut self, claim: Option<&str>) -> Self {
        self.tenant_id = claim
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(TenantId::new);
        self
    }

    /// Sets the correlation ID.
    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Sets the user ID.
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Makes [`build`](Self::build) fail when no tenant was supplied.
    pub fn require_tenant(mut self) -> Self {
        self.require_tenant = true;
        self
    }

    /// Builds the context.
    pub fn build(self) -> Result<TenantContext, ValidationError> {
        if self.require_tenant && self.tenant_id.is_none() {
            return Err(ValidationError::MissingRequiredField {
                field: "tenant_id".to_string(),
            });
        }

        Ok(TenantContext {
            tenant_id: self.tenant_id,
            correlation_id: self.correlation_id,
            user_id: self.user_id,
        })
    }

    /// Builds the context after checking the tenant id against `validator`.
    pub fn build_validated(
        self,
        validator: &TenantIdValidator,
    ) -> Result<TenantContext, StorageError> {
        if let Some(id) = &self.tenant_id {
            validator.validate(id)?;
        }
        Ok(self.build()?)
    }
}
