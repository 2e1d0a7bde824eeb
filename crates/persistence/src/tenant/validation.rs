//! Tenant ID validation.

use regex::Regex;

use super::id::TenantId;
use crate::error::TenantError;

/// Validates tenant IDs against a length limit and an allowed-character pattern.
///
/// Built from [`TenancyConfig::validator`](crate::config::TenancyConfig::validator).
#[derive(Debug, Clone)]
pub struct TenantIdValidator {
    pattern: Regex,
    max_length: usize,
}

impl TenantIdValidator {
    /// Creates a validator from a regex pattern and a maximum length.
    pub fn new(pattern: &str, max_length: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            max_length,
        })
    }

    /// Checks a tenant ID.
    pub fn validate(&self, tenant_id: &TenantId) -> Result<(), TenantError> {
        let id = tenant_id.as_str();

        if id.is_empty() {
            return Err(TenantError::InvalidTenant {
                tenant_id: id.to_string(),
                reason: "tenant ID is empty".to_string(),
            });
        }

        if id.len() > self.max_length {
            return Err(TenantError::InvalidTenant {
                tenant_id: id.to_string(),
                reason: format!(
                    "tenant ID exceeds maximum length of {} characters",
                    self.max_length
                ),
            });
        }

        if !self.pattern.is_match(id) {
            return Err(TenantError::InvalidTenant {
                tenant_id: id.to_string(),
                reason: format!(
                    "tenant ID does not match required pattern: {}",
                    self.pattern.as_str()
                ),
            });
        }

        Ok(())
    }
}
