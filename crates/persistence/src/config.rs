//! Configuration for the persistence core.
//!
//! Configuration can be deserialized (every field has a serde default), built
//! programmatically, or read from `ORBIS_*` environment variables with
//! [`PersistenceConfig::from_env`].
//!
//! ```
//! use orbis_persistence::config::{PersistenceConfig, TenancyConfig};
//! use orbis_persistence::schema::Dialect;
//!
//! let config = PersistenceConfig {
//!     tenancy: TenancyConfig::new().with_tenant_column("org_id"),
//!     target_dialect: Dialect::Postgres,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::schema::Dialect;
use crate::tenant::TenantIdValidator;

#[cfg(feature = "sqlite")]
use crate::backends::sqlite::SqliteEngineConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Tenant isolation settings.
    #[serde(default)]
    pub tenancy: TenancyConfig,

    /// Dialect migrations are authored in.
    #[serde(default = "default_source_dialect")]
    pub source_dialect: Dialect,

    /// Dialect DDL is generated for.
    #[serde(default = "default_target_dialect")]
    pub target_dialect: Dialect,

    /// SQLite engine settings.
    #[cfg(feature = "sqlite")]
    #[serde(default)]
    pub sqlite: SqliteEngineConfig,
}

fn default_source_dialect() -> Dialect {
    Dialect::SqlServer
}

fn default_target_dialect() -> Dialect {
    Dialect::Postgres
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            tenancy: TenancyConfig::default(),
            source_dialect: default_source_dialect(),
            target_dialect: default_target_dialect(),
            #[cfg(feature = "sqlite")]
            sqlite: SqliteEngineConfig::default(),
        }
    }
}

impl PersistenceConfig {
    /// Reads configuration from environment variables, falling back to defaults.
    ///
    /// - `ORBIS_TENANT_COLUMN` - tenant column name (default: `tenant_id`)
    /// - `ORBIS_TENANT_ID_PATTERN` - allowed tenant ID pattern
    /// - `ORBIS_TENANT_ID_MAX_LENGTH` - maximum tenant ID length (default: 64)
    /// - `ORBIS_SOURCE_DIALECT` - migration source dialect (default: `sqlserver`)
    /// - `ORBIS_TARGET_DIALECT` - DDL target dialect (default: `postgres`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from `ORBIS_*` keys resolved by `lookup`.
    ///
    /// Unset or unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            tenancy: TenancyConfig {
                tenant_column: lookup("ORBIS_TENANT_COLUMN")
                    .unwrap_or(defaults.tenancy.tenant_column),
                tenant_id_pattern: lookup("ORBIS_TENANT_ID_PATTERN")
                    .unwrap_or(defaults.tenancy.tenant_id_pattern),
                max_tenant_id_length: lookup("ORBIS_TENANT_ID_MAX_LENGTH")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.tenancy.max_tenant_id_length),
            },
            source_dialect: lookup("ORBIS_SOURCE_DIALECT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.source_dialect),
            target_dialect: lookup("ORBIS_TARGET_DIALECT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.target_dialect),
            #[cfg(feature = "sqlite")]
            sqlite: defaults.sqlite,
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.tenancy.tenant_column.trim().is_empty() {
            errors.push("Tenant column cannot be empty".to_string());
        }

        if self.tenancy.max_tenant_id_length == 0 {
            errors.push("Maximum tenant ID length cannot be 0".to_string());
        }

        if let Err(e) = regex::Regex::new(&self.tenancy.tenant_id_pattern) {
            errors.push(format!("Invalid tenant ID pattern: {}", e));
        }

        #[cfg(feature = "sqlite")]
        if self.sqlite.max_connections == 0 {
            errors.push("SQLite max connections cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Tenant isolation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// The name of the tenant ID column on tenant-scoped tables.
    #[serde(default = "default_tenant_column")]
    pub tenant_column: String,

    /// Allowed characters in tenant IDs (regex pattern).
    #[serde(default = "default_tenant_id_pattern")]
    pub tenant_id_pattern: String,

    /// Maximum length for tenant IDs.
    #[serde(default = "default_max_tenant_id_length")]
    pub max_tenant_id_length: usize,
}

fn default_tenant_column() -> String {
    "tenant_id".to_string()
}

fn default_tenant_id_pattern() -> String {
    r"^[a-zA-Z0-9_\-]+$".to_string()
}

fn default_max_tenant_id_length() -> usize {
    64
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            tenant_column: default_tenant_column(),
            tenant_id_pattern: default_tenant_id_pattern(),
            max_tenant_id_length: default_max_tenant_id_length(),
        }
    }
}

impl TenancyConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tenant column name.
    pub fn with_tenant_column(mut self, column: impl Into<String>) -> Self {
        self.tenant_column = column.into();
        self
    }

    /// Compiles the tenant ID validator for this configuration.
    pub fn validator(&self) -> Result<TenantIdValidator, regex::Error> {
        TenantIdValidator::new(&self.tenant_id_pattern, self.max_tenant_id_length)
    }
}
