//! Schema operations, type mapping and DDL generation.
//!
//! Migrations are written once, in the vocabulary of a source dialect
//! (SQL Server by default), and compiled for each target engine:
//!
//! 1. [`TypeDescriptor`] parses a raw column type such as `nvarchar(50)`.
//! 2. [`TypeMappingTable`] maps a source type to its target equivalent.
//!    Unknown types map to themselves.
//! 3. [`SchemaTranslator`] rewrites the column types inside a
//!    [`SchemaOperation`] and leaves everything else alone.
//! 4. A [`DdlCompiler`] renders the translated operation as SQL.
//!
//! [`TranslatingCompiler`] chains steps 3 and 4.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod ddl;
mod mapping;
mod operation;
mod translator;
mod types;

pub use ddl::{DdlCompiler, PostgresDdl, SqlServerDdl, SqliteDdl, compiler_for};
pub use mapping::{
    MatchKind, SQLSERVER_TO_POSTGRES_RULES, SQLSERVER_TO_SQLITE_RULES, TypeMappingTable, TypeRule,
};
pub use operation::{
    AddColumn, AlterColumn, ColumnDef, CreateTable, IndexDef, Migration, SchemaOperation,
};
pub use translator::{SchemaTranslator, TranslatingCompiler};
pub use types::{TypeArg, TypeDescriptor};

/// A SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Microsoft SQL Server.
    SqlServer,
    /// PostgreSQL.
    Postgres,
    /// SQLite.
    Sqlite,
}

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Dialect; 3] = [Dialect::SqlServer, Dialect::Postgres, Dialect::Sqlite];

    /// Returns the lowercase dialect name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::SqlServer => "sqlserver",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Quotes an identifier.
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::SqlServer => format!("[{}]", ident.replace(']', "]]")),
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Returns the positional bind placeholder for the 1-based parameter `n`.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::SqlServer => format!("@p{}", n),
            Dialect::Postgres => format!("${}", n),
            Dialect::Sqlite => format!("?{}", n),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(format!("unknown dialect: {}", other)),
        }
    }
}
