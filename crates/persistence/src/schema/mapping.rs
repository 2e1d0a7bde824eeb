//! Type mapping tables between SQL dialects.
//!
//! A [`TypeMappingTable`] rewrites a column type written in a source dialect's
//! vocabulary into the equivalent target-dialect type. Rules come in two
//! kinds, both keyed on the parsed [`TypeDescriptor`]:
//!
//! - [`TypeRule::Exact`] matches a descriptor without numeric arguments
//!   (`bit`, `uniqueidentifier`, `nvarchar(max)`) and yields a fixed target.
//! - [`TypeRule::Parameterized`] matches a name with a given number of numeric
//!   arguments (`nvarchar(n)`, `decimal(p,s)`) and re-emits those digits
//!   unchanged in the target's parameter list. A `{}` in the target marks
//!   where the list goes (`timestamp{} without time zone`).
//! - [`TypeRule::Collapsed`] matches the same way but drops the arguments
//!   (`varbinary(n)` to `bytea`).
//!
//! Lookup is total: a descriptor that no rule matches, or that does not parse
//! at all, is returned unchanged.
//!
//! # Built-in tables
//!
//! | SQL Server | PostgreSQL | SQLite |
//! |------------|------------|--------|
//! | `uniqueidentifier` | `uuid` | `text` |
//! | `bit` | `boolean` | `integer` |
//! | `datetime2`, `datetime`, `smalldatetime` | `timestamp without time zone` | `text` |
//! | `datetime2(n)` | `timestamp(n) without time zone` | `text` |
//! | `datetimeoffset` | `timestamp with time zone` | `text` |
//! | `datetimeoffset(n)` | `timestamp(n) with time zone` | `text` |
//! | `varbinary(n)`, `binary(n)` | `bytea` | `blob` |
//! | `nvarchar(max)`, `varchar(max)`, `ntext`, `text` | `text` | `text` |
//! | `nvarchar(n)`, `varchar(n)` | `character varying(n)` | `varchar(n)` |
//! | `nchar(n)`, `char(n)` | `character(n)` | `character(n)` |
//! | `decimal(p,s)`, `numeric(p,s)` | `numeric(p,s)` | `numeric(p,s)` |
//!
//! See the rule lists below for the complete set.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use super::Dialect;
use super::types::TypeDescriptor;
use crate::error::SchemaError;

/// One translation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRule {
    /// Matches a descriptor with no numeric arguments, compared by canonical form.
    Exact {
        /// Canonical source form, e.g. `nvarchar(max)`.
        source: &'static str,
        /// Target type text.
        target: &'static str,
    },
    /// Matches a name with exactly `arity` numeric arguments.
    Parameterized {
        /// Source type name, e.g. `decimal`.
        source: &'static str,
        /// Number of numeric arguments (1 or 2).
        arity: usize,
        /// Target type. The argument list replaces `{}` if present and is
        /// appended otherwise.
        target: &'static str,
    },
    /// Matches a name with exactly `arity` numeric arguments and discards them.
    Collapsed {
        /// Source type name, e.g. `varbinary`.
        source: &'static str,
        /// Number of numeric arguments.
        arity: usize,
        /// Target type text.
        target: &'static str,
    },
}

impl TypeRule {
    fn key(&self) -> (String, usize) {
        match self {
            TypeRule::Exact { source, .. } => (source.to_ascii_lowercase(), 0),
            TypeRule::Parameterized { source, arity, .. } | TypeRule::Collapsed { source, arity, .. } => {
                (source.to_ascii_lowercase(), *arity)
            }
        }
    }

    /// Renders the target for a matched argument list.
    fn render(&self, args: &[&str]) -> String {
        match self {
            TypeRule::Exact { target, .. } | TypeRule::Collapsed { target, .. } => {
                (*target).to_string()
            }
            TypeRule::Parameterized { target, .. } => {
                let list = format!("({})", args.join(","));
                if target.contains("{}") {
                    target.replacen("{}", &list, 1)
                } else {
                    format!("{}{}", target, list)
                }
            }
        }
    }
}

/// How a type was resolved by [`TypeMappingTable::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// An exact rule applied.
    Exact,
    /// A parameterized rule applied.
    Parameterized,
    /// The descriptor parsed but no rule applied.
    Unmatched,
    /// The descriptor is outside the descriptor grammar.
    Unparsed,
}

/// An immutable set of type rules from one dialect to another.
#[derive(Debug, Clone)]
pub struct TypeMappingTable {
    source: Dialect,
    target: Dialect,
    rules: Vec<TypeRule>,
    exact: HashMap<String, &'static str>,
    parameterized: HashMap<(String, usize), TypeRule>,
}

static SQLSERVER_TO_POSTGRES: LazyLock<Arc<TypeMappingTable>> = LazyLock::new(|| {
    Arc::new(TypeMappingTable::from_static(
        Dialect::SqlServer,
        Dialect::Postgres,
        SQLSERVER_TO_POSTGRES_RULES,
    ))
});

static SQLSERVER_TO_SQLITE: LazyLock<Arc<TypeMappingTable>> = LazyLock::new(|| {
    Arc::new(TypeMappingTable::from_static(
        Dialect::SqlServer,
        Dialect::Sqlite,
        SQLSERVER_TO_SQLITE_RULES,
    ))
});

impl TypeMappingTable {
    /// Builds a table from rules, rejecting two rules with the same pattern.
    pub fn from_rules(
        source: Dialect,
        target: Dialect,
        rules: &[TypeRule],
    ) -> Result<Self, SchemaError> {
        let mut table = Self::empty(source, target);
        for rule in rules {
            if !table.insert(*rule) {
                return Err(SchemaError::DuplicateTypeRule {
                    source_dialect: source,
                    pattern: rule.key().0,
                });
            }
        }
        Ok(table)
    }

    /// Returns a table with no rules, mapping every type to itself.
    pub fn identity(dialect: Dialect) -> Self {
        Self::empty(dialect, dialect)
    }

    /// The built-in SQL Server to PostgreSQL table.
    pub fn sqlserver_to_postgres() -> Arc<Self> {
        Arc::clone(&SQLSERVER_TO_POSTGRES)
    }

    /// The built-in SQL Server to SQLite table.
    pub fn sqlserver_to_sqlite() -> Arc<Self> {
        Arc::clone(&SQLSERVER_TO_SQLITE)
    }

    /// Returns the table for a dialect pair.
    ///
    /// Equal dialects get an identity table. Pairs without a built-in table
    /// return [`SchemaError::NoTypeMapping`].
    pub fn for_dialects(source: Dialect, target: Dialect) -> Result<Arc<Self>, SchemaError> {
        match (source, target) {
            (s, t) if s == t => Ok(Arc::new(Self::identity(s))),
            (Dialect::SqlServer, Dialect::Postgres) => Ok(Self::sqlserver_to_postgres()),
            (Dialect::SqlServer, Dialect::Sqlite) => Ok(Self::sqlserver_to_sqlite()),
            _ => Err(SchemaError::NoTypeMapping {
                from: source,
                to: target,
            }),
        }
    }

    /// Source dialect.
    pub fn source(&self) -> Dialect {
        self.source
    }

    /// Target dialect.
    pub fn target(&self) -> Dialect {
        self.target
    }

    /// The rules in this table, in registration order.
    pub fn rules(&self) -> &[TypeRule] {
        &self.rules
    }

    /// Translates a raw column type, returning the input unchanged when no rule applies.
    ///
    /// ```
    /// use orbis_persistence::schema::TypeMappingTable;
    ///
    /// let table = TypeMappingTable::sqlserver_to_postgres();
    /// assert_eq!(table.map_type("nvarchar(50)"), "character varying(50)");
    /// assert_eq!(table.map_type("decimal(10,2)"), "numeric(10,2)");
    /// assert_eq!(table.map_type("NVARCHAR(MAX)"), "text");
    /// assert_eq!(table.map_type("geography"), "geography");
    /// ```
    pub fn map_type<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        match self.resolve(raw) {
            (Some(mapped), _) => Cow::Owned(mapped),
            (None, kind) => {
                tracing::debug!(
                    column_type = raw,
                    source = %self.source,
                    target = %self.target,
                    reason = ?kind,
                    "No type mapping rule; keeping column type unchanged"
                );
                Cow::Borrowed(raw)
            }
        }
    }

    /// Resolves a raw column type, reporting which kind of rule matched.
    pub fn resolve(&self, raw: &str) -> (Option<String>, MatchKind) {
        let Some(descriptor) = TypeDescriptor::parse(raw) else {
            return (None, MatchKind::Unparsed);
        };

        if descriptor.is_non_numeric() {
            return match self.exact.get(&descriptor.to_string()) {
                Some(target) => (Some((*target).to_string()), MatchKind::Exact),
                None => (None, MatchKind::Unmatched),
            };
        }

        let Some(args) = descriptor.numeric_args() else {
            // Mixed numeric and keyword arguments, e.g. `decimal(10,max)`.
            return (None, MatchKind::Unmatched);
        };

        match self
            .parameterized
            .get(&(descriptor.name().to_string(), args.len()))
        {
            Some(rule) => (Some(rule.render(&args)), MatchKind::Parameterized),
            None => (None, MatchKind::Unmatched),
        }
    }

    fn empty(source: Dialect, target: Dialect) -> Self {
        Self {
            source,
            target,
            rules: Vec::new(),
            exact: HashMap::new(),
            parameterized: HashMap::new(),
        }
    }

    /// Built-in rule lists are checked for duplicates by tests; first rule wins.
    fn from_static(source: Dialect, target: Dialect, rules: &[TypeRule]) -> Self {
        let mut table = Self::empty(source, target);
        for rule in rules {
            table.insert(*rule);
        }
        table
    }

    fn insert(&mut self, rule: TypeRule) -> bool {
        let (pattern, arity) = rule.key();
        let inserted = match rule {
            TypeRule::Exact { target, .. } => {
                // Normalize the source through the grammar so `NVARCHAR( MAX )` keys as `nvarchar(max)`.
                let key = TypeDescriptor::parse(&pattern)
                    .map(|d| d.to_string())
                    .unwrap_or(pattern);
                if self.exact.contains_key(&key) {
                    false
                } else {
                    self.exact.insert(key, target);
                    true
                }
            }
            TypeRule::Parameterized { .. } | TypeRule::Collapsed { .. } => {
                let key = (pattern, arity);
                if self.parameterized.contains_key(&key) {
                    false
                } else {
                    self.parameterized.insert(key, rule);
                    true
                }
            }
        };
        if inserted {
            self.rules.push(rule);
        }
        inserted
    }
}

const fn exact(source: &'static str, target: &'static str) -> TypeRule {
    TypeRule::Exact { source, target }
}

const fn param(source: &'static str, arity: usize, target: &'static str) -> TypeRule {
    TypeRule::Parameterized {
        source,
        arity,
        target,
    }
}

const fn collapse(source: &'static str, arity: usize, target: &'static str) -> TypeRule {
    TypeRule::Collapsed {
        source,
        arity,
        target,
    }
}

/// SQL Server to PostgreSQL.
pub const SQLSERVER_TO_POSTGRES_RULES: &[TypeRule] = &[
    exact("uniqueidentifier", "uuid"),
    exact("bit", "boolean"),
    exact("datetime2", "timestamp without time zone"),
    exact("datetime", "timestamp without time zone"),
    exact("smalldatetime", "timestamp without time zone"),
    exact("datetimeoffset", "timestamp with time zone"),
    exact("date", "date"),
    exact("time", "time without time zone"),
    exact("nvarchar(max)", "text"),
    exact("varchar(max)", "text"),
    exact("ntext", "text"),
    exact("text", "text"),
    exact("varbinary(max)", "bytea"),
    exact("image", "bytea"),
    exact("rowversion", "bytea"),
    exact("tinyint", "smallint"),
    exact("float", "double precision"),
    exact("money", "numeric(19,4)"),
    exact("smallmoney", "numeric(10,4)"),
    exact("xml", "xml"),
    param("nvarchar", 1, "character varying"),
    param("varchar", 1, "character varying"),
    param("nchar", 1, "character"),
    param("char", 1, "character"),
    param("decimal", 2, "numeric"),
    param("numeric", 2, "numeric"),
    param("decimal", 1, "numeric"),
    param("numeric", 1, "numeric"),
    param("datetime2", 1, "timestamp{} without time zone"),
    param("datetimeoffset", 1, "timestamp{} with time zone"),
    param("time", 1, "time{} without time zone"),
    param("float", 1, "float"),
    collapse("varbinary", 1, "bytea"),
    collapse("binary", 1, "bytea"),
];

/// SQL Server to SQLite.
pub const SQLSERVER_TO_SQLITE_RULES: &[TypeRule] = &[
    exact("uniqueidentifier", "text"),
    exact("bit", "integer"),
    exact("datetime2", "text"),
    exact("datetime", "text"),
    exact("smalldatetime", "text"),
    exact("datetimeoffset", "text"),
    exact("date", "text"),
    exact("time", "text"),
    exact("nvarchar(max)", "text"),
    exact("varchar(max)", "text"),
    exact("ntext", "text"),
    exact("text", "text"),
    exact("varbinary(max)", "blob"),
    exact("image", "blob"),
    exact("rowversion", "blob"),
    exact("tinyint", "integer"),
    exact("float", "real"),
    exact("money", "numeric(19,4)"),
    exact("smallmoney", "numeric(10,4)"),
    param("nvarchar", 1, "varchar"),
    param("varchar", 1, "varchar"),
    param("nchar", 1, "character"),
    param("char", 1, "character"),
    param("decimal", 2, "numeric"),
    param("numeric", 2, "numeric"),
    param("decimal", 1, "numeric"),
    param("numeric", 1, "numeric"),
    collapse("datetime2", 1, "text"),
    collapse("datetimeoffset", 1, "text"),
    collapse("time", 1, "text"),
    collapse("float", 1, "real"),
    collapse("varbinary", 1, "blob"),
    collapse("binary", 1, "blob"),
];
