//! Schema change operations and migrations.
//!
//! A [`SchemaOperation`] describes one DDL change in a dialect-neutral shape.
//! Column types are carried as the raw type text the migration author wrote,
//! in the source dialect's vocabulary; translation to another dialect happens
//! in [`SchemaTranslator`](super::SchemaTranslator).

use serde::{Deserialize, Serialize};

use super::ddl::DdlCompiler;
use crate::error::SchemaError;

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Column type text, e.g. `nvarchar(50)`.
    pub column_type: String,
    /// Whether the column accepts NULL.
    #[serde(default)]
    pub nullable: bool,
    /// Default value expression, emitted verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sql: Option<String>,
}

impl ColumnDef {
    /// Creates a NOT NULL column.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: false,
            default_sql: None,
        }
    }

    /// Marks the column as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets a default value expression.
    pub fn with_default(mut self, default_sql: impl Into<String>) -> Self {
        self.default_sql = Some(default_sql.into());
        self
    }
}

/// An index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether the index enforces uniqueness.
    #[serde(default)]
    pub unique: bool,
}

impl IndexDef {
    /// Creates a non-unique index.
    pub fn new(name: impl Into<String>, columns: Vec<&str>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(String::from).collect(),
            unique: false,
        }
    }

    /// Marks the index as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Table creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTable {
    /// Table name.
    pub name: String,
    /// Columns, in order.
    pub columns: Vec<ColumnDef>,
    /// Primary key columns.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Indexes created alongside the table.
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
}

impl CreateTable {
    /// Starts a table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Adds a column.
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key.
    pub fn primary_key(mut self, columns: Vec<&str>) -> Self {
        self.primary_key = columns.into_iter().map(String::from).collect();
        self
    }

    /// Adds an index.
    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }
}

/// Column addition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddColumn {
    /// Table name.
    pub table: String,
    /// The new column.
    pub column: ColumnDef,
}

/// Column alteration. `column` is the column's full new definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterColumn {
    /// Table name.
    pub table: String,
    /// The new column definition.
    pub column: ColumnDef,
}

/// One schema change.
///
/// The set of kinds is closed. Only `CreateTable`, `AddColumn` and
/// `AlterColumn` carry column types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SchemaOperation {
    /// Create a table.
    CreateTable(CreateTable),
    /// Add a column to a table.
    AddColumn(AddColumn),
    /// Change a column's type, nullability or default.
    AlterColumn(AlterColumn),
    /// Drop a table.
    DropTable {
        /// Table name.
        name: String,
    },
    /// Drop a column.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// Rename a column.
    RenameColumn {
        /// Table name.
        table: String,
        /// Current column name.
        from: String,
        /// New column name.
        to: String,
    },
    /// Create an index on an existing table.
    CreateIndex {
        /// Table name.
        table: String,
        /// The index.
        index: IndexDef,
    },
    /// Drop an index.
    DropIndex {
        /// Table name.
        table: String,
        /// Index name.
        name: String,
    },
    /// Raw SQL, emitted verbatim for every dialect.
    Sql {
        /// The statement.
        sql: String,
    },
}

impl SchemaOperation {
    /// Short name of the operation kind, used in errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaOperation::CreateTable(_) => "create table",
            SchemaOperation::AddColumn(_) => "add column",
            SchemaOperation::AlterColumn(_) => "alter column",
            SchemaOperation::DropTable { .. } => "drop table",
            SchemaOperation::DropColumn { .. } => "drop column",
            SchemaOperation::RenameColumn { .. } => "rename column",
            SchemaOperation::CreateIndex { .. } => "create index",
            SchemaOperation::DropIndex { .. } => "drop index",
            SchemaOperation::Sql { .. } => "sql",
        }
    }

    /// The table the operation targets, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            SchemaOperation::CreateTable(op) => Some(&op.name),
            SchemaOperation::AddColumn(op) => Some(&op.table),
            SchemaOperation::AlterColumn(op) => Some(&op.table),
            SchemaOperation::DropTable { name } => Some(name),
            SchemaOperation::DropColumn { table, .. }
            | SchemaOperation::RenameColumn { table, .. }
            | SchemaOperation::CreateIndex { table, .. }
            | SchemaOperation::DropIndex { table, .. } => Some(table),
            SchemaOperation::Sql { .. } => None,
        }
    }
}

impl From<CreateTable> for SchemaOperation {
    fn from(op: CreateTable) -> Self {
        SchemaOperation::CreateTable(op)
    }
}

impl From<AddColumn> for SchemaOperation {
    fn from(op: AddColumn) -> Self {
        SchemaOperation::AddColumn(op)
    }
}

impl From<AlterColumn> for SchemaOperation {
    fn from(op: AlterColumn) -> Self {
        SchemaOperation::AlterColumn(op)
    }
}

/// An ordered list of schema operations with an identifier.
///
/// Migrations are authored once in the source dialect and compiled for each
/// target dialect.
///
/// ```
/// use orbis_persistence::schema::{Migration, PostgresDdl, TranslatingCompiler, Dialect};
///
/// let migration = Migration::from_json(r#"{
///     "id": "0001_invoices",
///     "operations": [
///         {"op": "create_table", "name": "invoices", "columns": [
///             {"name": "id", "column_type": "uniqueidentifier"},
///             {"name": "total", "column_type": "decimal(10,2)"}
///         ], "primary_key": ["id"]}
///     ]
/// }"#).unwrap();
///
/// let compiler = TranslatingCompiler::new(Dialect::SqlServer, PostgresDdl).unwrap();
/// let ddl = migration.compile(&compiler).unwrap();
/// assert!(ddl[0].contains("\"id\" uuid NOT NULL"));
/// assert!(ddl[0].contains("\"total\" numeric(10,2) NOT NULL"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    /// Unique, sortable migration identifier.
    pub id: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operations, applied in order.
    pub operations: Vec<SchemaOperation>,
}

impl Migration {
    /// Creates an empty migration.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            operations: Vec::new(),
        }
    }

    /// Appends an operation.
    pub fn with_operation(mut self, op: impl Into<SchemaOperation>) -> Self {
        self.operations.push(op.into());
        self
    }

    /// Parses a migration from JSON.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compiles every operation with `compiler`, in order.
    pub fn compile(&self, compiler: &dyn DdlCompiler) -> Result<Vec<String>, SchemaError> {
        tracing::debug!(
            migration = %self.id,
            dialect = %compiler.dialect(),
            operations = self.operations.len(),
            "Compiling migration"
        );
        compiler.compile_all(&self.operations)
    }
}
