//! DDL compilers for each supported dialect.
//!
//! A [`DdlCompiler`] renders a [`SchemaOperation`] as SQL statements. It does
//! not translate column types: it writes `column_type` exactly as given. Wrap
//! it in a [`TranslatingCompiler`](super::TranslatingCompiler) to compile a
//! migration authored in another dialect.

use super::Dialect;
use super::operation::{AddColumn, AlterColumn, ColumnDef, CreateTable, IndexDef, SchemaOperation};
use crate::error::SchemaError;

/// Renders schema operations as dialect-specific DDL.
pub trait DdlCompiler: Send + Sync {
    /// The dialect this compiler emits.
    fn dialect(&self) -> Dialect;

    /// Compiles one operation into one or more statements.
    fn compile(&self, op: &SchemaOperation) -> Result<Vec<String>, SchemaError>;

    /// Compiles operations in order.
    fn compile_all(&self, ops: &[SchemaOperation]) -> Result<Vec<String>, SchemaError> {
        let mut statements = Vec::new();
        for op in ops {
            statements.extend(self.compile(op)?);
        }
        Ok(statements)
    }
}

impl<C: DdlCompiler + ?Sized> DdlCompiler for Box<C> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn compile(&self, op: &SchemaOperation) -> Result<Vec<String>, SchemaError> {
        (**self).compile(op)
    }
}

/// Returns the compiler for a dialect.
pub fn compiler_for(dialect: Dialect) -> Box<dyn DdlCompiler> {
    match dialect {
        Dialect::SqlServer => Box::new(SqlServerDdl),
        Dialect::Postgres => Box::new(PostgresDdl),
        Dialect::Sqlite => Box::new(SqliteDdl),
    }
}

/// SQL Server DDL.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDdl;

/// PostgreSQL DDL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDdl;

/// SQLite DDL.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDdl;

impl DdlCompiler for SqlServerDdl {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn compile(&self, op: &SchemaOperation) -> Result<Vec<String>, SchemaError> {
        let d = Dialect::SqlServer;
        match op {
            SchemaOperation::CreateTable(create) => create_table(d, create),
            SchemaOperation::AddColumn(AddColumn { table, column }) => Ok(vec![format!(
                "ALTER TABLE {} ADD {}",
                d.quote(table),
                column_sql(d, column)
            )]),
            SchemaOperation::AlterColumn(AlterColumn { table, column }) => {
                // SQL Server keeps defaults in named constraints; only type and nullability are altered here.
                Ok(vec![format!(
                    "ALTER TABLE {} ALTER COLUMN {} {} {}",
                    d.quote(table),
                    d.quote(&column.name),
                    column.column_type,
                    null_sql(column.nullable)
                )])
            }
            SchemaOperation::RenameColumn { table, from, to } => Ok(vec![format!(
                "EXEC sp_rename N'{}.{}', N'{}', N'COLUMN'",
                escape_literal(&d.quote(table)),
                escape_literal(&d.quote(from)),
                escape_literal(to)
            )]),
            SchemaOperation::DropIndex { table, name } => Ok(vec![format!(
                "DROP INDEX {} ON {}",
                d.quote(name),
                d.quote(table)
            )]),
            other => common(d, other),
        }
    }
}

impl DdlCompiler for PostgresDdl {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn compile(&self, op: &SchemaOperation) -> Result<Vec<String>, SchemaError> {
        let d = Dialect::Postgres;
        match op {
            SchemaOperation::CreateTable(create) => create_table(d, create),
            SchemaOperation::AddColumn(AddColumn { table, column }) => Ok(vec![format!(
                "ALTER TABLE {} ADD COLUMN {}",
                d.quote(table),
                column_sql(d, column)
            )]),
            SchemaOperation::AlterColumn(AlterColumn { table, column }) => {
                let prefix = format!(
                    "ALTER TABLE {} ALTER COLUMN {}",
                    d.quote(table),
                    d.quote(&column.name)
                );
                let nullability = if column.nullable {
                    "DROP NOT NULL"
                } else {
                    "SET NOT NULL"
                };
                let default = match &column.default_sql {
                    Some(expr) => format!("SET DEFAULT {}", expr),
                    None => "DROP DEFAULT".to_string(),
                };
                Ok(vec![
                    format!("{} TYPE {}", prefix, column.column_type),
                    format!("{} {}", prefix, nullability),
                    format!("{} {}", prefix, default),
                ])
            }
            SchemaOperation::RenameColumn { table, from, to } => Ok(vec![rename_column(d, table, from, to)]),
            SchemaOperation::DropIndex { name, .. } => {
                Ok(vec![format!("DROP INDEX {}", d.quote(name))])
            }
            other => common(d, other),
        }
    }
}

impl DdlCompiler for SqliteDdl {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn compile(&self, op: &SchemaOperation) -> Result<Vec<String>, SchemaError> {
        let d = Dialect::Sqlite;
        match op {
            SchemaOperation::CreateTable(create) => create_table(d, create),
            SchemaOperation::AddColumn(AddColumn { table, column }) => Ok(vec![format!(
                "ALTER TABLE {} ADD COLUMN {}",
                d.quote(table),
                column_sql(d, column)
            )]),
            SchemaOperation::AlterColumn(_) => Err(SchemaError::UnsupportedOperation {
                dialect: d,
                operation: op.kind(),
            }),
            SchemaOperation::RenameColumn { table, from, to } => Ok(vec![rename_column(d, table, from, to)]),
            SchemaOperation::DropIndex { name, .. } => {
                Ok(vec![format!("DROP INDEX {}", d.quote(name))])
            }
            other => common(d, other),
        }
    }
}

/// Operations rendered the same way in every dialect.
fn common(d: Dialect, op: &SchemaOperation) -> Result<Vec<String>, SchemaError> {
    match op {
        SchemaOperation::DropTable { name } => Ok(vec![format!("DROP TABLE {}", d.quote(name))]),
        SchemaOperation::DropColumn { table, column } => Ok(vec![format!(
            "ALTER TABLE {} DROP COLUMN {}",
            d.quote(table),
            d.quote(column)
        )]),
        SchemaOperation::CreateIndex { table, index } => Ok(vec![create_index(d, table, index)]),
        SchemaOperation::Sql { sql } => Ok(vec![sql.clone()]),
        other => Err(SchemaError::UnsupportedOperation {
            dialect: d,
            operation: other.kind(),
        }),
    }
}

fn create_table(d: Dialect, create: &CreateTable) -> Result<Vec<String>, SchemaError> {
    if create.columns.is_empty() {
        return Err(SchemaError::InvalidOperation {
            operation: "create table",
            table: create.name.clone(),
            message: "a table needs at least one column".to_string(),
        });
    }

    for key in &create.primary_key {
        if !create.columns.iter().any(|c| &c.name == key) {
            return Err(SchemaError::InvalidOperation {
                operation: "create table",
                table: create.name.clone(),
                message: format!("primary key column '{}' is not defined", key),
            });
        }
    }

    let mut lines: Vec<String> = create
        .columns
        .iter()
        .map(|c| format!("    {}", column_sql(d, c)))
        .collect();

    if !create.primary_key.is_empty() {
        let keys: Vec<String> = create.primary_key.iter().map(|k| d.quote(k)).collect();
        lines.push(format!(
            "    CONSTRAINT {} PRIMARY KEY ({})",
            d.quote(&format!("pk_{}", create.name)),
            keys.join(", ")
        ));
    }

    let mut statements = vec![format!(
        "CREATE TABLE {} (\n{}\n)",
        d.quote(&create.name),
        lines.join(",\n")
    )];

    for index in &create.indexes {
        statements.push(create_index(d, &create.name, index));
    }

    Ok(statements)
}

fn create_index(d: Dialect, table: &str, index: &IndexDef) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    let columns: Vec<String> = index.columns.iter().map(|c| d.quote(c)).collect();
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        unique,
        d.quote(&index.name),
        d.quote(table),
        columns.join(", ")
    )
}

fn rename_column(d: Dialect, table: &str, from: &str, to: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        d.quote(table),
        d.quote(from),
        d.quote(to)
    )
}

fn column_sql(d: Dialect, column: &ColumnDef) -> String {
    let mut sql = format!("{} {}", d.quote(&column.name), column.column_type);
    if d == Dialect::SqlServer || !column.nullable {
        sql.push(' ');
        sql.push_str(null_sql(column.nullable));
    }
    if let Some(default) = &column.default_sql {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    sql
}

fn null_sql(nullable: bool) -> &'static str {
    if nullable { "NULL" } else { "NOT NULL" }
}

fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}
