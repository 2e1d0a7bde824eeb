//! Cross-dialect schema operation translation.

use std::sync::Arc;

use super::Dialect;
use super::ddl::DdlCompiler;
use super::mapping::TypeMappingTable;
use super::operation::{AddColumn, AlterColumn, ColumnDef, CreateTable, SchemaOperation};
use crate::error::SchemaError;

/// Rewrites the column types inside schema operations using a [`TypeMappingTable`].
///
/// Only column types change. Names, nullability, defaults, keys and indexes
/// pass through untouched, and operations without column types are returned
/// as-is. Translation never fails: types without a rule keep their text.
///
/// ```
/// use orbis_persistence::schema::{
///     AddColumn, ColumnDef, SchemaOperation, SchemaTranslator, TypeMappingTable,
/// };
///
/// let translator = SchemaTranslator::new(TypeMappingTable::sqlserver_to_postgres());
/// let op = SchemaOperation::AddColumn(AddColumn {
///     table: "invoices".into(),
///     column: ColumnDef::new("paid", "bit").with_default("0"),
/// });
///
/// let SchemaOperation::AddColumn(added) = translator.translate(op) else { unreachable!() };
/// assert_eq!(added.column.column_type, "boolean");
/// assert_eq!(added.column.default_sql.as_deref(), Some("0"));
/// ```
#[derive(Debug, Clone)]
pub struct SchemaTranslator {
    table: Arc<TypeMappingTable>,
}

impl SchemaTranslator {
    /// Creates a translator over the given table.
    pub fn new(table: Arc<TypeMappingTable>) -> Self {
        Self { table }
    }

    /// Creates a translator for a dialect pair using the built-in tables.
    pub fn for_dialects(source: Dialect, target: Dialect) -> Result<Self, SchemaError> {
        Ok(Self::new(TypeMappingTable::for_dialects(source, target)?))
    }

    /// The mapping table in use.
    pub fn table(&self) -> &TypeMappingTable {
        &self.table
    }

    /// Translates one operation.
    pub fn translate(&self, op: SchemaOperation) -> SchemaOperation {
        match op {
            SchemaOperation::CreateTable(create) => SchemaOperation::CreateTable(CreateTable {
                columns: create
                    .columns
                    .into_iter()
                    .map(|c| self.translate_column(c))
                    .collect(),
                ..create
            }),
            SchemaOperation::AddColumn(AddColumn { table, column }) => {
                SchemaOperation::AddColumn(AddColumn {
                    table,
                    column: self.translate_column(column),
                })
            }
            SchemaOperation::AlterColumn(AlterColumn { table, column }) => {
                SchemaOperation::AlterColumn(AlterColumn {
                    table,
                    column: self.translate_column(column),
                })
            }
            other @ (SchemaOperation::DropTable { .. }
            | SchemaOperation::DropColumn { .. }
            | SchemaOperation::RenameColumn { .. }
            | SchemaOperation::CreateIndex { .. }
            | SchemaOperation::DropIndex { .. }
            | SchemaOperation::Sql { .. }) => other,
        }
    }

    /// Translates operations in order.
    pub fn translate_all(&self, ops: Vec<SchemaOperation>) -> Vec<SchemaOperation> {
        ops.into_iter().map(|op| self.translate(op)).collect()
    }

    /// Translates one column's type.
    pub fn translate_column(&self, column: ColumnDef) -> ColumnDef {
        let column_type = self.table.map_type(&column.column_type).into_owned();
        ColumnDef {
            column_type,
            ..column
        }
    }
}

/// A [`DdlCompiler`] that translates each operation before handing it to `inner`.
///
/// This is how a migration authored in the source dialect produces DDL for
/// another engine:
///
/// ```
/// use orbis_persistence::schema::{
///     ColumnDef, CreateTable, DdlCompiler, Dialect, PostgresDdl, TranslatingCompiler,
/// };
///
/// let compiler = TranslatingCompiler::new(Dialect::SqlServer, PostgresDdl).unwrap();
/// let op = CreateTable::new("customers")
///     .column(ColumnDef::new("id", "uniqueidentifier"))
///     .column(ColumnDef::new("name", "nvarchar(120)"))
///     .into();
///
/// let ddl = compiler.compile(&op).unwrap();
/// assert!(ddl[0].contains("\"id\" uuid NOT NULL"));
/// assert!(ddl[0].contains("\"name\" character varying(120) NOT NULL"));
/// ```
#[derive(Debug, Clone)]
pub struct TranslatingCompiler<C> {
    translator: SchemaTranslator,
    inner: C,
}

impl<C: DdlCompiler> TranslatingCompiler<C> {
    /// Wraps `inner`, translating from `source` to `inner.dialect()`.
    pub fn new(source: Dialect, inner: C) -> Result<Self, SchemaError> {
        let translator = SchemaTranslator::for_dialects(source, inner.dialect())?;
        Ok(Self { translator, inner })
    }

    /// Wraps `inner` with an explicit translator.
    pub fn with_translator(translator: SchemaTranslator, inner: C) -> Self {
        Self { translator, inner }
    }

    /// The translator in use.
    pub fn translator(&self) -> &SchemaTranslator {
        &self.translator
    }
}

impl<C: DdlCompiler> DdlCompiler for TranslatingCompiler<C> {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn compile(&self, op: &SchemaOperation) -> Result<Vec<String>, SchemaError> {
        let translated = self.translator.translate(op.clone());
        self.inner.compile(&translated)
    }
}
