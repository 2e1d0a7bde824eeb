//! Conversions between [`Value`] and SQLite values.
//!
//! SQLite has no boolean, UUID or timestamp storage class. Booleans are
//! stored as `0`/`1`, UUIDs as hyphenated text and timestamps as RFC 3339
//! text, so they read back as [`Value::Int`] and [`Value::Text`].

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};

use crate::query::{Row, Value};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sql::Null),
            Value::Bool(b) => ToSqlOutput::Owned(Sql::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(Sql::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Uuid(u) => ToSqlOutput::Owned(Sql::Text(u.to_string())),
            Value::Timestamp(t) => ToSqlOutput::Owned(Sql::Text(t.to_rfc3339())),
        })
    }
}

/// Reads a column value.
pub(crate) fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Reads every column of the current result row.
pub(crate) fn read_row(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Row> {
    let mut out = Row::new();
    for (i, name) in columns.iter().enumerate() {
        out.set(name.as_str(), from_value_ref(row.get_ref(i)?));
    }
    Ok(out)
}
