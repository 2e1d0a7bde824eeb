//! Boolean predicates over rows.
//!
//! A [`Predicate`] is evaluated in memory with [`Predicate::matches`] or
//! rendered as a parameterized SQL `WHERE` clause with [`Predicate::to_sql`].
//! Both follow SQL three-valued logic: a comparison involving NULL is
//! unknown, and only rows for which the predicate is definitely true match.

use serde::{Deserialize, Serialize};

use super::value::{Row, Value};
use crate::schema::Dialect;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ordering == Equal,
            CompareOp::Ne => ordering != Equal,
            CompareOp::Lt => ordering == Less,
            CompareOp::Le => ordering != Greater,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Ge => ordering != Less,
        }
    }
}

/// A boolean condition on a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Always true.
    True,
    /// Always false. Rendered as `1 = 0`.
    False,
    /// `column <op> value`.
    Compare {
        /// Column name.
        column: String,
        /// Operator.
        op: CompareOp,
        /// Right-hand side.
        value: Value,
    },
    /// `column IN (values)`. An empty list matches nothing.
    In {
        /// Column name.
        column: String,
        /// Candidate values.
        values: Vec<Value>,
    },
    /// `column IS NULL`.
    IsNull {
        /// Column name.
        column: String,
    },
    /// Conjunction. An empty conjunction is true.
    And {
        /// Operands.
        all: Vec<Predicate>,
    },
    /// Disjunction. An empty disjunction is false.
    Or {
        /// Operands.
        any: Vec<Predicate>,
    },
    /// Negation.
    Not {
        /// Operand.
        not: Box<Predicate>,
    },
}

impl Predicate {
    fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    /// `column <> value`
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    /// `column < value`
    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    /// `column <= value`
    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Le, value)
    }

    /// `column > value`
    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    /// `column >= value`
    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ge, value)
    }

    /// `column IN (values)`
    pub fn in_list<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `column IS NULL`
    pub fn is_null(column: impl Into<String>) -> Self {
        Predicate::IsNull {
            column: column.into(),
        }
    }

    /// Conjunction of all operands.
    pub fn all(operands: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And {
            all: operands.into_iter().collect(),
        }
    }

    /// Disjunction of all operands.
    pub fn any(operands: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or {
            any: operands.into_iter().collect(),
        }
    }

    /// `self AND other`
    pub fn and(self, other: Predicate) -> Self {
        Self::all([self, other])
    }

    /// `self OR other`
    pub fn or(self, other: Predicate) -> Self {
        Self::any([self, other])
    }

    /// `NOT self`
    pub fn negate(self) -> Self {
        Predicate::Not {
            not: Box::new(self),
        }
    }

    /// Column names referenced anywhere in the predicate, sorted and deduplicated.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::True | Predicate::False => {}
            Predicate::Compare { column, .. }
            | Predicate::In { column, .. }
            | Predicate::IsNull { column } => out.push(column),
            Predicate::And { all: operands } | Predicate::Or { any: operands } => {
                for p in operands {
                    p.collect_columns(out);
                }
            }
            Predicate::Not { not } => not.collect_columns(out),
        }
    }

    /// Returns true if the row satisfies the predicate.
    pub fn matches(&self, row: &Row) -> bool {
        self.eval(row) == Some(true)
    }

    /// Evaluates with three-valued logic; `None` is unknown.
    pub fn eval(&self, row: &Row) -> Option<bool> {
        match self {
            Predicate::True => Some(true),
            Predicate::False => Some(false),
            Predicate::Compare { column, op, value } => {
                let lhs = row.get(column).unwrap_or(&Value::Null);
                lhs.sql_cmp(value).map(|ordering| op.holds(ordering))
            }
            Predicate::In { column, values } => {
                let lhs = row.get(column).unwrap_or(&Value::Null);
                if values.is_empty() {
                    return Some(false);
                }
                if lhs.is_null() {
                    return None;
                }
                let mut unknown = false;
                for candidate in values {
                    match lhs.sql_cmp(candidate) {
                        Some(std::cmp::Ordering::Equal) => return Some(true),
                        None => unknown = true,
                        Some(_) => {}
                    }
                }
                if unknown { None } else { Some(false) }
            }
            Predicate::IsNull { column } => {
                Some(row.get(column).is_none_or(Value::is_null))
            }
            Predicate::And { all } => {
                let mut result = Some(true);
                for p in all {
                    match p.eval(row) {
                        Some(false) => return Some(false),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Predicate::Or { any } => {
                let mut result = Some(false);
                for p in any {
                    match p.eval(row) {
                        Some(true) => return Some(true),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
            Predicate::Not { not } => not.eval(row).map(|b| !b),
        }
    }

    /// Renders the predicate as a SQL boolean expression.
    ///
    /// Values are never inlined: each is pushed onto `params` and referenced
    /// by the dialect's positional placeholder.
    pub fn to_sql(&self, dialect: Dialect, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::True => "1 = 1".to_string(),
            Predicate::False => "1 = 0".to_string(),
            Predicate::Compare { column, op, value } => {
                params.push(value.clone());
                format!(
                    "{} {} {}",
                    dialect.quote(column),
                    op.sql(),
                    dialect.placeholder(params.len())
                )
            }
            Predicate::In { column, values } => {
                if values.is_empty() {
                    return "1 = 0".to_string();
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        dialect.placeholder(params.len())
                    })
                    .collect();
                format!("{} IN ({})", dialect.quote(column), placeholders.join(", "))
            }
            Predicate::IsNull { column } => format!("{} IS NULL", dialect.quote(column)),
            Predicate::And { all } => join(all, "AND", "1 = 1", dialect, params),
            Predicate::Or { any } => join(any, "OR", "1 = 0", dialect, params),
            Predicate::Not { not } => format!("NOT ({})", not.to_sql(dialect, params)),
        }
    }
}

fn join(
    operands: &[Predicate],
    keyword: &str,
    empty: &str,
    dialect: Dialect,
    params: &mut Vec<Value>,
) -> String {
    match operands {
        [] => empty.to_string(),
        [only] => only.to_sql(dialect, params),
        _ => operands
            .iter()
            .map(|p| format!("({})", p.to_sql(dialect, params)))
            .collect::<Vec<_>>()
            .join(&format!(" {} ", keyword)),
    }
}
