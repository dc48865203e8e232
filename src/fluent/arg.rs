use crate::types::PgValue;

use super::statement::Statement;

/// A raw SQL fragment with optional bound arguments.
///
/// Fragments pass through rendering untouched apart from placeholder
/// substitution, so they carry whatever the host database accepts:
/// ```rust
/// use pg_fluent::{Arg, RawSql};
///
/// let nested = RawSql::with_args("age > ?", vec![Arg::from(18)]);
/// # let _ = nested;
/// ```
#[derive(Debug, Clone)]
pub struct RawSql {
    pub(crate) sql: String,
    pub(crate) args: Vec<Arg>,
}

impl RawSql {
    /// Create a fragment with no arguments.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// Create a fragment with `?` placeholders and matching arguments.
    pub fn with_args(sql: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

/// An argument bound to a `?` placeholder.
///
/// Besides plain values, a whole statement or a raw fragment can stand in
/// for a placeholder; it is rendered recursively and its own parameters are
/// spliced into the final parameter list at the matching position.
#[derive(Debug, Clone)]
pub enum Arg {
    /// A plain parameter value.
    Value(PgValue),
    /// A nested statement, rendered as a parenthesized sub-select.
    Statement(Box<Statement>),
    /// A raw SQL fragment with its own arguments.
    Raw(RawSql),
}

impl From<PgValue> for Arg {
    fn from(value: PgValue) -> Self {
        Arg::Value(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Value(PgValue::Int(value))
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Value(PgValue::Int(i64::from(value)))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Value(PgValue::Float(value))
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Value(PgValue::Text(value.to_string()))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Value(PgValue::Text(value))
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Value(PgValue::Bool(value))
    }
}

impl From<Statement> for Arg {
    fn from(statement: Statement) -> Self {
        Arg::Statement(Box::new(statement))
    }
}

impl From<RawSql> for Arg {
    fn from(raw: RawSql) -> Self {
        Arg::Raw(raw)
    }
}
