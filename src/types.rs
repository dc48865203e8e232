use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

/// Values that can appear in a result row or be bound as query parameters.
///
/// One enum covers both directions so helper code never needs to branch on
/// transport-specific types:
/// ```rust
/// use pg_fluent::PgValue;
///
/// let params = vec![
///     PgValue::Int(1),
///     PgValue::Text("alice".into()),
///     PgValue::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PgValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl PgValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let PgValue::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let PgValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let PgValue::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let PgValue::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S.%3f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let PgValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        if let PgValue::Json(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let PgValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

impl From<i64> for PgValue {
    fn from(value: i64) -> Self {
        PgValue::Int(value)
    }
}

impl From<i32> for PgValue {
    fn from(value: i32) -> Self {
        PgValue::Int(i64::from(value))
    }
}

impl From<f64> for PgValue {
    fn from(value: f64) -> Self {
        PgValue::Float(value)
    }
}

impl From<&str> for PgValue {
    fn from(value: &str) -> Self {
        PgValue::Text(value.to_string())
    }
}

impl From<String> for PgValue {
    fn from(value: String) -> Self {
        PgValue::Text(value)
    }
}

impl From<bool> for PgValue {
    fn from(value: bool) -> Self {
        PgValue::Bool(value)
    }
}

impl From<NaiveDateTime> for PgValue {
    fn from(value: NaiveDateTime) -> Self {
        PgValue::Timestamp(value)
    }
}

impl From<JsonValue> for PgValue {
    fn from(value: JsonValue) -> Self {
        PgValue::Json(value)
    }
}

impl From<Vec<u8>> for PgValue {
    fn from(value: Vec<u8>) -> Self {
        PgValue::Blob(value)
    }
}

/// A rendered SQL statement and its positional parameters bundled together.
///
/// The SQL text carries `?` placeholders in parameter order; conversion to
/// the transport's native `$N` syntax happens at the session boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    /// The SQL text
    pub sql: String,
    /// The parameters to be bound to the statement
    pub params: Vec<PgValue>,
}

impl SqlQuery {
    /// Create a new `SqlQuery` with the given SQL text and parameters.
    pub fn new(sql: impl Into<String>, params: Vec<PgValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Create a new `SqlQuery` with no parameters.
    pub fn without_params(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

impl From<&str> for SqlQuery {
    fn from(sql: &str) -> Self {
        SqlQuery::without_params(sql)
    }
}

impl From<String> for SqlQuery {
    fn from(sql: String) -> Self {
        SqlQuery::without_params(sql)
    }
}
