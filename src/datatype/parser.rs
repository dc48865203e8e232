use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

use crate::error::TypeParseError;
use crate::types::PgValue;

/// A custom raw-text parser registered for one type name.
pub type ParseFn = dyn Fn(&str) -> Result<PgValue, String> + Send + Sync;

/// Converts raw textual column values into [`PgValue`]s by type name.
///
/// Covers the common scalar types out of the box; anything else either gets
/// a custom parser registered per type name or fails with the offending oid
/// and raw value:
/// ```rust
/// use pg_fluent::{PgValue, TypeParser};
///
/// let mut parser = TypeParser::new();
/// parser.register("citext", |raw| Ok(PgValue::Text(raw.to_lowercase())));
/// ```
pub struct TypeParser {
    custom: HashMap<String, Arc<ParseFn>>,
}

impl TypeParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
        }
    }

    /// Register a parser for a type name; it takes precedence over the
    /// builtin table and makes otherwise-unknown types parseable.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        parse: impl Fn(&str) -> Result<PgValue, String> + Send + Sync + 'static,
    ) -> &mut Self {
        self.custom.insert(type_name.into(), Arc::new(parse));
        self
    }

    /// Parse one raw value.
    ///
    /// # Errors
    /// [`TypeParseError::UnparseableValue`] when neither a custom nor a
    /// builtin parser accepts the value.
    pub fn parse(
        &self,
        oid: u32,
        type_name: &str,
        raw: &str,
    ) -> Result<PgValue, TypeParseError> {
        if let Some(custom) = self.custom.get(type_name) {
            return custom(raw).map_err(|_| unparseable(oid, type_name, raw));
        }
        parse_builtin(oid, type_name, raw)
    }
}

impl Default for TypeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeParser")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn unparseable(oid: u32, type_name: &str, raw: &str) -> TypeParseError {
    TypeParseError::UnparseableValue {
        oid,
        type_name: type_name.to_string(),
        value: raw.to_string(),
    }
}

fn parse_builtin(oid: u32, type_name: &str, raw: &str) -> Result<PgValue, TypeParseError> {
    match type_name {
        "int2" | "int4" | "int8" | "oid" => raw
            .parse::<i64>()
            .map(PgValue::Int)
            .map_err(|_| unparseable(oid, type_name, raw)),
        "float4" | "float8" | "numeric" => raw
            .parse::<f64>()
            .map(PgValue::Float)
            .map_err(|_| unparseable(oid, type_name, raw)),
        "bool" => match raw {
            "t" | "true" => Ok(PgValue::Bool(true)),
            "f" | "false" => Ok(PgValue::Bool(false)),
            _ => Err(unparseable(oid, type_name, raw)),
        },
        "text" | "varchar" | "bpchar" | "char" | "name" | "uuid" => {
            Ok(PgValue::Text(raw.to_string()))
        }
        "json" | "jsonb" => serde_json::from_str::<JsonValue>(raw)
            .map(PgValue::Json)
            .map_err(|_| unparseable(oid, type_name, raw)),
        "timestamp" | "timestamptz" => parse_timestamp(raw)
            .map(PgValue::Timestamp)
            .ok_or_else(|| unparseable(oid, type_name, raw)),
        "date" => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(PgValue::Timestamp)
            .ok_or_else(|| unparseable(oid, type_name, raw)),
        "bytea" => parse_bytea(raw)
            .map(PgValue::Blob)
            .ok_or_else(|| unparseable(oid, type_name, raw)),
        _ => Err(unparseable(oid, type_name, raw)),
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    // timestamptz arrives with an offset suffix like "+00"
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok()
}

/// Decode the `\x`-prefixed hex form of bytea output.
fn parse_bytea(raw: &str) -> Option<Vec<u8>> {
    let hex = raw.strip_prefix("\\x")?;
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    let mut chars = hex.as_bytes().chunks_exact(2);
    for pair in &mut chars {
        let text = std::str::from_utf8(pair).ok()?;
        bytes.push(u8::from_str_radix(text, 16).ok()?);
    }
    Some(bytes)
}
