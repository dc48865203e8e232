// Server type handling: the oid registry, its persisted cache, and raw
// value parsing.

mod cache;
mod parser;
mod registry;

pub use cache::{JsonFileTypeCache, TypeCacheError, TypeCacheStore};
pub use parser::{ParseFn, TypeParser};
pub use registry::{TypeRegistry, fingerprint};

use std::fmt;
use std::sync::Arc;

use crate::error::TypeParseError;
use crate::types::PgValue;

/// Everything a row needs to turn raw text into a typed value: the oid
/// registry for the name lookup and the parser for the conversion.
pub(crate) struct DecodeContext {
    pub(crate) parser: Arc<TypeParser>,
    pub(crate) registry: TypeRegistry,
}

impl DecodeContext {
    pub(crate) fn decode(&self, oid: u32, raw: &str) -> Result<PgValue, TypeParseError> {
        let type_name = self
            .registry
            .lookup(oid)
            .ok_or_else(|| TypeParseError::UnknownOid {
                oid,
                value: raw.to_string(),
            })?;
        self.parser.parse(oid, &type_name, raw)
    }
}

impl fmt::Debug for DecodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeContext").finish_non_exhaustive()
    }
}
