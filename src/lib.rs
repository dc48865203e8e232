//! Fluent SQL statement building and execution for PostgreSQL-style
//! transports.
//!
//! Three layers, usable separately:
//! - [`Statement`] accumulates clause data through chained mutators and
//!   renders once to SQL text plus ordered parameters.
//! - [`Session`] drives a host-provided [`Transport`] through connect,
//!   synchronous queries and the pipelined async protocol.
//! - [`ResultSet`]/[`Row`] wrap server results as typed records, decoding
//!   raw values eagerly or lazily through the oid registry.
//!
//! ```rust,ignore
//! let mut session = Session::new(transport, SessionConfig::new("host=localhost"));
//! let users = session
//!     .statement()
//!     .select(["id", "name"])?
//!     .from("users")?
//!     .where_("active = ?", [Arg::from(true)])?
//!     .fetch_all(None, None)
//!     .await?;
//! ```

pub mod datatype;
pub mod error;
pub mod fluent;
pub mod placeholders;
pub mod prelude;
pub mod results;
pub mod session;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::{
    ConfigError, ConnectionError, PgFluentError, QueryBuildError, QueryError, ResultError,
    TypeParseError,
};

pub use datatype::{JsonFileTypeCache, TypeCacheStore, TypeParser, TypeRegistry};
pub use fluent::{
    Arg, BoundStatement, Condition, ParamKey, RawSql, SelectItem, Statement, StatementKind,
};
pub use results::{ResultSet, Row, RowMode};
pub use session::{Session, SessionConfig, SessionState, Transport};
pub use types::{PgValue, SqlQuery};
