//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::datatype::{JsonFileTypeCache, TypeCacheStore, TypeParser, TypeRegistry};
pub use crate::error::{
    ConfigError, ConnectionError, PgFluentError, QueryBuildError, QueryError, ResultError,
    TypeParseError,
};
pub use crate::fluent::{
    Arg, BoundStatement, ColumnExpr, CombineKind, Condition, JoinKind, ParamKey, RawSql,
    SelectItem, Statement, StatementKind, TableSource,
};
pub use crate::results::{ResultSet, Row, RowMode};
pub use crate::session::{
    ConnectFlags, ConnectPoll, ErrorVerbosity, PendingAsync, ResultHandle, ServerError, Session,
    SessionConfig, SessionState, Transaction, Transport,
};
pub use crate::types::{PgValue, SqlQuery};
