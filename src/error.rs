use thiserror::Error;

/// Connection settings problems, raised before any I/O happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no connection configuration was provided")]
    NoConfig,

    #[error("connection settings can't be changed while connected")]
    CantChangeConnectionSettings,
}

/// Errors from the connection lifecycle and the async protocol sub-machine.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection failed (bad connection)")]
    BadConnection,

    #[error("session is closed")]
    SessionClosed,

    #[error("asynchronous connection error: {0}")]
    AsyncConnectFailed(String),

    #[error("asynchronous connection timeout after {elapsed_secs:.3} seconds ({budget_secs} seconds are configured)")]
    AsyncConnectTimeout { elapsed_secs: f64, budget_secs: u64 },

    #[error("cancellation of async query failed")]
    AsyncCancelFailed,

    #[error("there is already a running async query; drain its results first")]
    AsyncQueryAlreadySent,

    #[error("no async query was sent")]
    AsyncNoQueryWasSent,

    #[error("no async execute was sent")]
    AsyncNoExecuteWasSent,

    #[error("notices are not available on this connection")]
    NoticesUnavailable,
}

/// Statement construction and rendering errors.
///
/// Mutator-level checks (aliases, main table) surface at the mutating call;
/// whole-statement checks (alias resolution, ON conditions, placeholder
/// counts) surface when the statement is rendered.
#[derive(Debug, Error)]
pub enum QueryBuildError {
    #[error("table alias `{0}` is already registered")]
    DuplicateAlias(String),

    #[error("a statement or raw fragment used as a table or column must have an alias")]
    QueryableWithoutAlias,

    #[error("only one main table is allowed per statement")]
    MultipleMainTables,

    #[error("statement has no main table")]
    NoMainTable,

    #[error("no columns to select")]
    NoColumnsToSelect,

    #[error("INSERT statement has no values, rows or select source")]
    NoInsertData,

    #[error("UPDATE statement has no data to set")]
    NoDataToSet,

    #[error("row {row} is missing a value for column `{column}`")]
    MissingRowColumn { row: usize, column: String },

    #[error("join `{0}` has no ON condition")]
    MissingOnCondition(String),

    #[error("no table is registered under alias `{0}`")]
    UnknownAlias(String),

    #[error("`{condition}` has {placeholders} placeholders but {params} parameters")]
    PlaceholderMismatch {
        condition: String,
        placeholders: usize,
        params: usize,
    },

    #[error("statement was already executed and can no longer be changed")]
    CantMutateAfterExecute,
}

/// Errors reported by the server while executing a statement.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query failed: {error} (SQL: {sql})")]
    QueryFailed { sql: String, error: String },

    #[error("async query failed with SQLSTATE {sqlstate}: {message} (SQL: {sql})")]
    AsyncQueryFailed {
        sql: String,
        sqlstate: String,
        message: String,
    },
}

/// Errors from reading rows out of a result set.
#[derive(Debug, Error)]
pub enum ResultError {
    #[error("row has no column `{0}`")]
    NoColumn(String),

    #[error("result has no row {0}")]
    NoRow(usize),

    #[error("result handle was already freed")]
    AlreadyFreed,

    #[error("statement must be executed first")]
    NotExecuted,

    #[error("there is no other result for the async query (SQL: {0})")]
    NoOtherAsyncResult(String),
}

/// Raw-to-typed value conversion errors.
#[derive(Debug, Error)]
pub enum TypeParseError {
    #[error("unknown type oid {oid} for value `{value}`")]
    UnknownOid { oid: u32, value: String },

    #[error("can't parse value `{value}` as type `{type_name}` (oid {oid})")]
    UnparseableValue {
        oid: u32,
        type_name: String,
        value: String,
    },

    #[error("can't load data types from server: {0}")]
    TypesLoadFailed(String),
}

/// Umbrella error for everything the crate can fail with.
#[derive(Debug, Error)]
pub enum PgFluentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    QueryBuild(#[from] QueryBuildError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Result(#[from] ResultError),

    #[error(transparent)]
    TypeParse(#[from] TypeParseError),
}
