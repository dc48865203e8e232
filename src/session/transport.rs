use async_trait::async_trait;

use crate::error::ConnectionError;
use crate::types::PgValue;

use super::config::ErrorVerbosity;

/// One non-blocking connect progress step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPoll {
    /// The transport needs the socket to become readable.
    Reading,
    /// The transport needs the socket to become writable.
    Writing,
    /// The connection is established.
    Ok,
    /// The connection attempt failed.
    Failed,
}

/// Flags passed through to the transport's connect call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectFlags {
    pub force_new: bool,
    pub nonblocking: bool,
}

/// An error status carried by a retrieved result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub sqlstate: String,
    pub message: String,
}

/// One server result: row data, counts and column metadata.
///
/// Implementations release any server-side resources on drop; the owning
/// result set guarantees the handle is dropped exactly once.
pub trait ResultHandle: Send {
    fn row_count(&self) -> usize;

    fn affected_rows(&self) -> usize;

    fn column_names(&self) -> &[String];

    fn column_type_oid(&self, column: usize) -> Option<u32>;

    /// Raw textual value; outer `None` is out of range, inner `None` is SQL
    /// NULL.
    fn raw_value(&self, row: usize, column: usize) -> Option<Option<&str>>;

    /// The error status of the result, if the server rejected the statement.
    fn error(&self) -> Option<ServerError>;
}

/// The native client session underneath a [`Session`](crate::session::Session).
///
/// The session layer owns all protocol sequencing and never touches sockets;
/// it only calls these primitives and interprets their return codes. SQL
/// arrives with placeholders already converted to the native `$N` syntax.
#[async_trait]
pub trait Transport: Send {
    /// Start a connection attempt. With `nonblocking` set the call returns
    /// immediately and progress is driven by `poll_connect`.
    async fn connect(&mut self, config: &str, flags: ConnectFlags)
    -> Result<(), ConnectionError>;

    fn poll_connect(&mut self) -> ConnectPoll;

    /// Block until the underlying descriptor is readable.
    async fn wait_readable(&mut self) -> Result<(), ConnectionError>;

    /// Block until the underlying descriptor is writable.
    async fn wait_writable(&mut self) -> Result<(), ConnectionError>;

    /// True once the server reports the connection unusable.
    fn is_bad(&self) -> bool;

    fn set_error_verbosity(&mut self, verbosity: ErrorVerbosity);

    /// Send a statement and block until its result is available. `Err`
    /// carries the server error text.
    async fn send_query(
        &mut self,
        sql: &str,
        params: &[PgValue],
    ) -> Result<Box<dyn ResultHandle>, String>;

    /// Send a statement without waiting for results; `false` when the
    /// transport refuses because results are still pending.
    async fn send_query_async(&mut self, sql: &str, params: &[PgValue]) -> bool;

    /// Next pending result of an async statement; `None` once drained.
    async fn next_result(&mut self) -> Option<Box<dyn ResultHandle>>;

    /// Ask the server to cancel the in-flight statement.
    fn cancel(&mut self) -> bool;

    /// Accumulated notice messages, `None` when the transport can't track
    /// them.
    fn notices(&mut self, clear: bool) -> Option<Vec<String>>;

    /// Last error text reported by the native client.
    fn last_error(&self) -> String;

    /// Release the native session; must be safe to call more than once.
    fn close(&mut self);
}
