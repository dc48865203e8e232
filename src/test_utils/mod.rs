//! Scripted in-memory transport for exercising sessions without a server.
//!
//! Enabled with the `test-utils` feature. The mock records every statement
//! it receives, plays back queued results, and answers the type catalog
//! query from a configurable oid table.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::error::ConnectionError;
use crate::session::{
    ConnectFlags, ConnectPoll, ErrorVerbosity, ResultHandle, ServerError, Transport,
};
use crate::types::PgValue;

/// A scripted server result.
#[derive(Debug, Clone, Default)]
pub struct MockResult {
    names: Vec<String>,
    oids: Vec<u32>,
    rows: Vec<Vec<Option<String>>>,
    affected: usize,
    error: Option<ServerError>,
}

impl MockResult {
    /// A result with columns `(name, type oid)` and raw textual rows.
    pub fn new(columns: &[(&str, u32)], rows: Vec<Vec<Option<&str>>>) -> Self {
        Self {
            names: columns.iter().map(|(name, _)| (*name).to_string()).collect(),
            oids: columns.iter().map(|(_, oid)| *oid).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|v| v.map(str::to_string)).collect())
                .collect(),
            affected: 0,
            error: None,
        }
    }

    /// A row-less command result reporting affected rows.
    #[must_use]
    pub fn command(affected: usize) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    /// A result carrying a server error status.
    #[must_use]
    pub fn server_error(sqlstate: &str, message: &str) -> Self {
        Self {
            error: Some(ServerError {
                sqlstate: sqlstate.to_string(),
                message: message.to_string(),
            }),
            ..Self::default()
        }
    }
}

impl ResultHandle for MockResult {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn affected_rows(&self) -> usize {
        if self.affected > 0 {
            self.affected
        } else {
            self.rows.len()
        }
    }

    fn column_names(&self) -> &[String] {
        &self.names
    }

    fn column_type_oid(&self, column: usize) -> Option<u32> {
        self.oids.get(column).copied()
    }

    fn raw_value(&self, row: usize, column: usize) -> Option<Option<&str>> {
        self.rows.get(row)?.get(column).map(|v| v.as_deref())
    }

    fn error(&self) -> Option<ServerError> {
        self.error.clone()
    }
}

/// Common type oids, enough for the builtin parser table.
#[must_use]
pub fn default_catalog() -> Vec<(u32, String)> {
    [
        (16, "bool"),
        (17, "bytea"),
        (20, "int8"),
        (21, "int2"),
        (23, "int4"),
        (25, "text"),
        (114, "json"),
        (700, "float4"),
        (701, "float8"),
        (1043, "varchar"),
        (1082, "date"),
        (1114, "timestamp"),
        (1184, "timestamptz"),
        (1700, "numeric"),
        (3802, "jsonb"),
    ]
    .into_iter()
    .map(|(oid, name)| (oid, name.to_string()))
    .collect()
}

/// Scripted transport: configure the fields, then watch `sent`.
pub struct MockTransport {
    /// Fail the next connect with this error text.
    pub fail_connect: Option<String>,
    /// Report the connection as bad right after connect.
    pub bad: bool,
    /// Script for `poll_connect`; exhausted polls report `Ok`.
    pub poll_script: VecDeque<ConnectPoll>,
    /// Queued responses for `send_query`, one per call.
    pub responses: VecDeque<Result<MockResult, String>>,
    /// Whether `send_query_async` accepts the next statement.
    pub async_accept: bool,
    /// Queued results handed out by `next_result`.
    pub async_results: VecDeque<MockResult>,
    /// Whether `cancel` succeeds.
    pub cancel_ok: bool,
    /// Notice messages, `None` to report notices as unavailable.
    pub notice_list: Option<Vec<String>>,
    /// The oid table answering the catalog query.
    pub catalog: Vec<(u32, String)>,
    /// Every statement sent, with its parameters.
    pub sent: Vec<(String, Vec<PgValue>)>,
    /// Verbosity the session pushed down, if any.
    pub verbosity: Option<ErrorVerbosity>,
    /// Error text for `last_error`.
    pub error_text: String,
    pub connected: bool,
    pub closed: bool,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fail_connect: None,
            bad: false,
            poll_script: VecDeque::new(),
            responses: VecDeque::new(),
            async_accept: true,
            async_results: VecDeque::new(),
            cancel_ok: true,
            notice_list: Some(Vec::new()),
            catalog: default_catalog(),
            sent: Vec::new(),
            verbosity: None,
            error_text: String::from("mock error"),
            connected: false,
            closed: false,
        }
    }

    /// Queue a successful `send_query` response.
    pub fn push_response(&mut self, result: MockResult) {
        self.responses.push_back(Ok(result));
    }

    /// Queue a failing `send_query` response with server error text.
    pub fn push_failure(&mut self, error: &str) {
        self.responses.push_back(Err(error.to_string()));
    }

    /// Queue a pending async result.
    pub fn push_async_result(&mut self, result: MockResult) {
        self.async_results.push_back(result);
    }

    fn catalog_result(&self) -> MockResult {
        let rows: Vec<Vec<Option<String>>> = self
            .catalog
            .iter()
            .map(|(oid, name)| vec![Some(oid.to_string()), Some(name.clone())])
            .collect();
        MockResult {
            names: vec![String::from("oid"), String::from("typname")],
            oids: vec![0, 0],
            rows,
            affected: 0,
            error: None,
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(
        &mut self,
        _config: &str,
        _flags: ConnectFlags,
    ) -> Result<(), ConnectionError> {
        if let Some(error) = self.fail_connect.take() {
            return Err(ConnectionError::ConnectionFailed(error));
        }
        self.connected = true;
        Ok(())
    }

    fn poll_connect(&mut self) -> ConnectPoll {
        self.poll_script.pop_front().unwrap_or(ConnectPoll::Ok)
    }

    async fn wait_readable(&mut self) -> Result<(), ConnectionError> {
        Ok(())
    }

    async fn wait_writable(&mut self) -> Result<(), ConnectionError> {
        Ok(())
    }

    fn is_bad(&self) -> bool {
        self.bad
    }

    fn set_error_verbosity(&mut self, verbosity: ErrorVerbosity) {
        self.verbosity = Some(verbosity);
    }

    async fn send_query(
        &mut self,
        sql: &str,
        params: &[PgValue],
    ) -> Result<Box<dyn ResultHandle>, String> {
        self.sent.push((sql.to_string(), params.to_vec()));
        if sql.starts_with("SELECT oid, typname") {
            return Ok(Box::new(self.catalog_result()));
        }
        match self.responses.pop_front() {
            Some(Ok(result)) => Ok(Box::new(result)),
            Some(Err(error)) => Err(error),
            None => Ok(Box::new(MockResult::command(0))),
        }
    }

    async fn send_query_async(&mut self, sql: &str, params: &[PgValue]) -> bool {
        self.sent.push((sql.to_string(), params.to_vec()));
        self.async_accept
    }

    async fn next_result(&mut self) -> Option<Box<dyn ResultHandle>> {
        self.async_results
            .pop_front()
            .map(|result| Box::new(result) as Box<dyn ResultHandle>)
    }

    fn cancel(&mut self) -> bool {
        if self.cancel_ok {
            self.async_results.clear();
        }
        self.cancel_ok
    }

    fn notices(&mut self, clear: bool) -> Option<Vec<String>> {
        let notices = self.notice_list.clone()?;
        if clear {
            if let Some(list) = self.notice_list.as_mut() {
                list.clear();
            }
        }
        Some(notices)
    }

    fn last_error(&self) -> String {
        self.error_text.clone()
    }

    fn close(&mut self) {
        self.connected = false;
        self.closed = true;
    }
}
