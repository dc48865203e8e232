use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::datatype::{DecodeContext, TypeCacheStore, TypeParser, TypeRegistry, fingerprint};
use crate::error::{
    ConfigError, ConnectionError, PgFluentError, QueryError, ResultError, TypeParseError,
};
use crate::fluent::{BoundStatement, Statement};
use crate::placeholders::to_dollar_placeholders;
use crate::results::{ResultSet, RowMode};
use crate::types::{PgValue, SqlQuery};

use super::config::{ErrorVerbosity, SessionConfig};
use super::transaction::Transaction;
use super::transport::{ConnectFlags, ConnectPoll, ResultHandle, Transport};

const TYPE_LOAD_QUERY: &str = "SELECT oid, typname FROM pg_catalog.pg_type";

/// Connection lifecycle of a session. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

/// The in-flight async statement, if any.
#[derive(Debug, Clone)]
pub enum PendingAsync {
    /// Sent via `async_query`; results are fetched one by one.
    Query(SqlQuery),
    /// Sent via `async_execute`; results are drained without materializing.
    Execute(String),
}

type LifecycleHook = Box<dyn Fn() -> Result<(), PgFluentError> + Send + Sync>;
type QueryHook = Box<dyn Fn(&SqlQuery, Option<Duration>) -> Result<(), PgFluentError> + Send + Sync>;

/// One logical database connection over a [`Transport`].
///
/// Issues synchronous and pipelined asynchronous statements, wraps results
/// with the session's row mode and type configuration, and fires registered
/// hooks at connect, close and query time. Methods take `&mut self`: a
/// session is single-caller, concurrency happens across sessions.
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    state: SessionState,
    pending_async: Option<PendingAsync>,
    row_mode: RowMode,
    parser: Arc<TypeParser>,
    registry: TypeRegistry,
    cache_store: Option<Arc<dyn TypeCacheStore>>,
    pub(super) tx_depth: u32,
    on_connect: Vec<LifecycleHook>,
    on_close: Vec<LifecycleHook>,
    on_query: Vec<QueryHook>,
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("pending_async", &self.pending_async)
            .field("row_mode", &self.row_mode)
            .field("tx_depth", &self.tx_depth)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: SessionState::Disconnected,
            pending_async: None,
            row_mode: RowMode::default(),
            parser: Arc::new(TypeParser::new()),
            registry: TypeRegistry::new(),
            cache_store: None,
            tx_depth: 0,
            on_connect: Vec::new(),
            on_close: Vec::new(),
            on_query: Vec::new(),
        }
    }

    /// Row materialization mode for every result this session creates.
    #[must_use]
    pub fn with_row_mode(mut self, mode: RowMode) -> Self {
        self.row_mode = mode;
        self
    }

    /// Value parser applied to every result this session creates.
    #[must_use]
    pub fn with_type_parser(mut self, parser: TypeParser) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// Share an oid registry with other sessions pointed at the same
    /// database.
    #[must_use]
    pub fn with_type_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Persist the oid registry through the given store.
    #[must_use]
    pub fn with_type_cache(mut self, store: Arc<dyn TypeCacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    #[must_use]
    pub fn connection_config(&self) -> &str {
        &self.config.config
    }

    #[must_use]
    pub fn type_registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The underlying transport, e.g. for host-level inspection.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport. The session's state
    /// machine is not aware of anything done through this.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn settings_guard(&self) -> Result<(), PgFluentError> {
        if self.state == SessionState::Disconnected {
            Ok(())
        } else {
            Err(ConfigError::CantChangeConnectionSettings.into())
        }
    }

    pub fn set_connection_config(
        &mut self,
        config: impl Into<String>,
    ) -> Result<&mut Self, PgFluentError> {
        self.settings_guard()?;
        self.config.config = config.into();
        Ok(self)
    }

    pub fn set_force_new(&mut self, force_new: bool) -> Result<&mut Self, PgFluentError> {
        self.settings_guard()?;
        self.config.force_new = force_new;
        Ok(self)
    }

    pub fn set_connect_async(&mut self, connect_async: bool) -> Result<&mut Self, PgFluentError> {
        self.settings_guard()?;
        self.config.connect_async = connect_async;
        Ok(self)
    }

    pub fn set_connect_wait(&mut self, wait: Duration) -> Result<&mut Self, PgFluentError> {
        self.settings_guard()?;
        self.config.connect_wait = wait;
        Ok(self)
    }

    pub fn set_error_verbosity(
        &mut self,
        verbosity: ErrorVerbosity,
    ) -> Result<&mut Self, PgFluentError> {
        self.settings_guard()?;
        self.config.error_verbosity = verbosity;
        Ok(self)
    }

    /// Register a hook fired after the session connects, in registration
    /// order. A hook error propagates and skips the remaining hooks.
    pub fn add_on_connect(
        &mut self,
        hook: impl Fn() -> Result<(), PgFluentError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.on_connect.push(Box::new(hook));
        self
    }

    /// Register a hook fired before the transport is released by `close`.
    pub fn add_on_close(
        &mut self,
        hook: impl Fn() -> Result<(), PgFluentError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.on_close.push(Box::new(hook));
        self
    }

    /// Register a hook fired for every statement; synchronous statements
    /// also report their wall time.
    pub fn add_on_query(
        &mut self,
        hook: impl Fn(&SqlQuery, Option<Duration>) -> Result<(), PgFluentError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.on_query.push(Box::new(hook));
        self
    }

    /// Connect to the server; a no-op when already connected.
    ///
    /// In asynchronous mode the transport's connect progress is polled until
    /// ready, delegating every wait to the transport's readiness primitives
    /// and failing once the configured wait budget is exceeded.
    ///
    /// # Errors
    /// `NoConfig` without settings, `ConnectionFailed`/`BadConnection` from
    /// the transport, `AsyncConnectFailed`/`AsyncConnectTimeout` from the
    /// poll loop, or an error raised by an on-connect hook.
    pub async fn connect(&mut self) -> Result<(), PgFluentError> {
        match self.state {
            SessionState::Connected => return Ok(()),
            SessionState::Closed => return Err(ConnectionError::SessionClosed.into()),
            SessionState::Disconnected | SessionState::Connecting => {}
        }
        if self.config.config.is_empty() {
            return Err(ConfigError::NoConfig.into());
        }

        self.state = SessionState::Connecting;
        let flags = ConnectFlags {
            force_new: self.config.force_new,
            nonblocking: self.config.connect_async,
        };
        if let Err(err) = self.transport.connect(&self.config.config, flags).await {
            self.state = SessionState::Disconnected;
            return Err(err.into());
        }

        if self.config.connect_async {
            if let Err(err) = self.poll_until_connected().await {
                self.state = SessionState::Disconnected;
                return Err(err);
            }
        } else if self.transport.is_bad() {
            self.state = SessionState::Disconnected;
            return Err(ConnectionError::BadConnection.into());
        }

        if self.config.error_verbosity != ErrorVerbosity::Default {
            self.transport.set_error_verbosity(self.config.error_verbosity);
        }
        self.state = SessionState::Connected;
        debug!(config = %self.config.config, "session connected");
        self.fire_on_connect()
    }

    async fn poll_until_connected(&mut self) -> Result<(), PgFluentError> {
        let budget = self.config.connect_wait;
        let start = Instant::now();
        loop {
            match self.transport.poll_connect() {
                ConnectPoll::Reading => self.transport.wait_readable().await?,
                ConnectPoll::Writing => self.transport.wait_writable().await?,
                ConnectPoll::Failed => {
                    return Err(
                        ConnectionError::AsyncConnectFailed(self.transport.last_error()).into(),
                    );
                }
                ConnectPoll::Ok => return Ok(()),
            }
            let elapsed = start.elapsed();
            if elapsed > budget {
                return Err(ConnectionError::AsyncConnectTimeout {
                    elapsed_secs: elapsed.as_secs_f64(),
                    budget_secs: budget.as_secs(),
                }
                .into());
            }
        }
    }

    async fn ensure_connected(&mut self) -> Result<(), PgFluentError> {
        match self.state {
            SessionState::Connected => Ok(()),
            SessionState::Closed => Err(ConnectionError::SessionClosed.into()),
            SessionState::Disconnected | SessionState::Connecting => self.connect().await,
        }
    }

    /// True when the connection is up and usable, connecting first if the
    /// session never connected.
    pub async fn ping(&mut self) -> Result<bool, PgFluentError> {
        self.ensure_connected().await?;
        Ok(!self.transport.is_bad())
    }

    /// Run a statement and wrap its result.
    pub async fn query(
        &mut self,
        sql: &str,
        params: Vec<PgValue>,
    ) -> Result<ResultSet, PgFluentError> {
        self.query_sql(SqlQuery::new(sql, params)).await
    }

    /// Run an already rendered statement and wrap its result.
    ///
    /// # Errors
    /// `AsyncQueryAlreadySent` while async results are pending, and
    /// `QueryFailed` with the statement and server error text when the
    /// server rejects it.
    pub async fn query_sql(&mut self, query: SqlQuery) -> Result<ResultSet, PgFluentError> {
        self.ensure_connected().await?;
        if self.pending_async.is_some() {
            return Err(ConnectionError::AsyncQueryAlreadySent.into());
        }

        let native = to_dollar_placeholders(&query.sql);
        let start = (!self.on_query.is_empty()).then(Instant::now);
        let handle = self
            .transport
            .send_query(native.as_ref(), &query.params)
            .await
            .map_err(|error| QueryError::QueryFailed {
                sql: query.sql.clone(),
                error,
            })?;
        if let Some(start) = start {
            self.fire_on_query(&query, Some(start.elapsed()))?;
        }
        self.create_result(handle).await
    }

    /// Run a statement for its side effect, without materializing a result.
    pub async fn execute(&mut self, sql: &str) -> Result<(), PgFluentError> {
        self.ensure_connected().await?;
        if self.pending_async.is_some() {
            return Err(ConnectionError::AsyncQueryAlreadySent.into());
        }

        let start = (!self.on_query.is_empty()).then(Instant::now);
        self.transport
            .send_query(sql, &[])
            .await
            .map_err(|error| QueryError::QueryFailed {
                sql: sql.to_string(),
                error,
            })?;
        if let Some(start) = start {
            let query = SqlQuery::without_params(sql);
            self.fire_on_query(&query, Some(start.elapsed()))?;
        }
        Ok(())
    }

    /// Send a statement without blocking for results.
    pub async fn async_query(
        &mut self,
        sql: &str,
        params: Vec<PgValue>,
    ) -> Result<(), PgFluentError> {
        self.async_query_sql(SqlQuery::new(sql, params)).await
    }

    /// Send an already rendered statement without blocking for results.
    ///
    /// The session holds at most one in-flight async statement; the pending
    /// one must be drained (or cancelled) first.
    ///
    /// # Errors
    /// `AsyncQueryAlreadySent` when results are still pending or the
    /// transport refuses the send.
    pub async fn async_query_sql(&mut self, query: SqlQuery) -> Result<(), PgFluentError> {
        self.ensure_connected().await?;
        if self.pending_async.is_some() {
            return Err(ConnectionError::AsyncQueryAlreadySent.into());
        }

        let native = to_dollar_placeholders(&query.sql).into_owned();
        if !self.transport.send_query_async(&native, &query.params).await {
            return Err(ConnectionError::AsyncQueryAlreadySent.into());
        }
        self.fire_on_query(&query, None)?;
        self.pending_async = Some(PendingAsync::Query(query));
        Ok(())
    }

    /// Send a statement whose results will be drained without
    /// materialization (see [`complete_async_execute`](Self::complete_async_execute)).
    pub async fn async_execute(&mut self, sql: &str) -> Result<(), PgFluentError> {
        self.ensure_connected().await?;
        if self.pending_async.is_some() {
            return Err(ConnectionError::AsyncQueryAlreadySent.into());
        }

        if !self.transport.send_query_async(sql, &[]).await {
            return Err(ConnectionError::AsyncQueryAlreadySent.into());
        }
        let query = SqlQuery::without_params(sql);
        self.fire_on_query(&query, None)?;
        self.pending_async = Some(PendingAsync::Execute(query.sql));
        Ok(())
    }

    /// The in-flight async statement, if any.
    #[must_use]
    pub fn pending_async(&self) -> Option<&PendingAsync> {
        self.pending_async.as_ref()
    }

    /// Retrieve the next pending result of the in-flight async query.
    ///
    /// Once the transport reports no more pending results the async state
    /// resets and `NoOtherAsyncResult` is returned. An error result aborts
    /// the drain but keeps already retrieved results valid.
    pub async fn next_async_result(&mut self) -> Result<ResultSet, PgFluentError> {
        let sql = match &self.pending_async {
            Some(PendingAsync::Query(query)) => query.sql.clone(),
            Some(PendingAsync::Execute(_)) | None => {
                return Err(ConnectionError::AsyncNoQueryWasSent.into());
            }
        };

        match self.transport.next_result().await {
            None => {
                self.pending_async = None;
                Err(ResultError::NoOtherAsyncResult(sql).into())
            }
            Some(handle) => {
                if let Some(err) = handle.error() {
                    return Err(QueryError::AsyncQueryFailed {
                        sql,
                        sqlstate: err.sqlstate,
                        message: err.message,
                    }
                    .into());
                }
                self.create_result(handle).await
            }
        }
    }

    /// Drain every pending result of an `async_execute`, checking each for
    /// an error status.
    pub async fn complete_async_execute(&mut self) -> Result<(), PgFluentError> {
        let sql = match &self.pending_async {
            Some(PendingAsync::Execute(sql)) => sql.clone(),
            Some(PendingAsync::Query(_)) | None => {
                return Err(ConnectionError::AsyncNoExecuteWasSent.into());
            }
        };

        while let Some(handle) = self.transport.next_result().await {
            if let Some(err) = handle.error() {
                return Err(QueryError::AsyncQueryFailed {
                    sql,
                    sqlstate: err.sqlstate,
                    message: err.message,
                }
                .into());
            }
        }
        self.pending_async = None;
        Ok(())
    }

    /// Cancel the in-flight async statement and reset the async state.
    ///
    /// # Errors
    /// `AsyncNoQueryWasSent` with nothing in flight, `AsyncCancelFailed`
    /// when the transport can't cancel.
    pub fn cancel_async_query(&mut self) -> Result<(), PgFluentError> {
        if self.pending_async.is_none() {
            return Err(ConnectionError::AsyncNoQueryWasSent.into());
        }
        if !self.transport.cancel() {
            return Err(ConnectionError::AsyncCancelFailed.into());
        }
        self.pending_async = None;
        Ok(())
    }

    /// Accumulated notice messages from the server.
    pub fn notices(&mut self, clear_after_read: bool) -> Result<Vec<String>, PgFluentError> {
        self.transport
            .notices(clear_after_read)
            .ok_or_else(|| ConnectionError::NoticesUnavailable.into())
    }

    /// Close the session: fire on-close hooks while still connected, then
    /// release the transport unconditionally. Idempotent.
    pub fn close(&mut self) -> Result<(), PgFluentError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        let hooks = if self.state == SessionState::Connected {
            self.fire_on_close()
        } else {
            Ok(())
        };
        self.transport.close();
        self.state = SessionState::Closed;
        self.pending_async = None;
        debug!("session closed");
        hooks
    }

    /// Begin building a statement bound to this session.
    pub fn statement(&mut self) -> BoundStatement<'_, T> {
        BoundStatement::new(self, Statement::new())
    }

    /// Bind an existing statement to this session.
    pub fn bind(&mut self, statement: Statement) -> BoundStatement<'_, T> {
        BoundStatement::new(self, statement)
    }

    /// The session-scoped transaction handle.
    pub fn transaction(&mut self) -> Transaction<'_, T> {
        Transaction::new(self)
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.tx_depth > 0
    }

    async fn create_result(
        &mut self,
        handle: Box<dyn ResultHandle>,
    ) -> Result<ResultSet, PgFluentError> {
        let oids: Vec<u32> = (0..handle.column_names().len())
            .filter_map(|i| handle.column_type_oid(i))
            .collect();
        self.ensure_types(&oids).await?;
        let ctx = Arc::new(DecodeContext {
            parser: self.parser.clone(),
            registry: self.registry.clone(),
        });
        Ok(ResultSet::new(handle, ctx, self.row_mode))
    }

    /// Make sure the registry covers the given oids: in-process map first,
    /// then the persisted cache (once per fingerprint), then a live catalog
    /// query whose result repopulates both.
    async fn ensure_types(&mut self, oids: &[u32]) -> Result<(), PgFluentError> {
        if oids.is_empty() || self.registry.contains_all(oids.iter().copied()) {
            return Ok(());
        }

        let fp = fingerprint(&self.config.config);
        self.registry.bind(&fp);

        if !self.registry.store_checked() {
            self.registry.mark_store_checked();
            if let Some(store) = &self.cache_store {
                match store.load(&fp) {
                    Ok(Some(types)) => self.registry.replace(types),
                    Ok(None) => {}
                    Err(err) => {
                        warn!(error = %err, "type cache load failed, falling back to catalog query");
                    }
                }
            }
        }
        if self.registry.contains_all(oids.iter().copied()) {
            return Ok(());
        }

        let handle = self
            .transport
            .send_query(TYPE_LOAD_QUERY, &[])
            .await
            .map_err(TypeParseError::TypesLoadFailed)?;
        let mut types = HashMap::with_capacity(handle.row_count());
        for row in 0..handle.row_count() {
            let oid = handle
                .raw_value(row, 0)
                .flatten()
                .and_then(|value| value.parse::<u32>().ok());
            let name = handle.raw_value(row, 1).flatten();
            if let (Some(oid), Some(name)) = (oid, name) {
                types.insert(oid, name.to_string());
            }
        }
        debug!(count = types.len(), "loaded data types from catalog");

        if let Some(store) = &self.cache_store {
            if let Err(err) = store.store(&fp, &types) {
                warn!(error = %err, "type cache store failed");
            }
        }
        self.registry.replace(types);
        Ok(())
    }

    fn fire_on_connect(&self) -> Result<(), PgFluentError> {
        for hook in &self.on_connect {
            hook()?;
        }
        Ok(())
    }

    fn fire_on_close(&self) -> Result<(), PgFluentError> {
        for hook in &self.on_close {
            hook()?;
        }
        Ok(())
    }

    fn fire_on_query(&self, query: &SqlQuery, elapsed: Option<Duration>) -> Result<(), PgFluentError> {
        for hook in &self.on_query {
            hook(query, elapsed)?;
        }
        Ok(())
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            self.transport.close();
        }
    }
}
