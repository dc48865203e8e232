use std::time::Duration;

/// How much detail the server includes in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorVerbosity {
    Terse,
    #[default]
    Default,
    Verbose,
}

/// Connection settings for a [`Session`](crate::session::Session).
///
/// All settings are frozen once the session connects; changing them on a
/// connected session fails with `CantChangeConnectionSettings`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) config: String,
    pub(crate) force_new: bool,
    pub(crate) connect_async: bool,
    pub(crate) connect_wait: Duration,
    pub(crate) error_verbosity: ErrorVerbosity,
}

impl SessionConfig {
    /// Create a config from a transport connection string.
    pub fn new(config: impl Into<String>) -> Self {
        Self {
            config: config.into(),
            force_new: false,
            connect_async: false,
            connect_wait: Duration::from_secs(15),
            error_verbosity: ErrorVerbosity::Default,
        }
    }

    /// Ask the transport for a brand new connection instead of a reused one.
    #[must_use]
    pub fn force_new(mut self, force_new: bool) -> Self {
        self.force_new = force_new;
        self
    }

    /// Connect without blocking; readiness is polled with a wait budget.
    #[must_use]
    pub fn connect_async(mut self, connect_async: bool) -> Self {
        self.connect_async = connect_async;
        self
    }

    /// Wait budget for the asynchronous connect poll loop.
    #[must_use]
    pub fn connect_wait(mut self, wait: Duration) -> Self {
        self.connect_wait = wait;
        self
    }

    #[must_use]
    pub fn error_verbosity(mut self, verbosity: ErrorVerbosity) -> Self {
        self.error_verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn connection_config(&self) -> &str {
        &self.config
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        self.connect_async
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("")
    }
}
