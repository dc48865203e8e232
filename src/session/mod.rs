// Connection lifecycle and the async execution protocol: configuration, the
// transport boundary, the session state machine, and transactions.

mod config;
mod session;
mod transaction;
mod transport;

pub use config::{ErrorVerbosity, SessionConfig};
pub use session::{PendingAsync, Session, SessionState};
pub use transaction::Transaction;
pub use transport::{ConnectFlags, ConnectPoll, ResultHandle, ServerError, Transport};
