use crate::error::PgFluentError;

use super::session::Session;
use super::transport::Transport;

/// The session-scoped transaction handle.
///
/// Depth tracking lives in the session, so the handle can be re-acquired at
/// any time; nesting uses savepoints named by depth.
pub struct Transaction<'a, T: Transport> {
    session: &'a mut Session<T>,
}

impl<'a, T: Transport> Transaction<'a, T> {
    pub(crate) fn new(session: &'a mut Session<T>) -> Self {
        Self { session }
    }

    /// Open a transaction, or a savepoint when one is already open.
    pub async fn begin(&mut self) -> Result<(), PgFluentError> {
        let depth = self.session.tx_depth;
        if depth == 0 {
            self.session.execute("BEGIN").await?;
        } else {
            self.session
                .execute(&format!("SAVEPOINT pgf_sp_{depth}"))
                .await?;
        }
        self.session.tx_depth = depth + 1;
        Ok(())
    }

    /// Commit the innermost level: releases the savepoint when nested,
    /// commits the transaction at depth one.
    pub async fn commit(&mut self) -> Result<(), PgFluentError> {
        let depth = self.session.tx_depth;
        if depth <= 1 {
            self.session.execute("COMMIT").await?;
            self.session.tx_depth = 0;
        } else {
            self.session
                .execute(&format!("RELEASE SAVEPOINT pgf_sp_{}", depth - 1))
                .await?;
            self.session.tx_depth = depth - 1;
        }
        Ok(())
    }

    /// Roll back the innermost level: back to the savepoint when nested,
    /// the whole transaction at depth one.
    pub async fn rollback(&mut self) -> Result<(), PgFluentError> {
        let depth = self.session.tx_depth;
        if depth <= 1 {
            self.session.execute("ROLLBACK").await?;
            self.session.tx_depth = 0;
        } else {
            self.session
                .execute(&format!("ROLLBACK TO SAVEPOINT pgf_sp_{}", depth - 1))
                .await?;
            self.session.tx_depth = depth - 1;
        }
        Ok(())
    }

    /// Current nesting depth; zero outside a transaction.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.session.tx_depth
    }
}
