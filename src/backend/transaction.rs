//! # Transactions
//!
//! Each dispatched action runs inside exactly one transaction opened by the
//! backend module. `ScopedTransaction` owns it for the duration of the call
//! and guarantees `close` runs on every exit path, unwinding included.

use std::any::Any;

use tracing::{debug, warn};

use crate::observability::Event;

use super::errors::BackendResult;

/// Backend-defined unit of work
///
/// All methods default to no-ops so backends without transactional
/// semantics implement nothing.
pub trait Transaction: Send {
    fn commit(&mut self) -> BackendResult<()> {
        Ok(())
    }

    fn rollback(&mut self) -> BackendResult<()> {
        Ok(())
    }

    /// Release resources. Called exactly once, after commit or rollback.
    fn close(&mut self) -> BackendResult<()> {
        Ok(())
    }

    /// Access to the concrete type for backends that stage work in their
    /// own transaction
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}

/// Transaction for backends with nothing to commit
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpTransaction;

impl Transaction for NoOpTransaction {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Committed,
    RolledBack,
    Closed,
}

/// Guard owning an open transaction
///
/// Dropping an uncommitted guard rolls back before closing.
pub struct ScopedTransaction {
    inner: Box<dyn Transaction>,
    state: State,
    backend_type: String,
    table: String,
}

impl ScopedTransaction {
    pub fn new(
        inner: Box<dyn Transaction>,
        backend_type: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            state: State::Open,
            backend_type: backend_type.into(),
            table: table.into(),
        }
    }

    pub fn transaction(&mut self) -> &mut dyn Transaction {
        self.inner.as_mut()
    }

    pub fn commit(&mut self) -> BackendResult<()> {
        self.inner.commit()?;
        self.state = State::Committed;
        debug!(
            target: "backplane::transaction",
            event = Event::TransactionCommitted.as_str(),
            backend = %self.backend_type,
            table = %self.table,
            "transaction committed"
        );
        Ok(())
    }

    /// Roll back; a failure is logged and never replaces the caller's error.
    ///
    /// Returns false if the backend's rollback failed.
    pub fn rollback(&mut self) -> bool {
        if self.state != State::Open {
            return true;
        }
        self.state = State::RolledBack;
        match self.inner.rollback() {
            Ok(()) => {
                debug!(
                    target: "backplane::transaction",
                    event = Event::TransactionRolledBack.as_str(),
                    backend = %self.backend_type,
                    table = %self.table,
                    "transaction rolled back"
                );
                true
            }
            Err(e) => {
                warn!(
                    target: "backplane::transaction",
                    event = Event::RollbackFailed.as_str(),
                    backend = %self.backend_type,
                    table = %self.table,
                    error = %e,
                    "rollback failed"
                );
                false
            }
        }
    }

    /// Close now instead of at drop, surfacing the close error
    pub fn close(mut self) -> BackendResult<()> {
        self.finish()
    }

    fn finish(&mut self) -> BackendResult<()> {
        if self.state == State::Closed {
            return Ok(());
        }
        if self.state == State::Open {
            let _ = self.rollback();
        }
        self.state = State::Closed;
        self.inner.close()
    }
}

impl Drop for ScopedTransaction {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!(
                target: "backplane::transaction",
                event = Event::TransactionCloseFailed.as_str(),
                backend = %self.backend_type,
                table = %self.table,
                error = %e,
                "transaction close failed"
            );
        }
    }
}
