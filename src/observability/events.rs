//! Observable events
//!
//! Every log line emitted by the crate carries one of these names in its
//! `event` field.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Engine configuration loaded
    ConfigLoaded,

    // Registry
    /// Backend type registered
    BackendRegistered,
    /// Backend type registered again, replacing the previous module
    BackendReplaced,

    // Dispatch
    /// Dispatch begins (metadata resolved)
    DispatchStart,
    /// Dispatch committed and returned
    DispatchComplete,
    /// Dispatch returned an error
    DispatchFailed,
    /// Requested capability absent on the module
    CapabilityMissing,

    // Transactions
    TransactionCommitted,
    TransactionRolledBack,
    /// Rollback raised an error (logged, never surfaced)
    RollbackFailed,
    TransactionCloseFailed,

    // Async execution
    /// Work handed to the blocking pool
    AsyncScheduled,
    /// Scheduled work finished
    AsyncComplete,
    /// Scheduled work panicked
    AsyncPanicked,

    // In-memory backend
    /// Records loaded into a memory table outside any transaction
    StoreSeeded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::BackendRegistered => "BACKEND_REGISTERED",
            Event::BackendReplaced => "BACKEND_REPLACED",

            Event::DispatchStart => "DISPATCH_BEGIN",
            Event::DispatchComplete => "DISPATCH_COMPLETE",
            Event::DispatchFailed => "DISPATCH_FAILED",
            Event::CapabilityMissing => "CAPABILITY_MISSING",

            Event::TransactionCommitted => "TRANSACTION_COMMIT",
            Event::TransactionRolledBack => "TRANSACTION_ROLLBACK",
            Event::RollbackFailed => "TRANSACTION_ROLLBACK_FAILED",
            Event::TransactionCloseFailed => "TRANSACTION_CLOSE_FAILED",

            Event::AsyncScheduled => "ASYNC_SCHEDULED",
            Event::AsyncComplete => "ASYNC_COMPLETE",
            Event::AsyncPanicked => "ASYNC_PANICKED",

            Event::StoreSeeded => "MEMORY_STORE_SEEDED",
        }
    }

    /// Returns true for events logged at warn level
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Event::BackendReplaced
                | Event::DispatchFailed
                | Event::CapabilityMissing
                | Event::RollbackFailed
                | Event::TransactionCloseFailed
                | Event::AsyncPanicked
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
