//! Pluggable backends
//!
//! A backend module implements any subset of the capability interfaces.
//! The registry maps backend type names to module factories, and the
//! dispatcher routes each action through the module configured for the
//! action's table, inside one transaction.

mod action;
mod capability;
mod dispatcher;
mod errors;
mod lookup;
mod module;
mod registry;
mod transaction;

pub use action::{
    ActionContext, ActionInput, ActionOutput, AggregateInput, AggregateOutput, CountInput,
    CountOutput, DeleteInput, DeleteOutput, GetInput, GetKey, GetOutput, InsertInput,
    InsertOutput, QueryInput, QueryOutput, StorageInput, StorageOperation, StorageOutput,
    UpdateInput, UpdateOutput,
};
pub use capability::{
    AggregateInterface, CapabilityKind, CapabilitySet, CountInterface, DeleteInterface,
    GetInterface, InsertInterface, QueryInterface, StorageInterface, UpdateInterface,
};
pub use dispatcher::ActionDispatcher;
pub use errors::{BackendError, BackendResult, DispatchError, DispatchResult};
pub use lookup::{find_by_key, find_unique, same_key};
pub use module::BackendModule;
pub use registry::{BackendModuleDescriptor, BackendRegistry, ModuleFactory};
pub use transaction::{NoOpTransaction, ScopedTransaction, Transaction};
