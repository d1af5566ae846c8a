//! In-memory backend
//!
//! A complete reference backend: every capability, staged transactional
//! writes, and a blob area for the Storage capability.

mod module;
mod store;
mod transaction;

pub use module::{MemoryBackendModule, KEY_GENERATION_PROPERTY, MEMORY_BACKEND_TYPE};
pub use store::{MemoryRecordStore, StagedWrite};
pub use transaction::MemoryTransaction;
