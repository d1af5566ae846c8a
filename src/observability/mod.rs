//! Observability
//!
//! Structured logging goes through `tracing` with `target:
//! "backplane::<area>"` and an `event` field naming one of [`Event`].
//! The crate never installs a subscriber; applications and tests choose
//! their own.
//!
//! Dispatch outcomes are also counted in [`DispatchMetrics`].

mod events;
mod metrics;

pub use events::Event;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
