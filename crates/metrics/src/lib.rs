//! Keel - Metrics
//!
//! Internal metrics collection for the storage engine's background tasks.
//!
//! # Overview
//!
//! This crate provides:
//! - Atomic metric counters updated from hot paths without locks
//! - A [`MetricsStore`] with per-component enablement, so individual
//!   subsystems can be instrumented on and off at runtime
//! - Provider traits so a reporter can collect snapshots without knowing
//!   the concrete component types
//!
//! # Design Principles
//!
//! - **Lock-free**: all metrics use atomic operations
//! - **Low overhead**: no allocations during metric updates, and a disabled
//!   component costs a single relaxed load
//! - **Optional**: components take `Option<Arc<MetricsStore>>`; a `None`
//!   store skips recording entirely
//!
//! # Metrics Handle Pattern
//!
//! Components own an `Arc<MetricsStore>` and expose a `metrics_handle()`
//! method returning a lightweight handle that implements the matching
//! provider trait. The handle stays valid after the component's run loop
//! consumes it.
//!
//! ```text
//! Component (owns Arc<MetricsStore>)
//!     │
//!     ├──► metrics_handle() → Handle (clones Arc, implements Provider trait)
//!     │
//!     └──► start() [consumes self, Arc keeps metrics alive]
//! ```

mod consumer;
mod store;

pub use consumer::{ConsumerMetrics, ConsumerMetricsProvider, ConsumerMetricsSnapshot};
pub use store::{MetricsComponent, MetricsStore};
