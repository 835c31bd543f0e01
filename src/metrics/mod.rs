//! Metrics and observability
//!
//! Pool counters for the hot path, exported to Prometheus on demand.

mod counters;
mod exporter;

pub use counters::{PoolCounters, PoolStats};
pub use exporter::init_metrics;
