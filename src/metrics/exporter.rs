//! Prometheus metrics exporter
//!
//! HTTP endpoint for Prometheus scraping.

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;

use super::counters::PoolStats;
use crate::config::MetricsConfig;
use crate::pool::ConnectionIdPool;

/// Initialize the Prometheus metrics exporter for a pool
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(config: &MetricsConfig, pool: Arc<ConnectionIdPool>) -> Result<()> {
    // Register metric descriptions
    describe_counter!("idpool_allocations_total", "Connection id buffers handed out");
    describe_counter!("idpool_releases_total", "Connection id buffers returned");
    describe_counter!("idpool_growth_events_total", "Pages added to the pool");
    describe_counter!("idpool_allocation_failures_total", "Failed pool growth attempts");
    describe_gauge!("idpool_pages", "Pages owned by the pool");
    describe_gauge!("idpool_slots_capacity", "Total slots across all pages");
    describe_gauge!("idpool_slots_in_use", "Slots held by outstanding handles");

    // Build and install the Prometheus exporter
    PrometheusBuilder::new()
        .with_http_listener(config.bind_addr)
        .install()?;

    // Start background task to sync pool counters to metrics crate
    tokio::spawn(sync_metrics_task(pool));

    Ok(())
}

/// Background task that periodically pushes pool stats to the metrics crate
async fn sync_metrics_task(pool: Arc<ConnectionIdPool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    let mut last = PoolStats::default();

    loop {
        interval.tick().await;

        let stats = pool.stats();
        publish(&last, &stats);
        last = stats;
    }
}

/// Record counter deltas and current gauge values
fn publish(last: &PoolStats, stats: &PoolStats) {
    let deltas = [
        ("idpool_allocations_total", stats.allocations, last.allocations),
        ("idpool_releases_total", stats.releases, last.releases),
        ("idpool_growth_events_total", stats.growth_events, last.growth_events),
        (
            "idpool_allocation_failures_total",
            stats.allocation_failures,
            last.allocation_failures,
        ),
    ];
    for (name, now, before) in deltas {
        let delta = now.saturating_sub(before);
        if delta > 0 {
            counter!(name).increment(delta);
        }
    }

    gauge!("idpool_pages").set(stats.pages as f64);
    gauge!("idpool_slots_capacity").set(stats.capacity as f64);
    gauge!("idpool_slots_in_use").set(stats.in_use as f64);
}
