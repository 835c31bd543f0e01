//! Connection churn driver
//!
//! Worker threads stand in for the connection engine: each one generates an
//! identifier, takes a pool buffer for it, keeps up to `in_flight` of them
//! open, and releases the oldest as new ones arrive.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ChurnConfig;
use crate::connection::ConnectionId;
use crate::pool::{ConnectionIdPool, IdBuffer};
use crate::util::{StatusLine, TextLogger};

/// Poll granularity for the stop flag while reporting
const REPORT_POLL: Duration = Duration::from_millis(50);

/// Totals from a churn run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChurnReport {
    pub connections: u64,
    pub allocation_failures: u64,
    pub id_mismatches: u64,
    pub elapsed: Duration,
}

impl ChurnReport {
    /// Connection setups per second
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.connections as f64 / secs
        } else {
            0.0
        }
    }
}

#[derive(Default)]
struct Shared {
    connections: AtomicU64,
    failures: AtomicU64,
}

/// Run churn workers until `stop` is set or the configured duration elapses
///
/// Fails only if a worker thread cannot be spawned.
pub fn run(
    pool: &ConnectionIdPool,
    config: &ChurnConfig,
    stop: &AtomicBool,
    logger: Option<&TextLogger>,
) -> io::Result<ChurnReport> {
    let workers = config.effective_workers();
    let deadline = (config.duration_secs > 0)
        .then(|| Instant::now() + Duration::from_secs(config.duration_secs));
    let interval = Duration::from_secs(config.report_interval_secs.max(1));
    let shared = Shared::default();
    let started = Instant::now();

    info!(
        workers,
        in_flight = config.in_flight,
        duration_secs = config.duration_secs,
        "Starting connection churn"
    );
    if let Some(logger) = logger {
        logger.log_legend();
        logger.log_header();
    }

    let mismatches = thread::scope(|scope| -> io::Result<u64> {
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let shared = &shared;
            let spawned = thread::Builder::new()
                .name(format!("churn-{index}"))
                .spawn_scoped(scope, move || worker(pool, config, stop, deadline, shared));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Workers already running see the flag and exit before the scope ends.
                    stop.store(true, Ordering::Relaxed);
                    return Err(e);
                }
            }
        }

        let mut last_report = Instant::now();
        while !handles.iter().all(|h| h.is_finished()) {
            thread::sleep(REPORT_POLL);
            if last_report.elapsed() >= interval {
                last_report = Instant::now();
                report(pool, &shared, started, logger);
            }
        }

        Ok(handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|payload| std::panic::resume_unwind(payload)))
            .sum())
    })?;

    report(pool, &shared, started, logger);

    Ok(ChurnReport {
        connections: shared.connections.load(Ordering::Relaxed),
        allocation_failures: shared.failures.load(Ordering::Relaxed),
        id_mismatches: mismatches,
        elapsed: started.elapsed(),
    })
}

/// Returns the number of buffers that did not read back their identifier
fn worker(
    pool: &ConnectionIdPool,
    config: &ChurnConfig,
    stop: &AtomicBool,
    deadline: Option<Instant>,
    shared: &Shared,
) -> u64 {
    let hold = Duration::from_micros(config.hold_micros);
    let mut open: VecDeque<(ConnectionId, IdBuffer<'_>)> = VecDeque::with_capacity(config.in_flight);
    let mut mismatches = 0;

    while !stop.load(Ordering::Relaxed) && deadline.map_or(true, |d| Instant::now() < d) {
        if open.len() >= config.in_flight {
            if let Some((id, buffer)) = open.pop_front() {
                if ConnectionId::from_bytes(&buffer) != Some(id) {
                    warn!(conn_id = %id, "Connection id buffer was overwritten");
                    mismatches += 1;
                }
            }
        }

        let id = ConnectionId::generate();
        match pool.checkout(id.as_bytes()) {
            Ok(buffer) => {
                open.push_back((id, buffer));
                shared.connections.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                // No retry: drop this connection and move on.
                shared.failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, conn_id = %id, "Connection setup failed");
            }
        }

        if !hold.is_zero() {
            thread::sleep(hold);
        }
    }

    for (id, buffer) in open.drain(..) {
        if ConnectionId::from_bytes(&buffer) != Some(id) {
            mismatches += 1;
        }
    }
    debug!(mismatches, "Churn worker finished");
    mismatches
}

fn report(pool: &ConnectionIdPool, shared: &Shared, started: Instant, logger: Option<&TextLogger>) {
    let status = StatusLine {
        elapsed: started.elapsed(),
        connections: shared.connections.load(Ordering::Relaxed),
        failures: shared.failures.load(Ordering::Relaxed),
        pool: pool.stats(),
    };

    info!(
        elapsed_secs = status.elapsed.as_secs_f64(),
        connections = status.connections,
        failures = status.failures,
        in_use = status.pool.in_use,
        capacity = status.pool.capacity,
        pages = status.pool.pages,
        "Churn status"
    );
    if let Some(logger) = logger {
        logger.log_status(&status);
    }
}
