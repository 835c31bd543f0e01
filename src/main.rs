//! Connection churn against the identifier pool - Entry Point
//!
//! Builds the process-wide pool, then drives connection setups through it
//! until the configured duration elapses or a shutdown signal arrives.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use ctstraffic_idpool::util::{StatusFormat, TextLogger};
use ctstraffic_idpool::{churn, Config, ConnectionIdPool, VERSION};

/// Application entry point
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let explicit_path = std::env::args().nth(1).map(PathBuf::from);
    let config_path = explicit_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    // Load configuration; without an explicit path a missing file means defaults
    let config = if explicit_path.is_some() || config_path.exists() {
        Config::load(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        Config::default()
    };

    // Initialize tracing/logging
    ctstraffic_idpool::util::init_tracing(&config.logging)?;

    info!(
        version = VERSION,
        config_path = ?config_path,
        "Starting connection id pool churn"
    );

    let text_logger = match &config.logging.error_log {
        Some(path) => {
            let format = StatusFormat::from_config(&config.logging.status_format)
                .unwrap_or(StatusFormat::Console);
            let logger = TextLogger::create(path, format)
                .with_context(|| format!("Failed to open text log {:?}", path))?;
            info!(path = ?logger.path(), csv = logger.is_csv(), "Text log opened");
            Some(Arc::new(logger))
        }
        None => None,
    };

    // The one pool for this process
    let mut pool = ConnectionIdPool::new(&config.pool).context("Failed to create pool")?;
    if let Some(logger) = &text_logger {
        pool = pool.with_logger(logger.clone());
    }
    let pool = Arc::new(pool);

    info!(
        slot_size = pool.slot_size(),
        growth_rate = pool.growth_rate(),
        "Connection id pool ready"
    );

    // Initialize metrics if enabled
    if config.metrics.enabled {
        ctstraffic_idpool::metrics::init_metrics(&config.metrics, pool.clone())?;
        info!(
            bind_addr = %config.metrics.bind_addr,
            "Metrics endpoint started"
        );
    }

    let stop = Arc::new(AtomicBool::new(false));
    let mut churn_task = {
        let pool = pool.clone();
        let stop = stop.clone();
        let churn_config = config.churn.clone();
        let logger = text_logger.clone();
        tokio::task::spawn_blocking(move || {
            churn::run(&pool, &churn_config, &stop, logger.as_deref())
        })
    };

    // Run churn with graceful shutdown
    let outcome = tokio::select! {
        result = &mut churn_task => result,
        _ = shutdown_signal() => {
            info!("Shutdown signal received, releasing outstanding buffers...");
            stop.store(true, Ordering::Relaxed);
            churn_task.await
        }
    };

    let report = match outcome.context("Churn task panicked")? {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Churn failed to start");
            return Err(e).context("Failed to start churn workers");
        }
    };

    let stats = pool.stats();
    info!(
        connections = report.connections,
        rate_per_sec = report.rate(),
        elapsed_secs = report.elapsed.as_secs_f64(),
        pages = stats.pages,
        capacity = stats.capacity,
        growth_events = stats.growth_events,
        "Churn finished"
    );
    if report.allocation_failures > 0 || report.id_mismatches > 0 {
        warn!(
            allocation_failures = report.allocation_failures,
            id_mismatches = report.id_mismatches,
            "Churn saw errors"
        );
    }

    info!("Stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
