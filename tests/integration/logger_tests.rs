//! Text logger tests

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ctstraffic_idpool::config::PoolConfig;
use ctstraffic_idpool::metrics::PoolStats;
use ctstraffic_idpool::util::{StatusFormat, StatusLine, TextLogger, BYTE_ORDER_MARK};
use ctstraffic_idpool::{ConnectionIdPool, PoolError};

fn read_log(path: &std::path::Path) -> String {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.starts_with(BYTE_ORDER_MARK));
    String::from_utf8(bytes[BYTE_ORDER_MARK.len()..].to_vec()).unwrap()
}

#[test]
fn test_concurrent_writes_are_not_interleaved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.log");
    let logger = Arc::new(TextLogger::create(&path, StatusFormat::Console).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let logger = logger.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    logger.log_message(&format!("thread {t} line {i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(logger.write_failures(), 0);
    drop(logger);

    let text = read_log(&path);
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 400);
    assert!(lines.iter().all(|l| l.starts_with("thread ")));
}

#[test]
fn test_status_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("status.csv");
    let logger = TextLogger::create(&path, StatusFormat::Csv).unwrap();

    logger.log_legend();
    logger.log_header();
    logger.log_status(&StatusLine {
        elapsed: Duration::from_secs(2),
        connections: 10,
        failures: 1,
        pool: PoolStats {
            in_use: 4,
            capacity: 10,
            pages: 1,
            ..PoolStats::default()
        },
    });
    drop(logger);

    assert_eq!(
        read_log(&path),
        "TimeSlice,Connections,Failures,InUse,Capacity,Pages\n2.000,10,1,4,10,1\n"
    );
}

#[test]
fn test_pool_reports_allocation_failure_to_logger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("errors.log");
    let logger = Arc::new(TextLogger::create(&path, StatusFormat::Console).unwrap());

    let pool = ConnectionIdPool::new(&PoolConfig {
        growth_rate: usize::MAX / 2,
        ..PoolConfig::default()
    })
    .unwrap()
    .with_logger(logger.clone());

    for attempt in 1..=2 {
        let result = pool.allocate(b"id");
        assert!(matches!(result, Err(PoolError::AllocationFailure { .. })));
        let stats = pool.stats();
        assert_eq!((stats.pages, stats.capacity, stats.in_use), (0, 0, 0));
        assert_eq!(stats.growth_events, 0);
        assert_eq!(stats.allocation_failures, attempt);
    }
    drop(pool);
    drop(logger);

    let text = read_log(&path);
    assert_eq!(text.matches("connection id pool could not grow").count(), 2);
}
