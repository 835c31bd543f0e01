//! Multi-threaded allocate/release tests

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use ctstraffic_idpool::config::PoolConfig;
use ctstraffic_idpool::{ConnectionId, ConnectionIdPool};

const THREADS: usize = 8;
const PER_THREAD: usize = 200;

fn shared_pool() -> Arc<ConnectionIdPool> {
    Arc::new(
        ConnectionIdPool::new(&PoolConfig {
            growth_rate: 10,
            verify_releases: Some(true),
            ..PoolConfig::default()
        })
        .unwrap(),
    )
}

#[test]
fn test_concurrent_allocations_are_unique() {
    let pool = shared_pool();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = pool.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let id = ConnectionId::generate();
                (0..PER_THREAD)
                    .map(|_| pool.allocate(id.as_bytes()).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let tasks: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    let pointers: HashSet<*const u8> = tasks.iter().map(|t| t.as_ptr()).collect();
    assert_eq!(pointers.len(), THREADS * PER_THREAD);
    assert_eq!(pool.in_use(), THREADS * PER_THREAD);
    assert_eq!(pool.capacity(), THREADS * PER_THREAD);

    for task in tasks {
        pool.release(task);
    }
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_concurrent_churn_keeps_identifiers_intact() {
    let pool = shared_pool();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                for _ in 0..PER_THREAD {
                    let ids: Vec<_> = (0..4).map(|_| ConnectionId::generate()).collect();
                    let buffers: Vec<_> = ids
                        .iter()
                        .map(|id| pool.checkout(id.as_bytes()).unwrap())
                        .collect();
                    for (id, buffer) in ids.iter().zip(&buffers) {
                        assert_eq!(ConnectionId::from_bytes(buffer), Some(*id));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = pool.stats();
    assert_eq!(stats.in_use, 0);
    assert_eq!(stats.allocations, (THREADS * PER_THREAD * 4) as u64);
    assert_eq!(stats.allocations, stats.releases);
    // Never more than 4 per thread outstanding
    assert!(stats.capacity <= THREADS * 4 + 10);
}
