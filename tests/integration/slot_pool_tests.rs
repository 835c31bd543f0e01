//! Slot pool allocation/release tests

use std::collections::HashSet;

use ctstraffic_idpool::config::PoolConfig;
use ctstraffic_idpool::pool::page_size;
use ctstraffic_idpool::{ConnectionId, ConnectionIdPool, TaskHandle, CONNECTION_ID_LENGTH};

/// Growth rate small enough to hit growth boundaries quickly
const TEST_GROWTH_RATE: usize = 10;

fn pool_with_growth(growth_rate: usize) -> ConnectionIdPool {
    ConnectionIdPool::new(&PoolConfig {
        growth_rate,
        verify_releases: Some(true),
        ..PoolConfig::default()
    })
    .unwrap()
}

fn default_pool() -> ConnectionIdPool {
    ConnectionIdPool::new(&PoolConfig {
        verify_releases: Some(true),
        ..PoolConfig::default()
    })
    .unwrap()
}

fn allocate_many(pool: &ConnectionIdPool, count: usize) -> Vec<TaskHandle> {
    let id = ConnectionId::generate();
    (0..count).map(|_| pool.allocate(id.as_bytes()).unwrap()).collect()
}

fn release_all(pool: &ConnectionIdPool, tasks: Vec<TaskHandle>) {
    for task in tasks {
        pool.release(task);
    }
}

fn assert_shape(tasks: &[TaskHandle]) {
    for task in tasks {
        assert_eq!(task.buffer_length(), CONNECTION_ID_LENGTH);
        assert_eq!(task.buffer_offset(), 0);
        assert!(!task.as_ptr().is_null());
    }
}

fn assert_unique(tasks: &[TaskHandle]) {
    let pointers: HashSet<*const u8> = tasks.iter().map(|t| t.as_ptr()).collect();
    assert_eq!(pointers.len(), tasks.len(), "the same buffer was handed to two tasks");
}

fn buffers_per_page() -> usize {
    page_size() / CONNECTION_ID_LENGTH
}

#[test]
fn test_request_and_return_one_connection() {
    let pool = pool_with_growth(TEST_GROWTH_RATE);
    let id = ConnectionId::generate();

    let first = pool.allocate(id.as_bytes()).unwrap();
    assert_shape(std::slice::from_ref(&first));
    assert_eq!(ConnectionId::from_bytes(pool.buffer(&first)), Some(id));
    let first_ptr = first.as_ptr();
    pool.release(first);

    let second = pool.allocate(id.as_bytes()).unwrap();
    assert_eq!(second.as_ptr(), first_ptr);
    pool.release(second);
}

#[test]
fn test_request_and_return_all_connections_reuses_lifo() {
    let pool = pool_with_growth(TEST_GROWTH_RATE);

    let first = allocate_many(&pool, TEST_GROWTH_RATE);
    assert_shape(&first);
    let first_ptrs: Vec<_> = first.iter().map(|t| t.as_ptr()).collect();

    // Release in allocation order
    release_all(&pool, first);

    let second = allocate_many(&pool, TEST_GROWTH_RATE);
    let second_ptrs: Vec<_> = second.iter().map(|t| t.as_ptr()).collect();

    let reversed: Vec<_> = first_ptrs.into_iter().rev().collect();
    assert_eq!(second_ptrs, reversed);
    assert_eq!(pool.page_count(), 1);

    release_all(&pool, second);
}

#[test]
fn test_request_double_growth_rate() {
    let pool = pool_with_growth(TEST_GROWTH_RATE);

    let first = allocate_many(&pool, TEST_GROWTH_RATE);
    let second = allocate_many(&pool, TEST_GROWTH_RATE);
    assert_shape(&first);
    assert_shape(&second);
    assert_eq!(pool.page_count(), 2);

    let all: Vec<_> = first.into_iter().chain(second).collect();
    assert_unique(&all);
    release_all(&pool, all);
}

#[test]
fn test_request_one_page_of_buffers() {
    let pool = default_pool();
    let count = buffers_per_page();

    for _ in 0..2 {
        let tasks = allocate_many(&pool, count);
        assert_shape(&tasks);
        assert_unique(&tasks);
        assert_eq!(pool.page_count(), 1);
        release_all(&pool, tasks);
    }
}

#[test]
fn test_request_over_one_page_of_buffers() {
    let pool = default_pool();
    let count = buffers_per_page() + 1;

    for _ in 0..2 {
        let tasks = allocate_many(&pool, count);
        assert_shape(&tasks);
        assert_unique(&tasks);
        assert_eq!(pool.page_count(), 2);
        release_all(&pool, tasks);
    }
}

#[test]
fn test_request_over_two_pages_of_buffers() {
    let pool = default_pool();
    let count = (buffers_per_page() + 1) * 2;

    for _ in 0..2 {
        let tasks = allocate_many(&pool, count);
        assert_shape(&tasks);
        assert_unique(&tasks);
        assert!(pool.page_count() >= 3);
        release_all(&pool, tasks);
    }
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_slot_addresses_are_stable_across_growth() {
    let pool = pool_with_growth(4);
    let early = allocate_many(&pool, 4);
    let early_ptrs: Vec<_> = early.iter().map(|t| t.as_ptr()).collect();

    // Several more pages
    let late = allocate_many(&pool, 40);
    assert!(pool.page_count() > 4);

    release_all(&pool, early);
    let again = allocate_many(&pool, 4);
    for task in &again {
        assert!(early_ptrs.contains(&task.as_ptr()));
    }

    release_all(&pool, again);
    release_all(&pool, late);
}

#[test]
fn test_pool_size_never_shrinks() {
    let pool = pool_with_growth(TEST_GROWTH_RATE);
    let tasks = allocate_many(&pool, 25);
    let capacity = pool.capacity();
    assert_eq!(capacity, 30);

    release_all(&pool, tasks);
    assert_eq!(pool.capacity(), capacity);

    let stats = pool.stats();
    assert_eq!(stats.allocations, 25);
    assert_eq!(stats.releases, 25);
    assert_eq!(stats.growth_events, 3);
    assert_eq!(stats.free(), 30);
}
