//! Integration tests

mod concurrency_tests;
mod logger_tests;
mod slot_pool_tests;
