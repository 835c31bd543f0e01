//! Error types
//!
//! Pool and logger errors are typed; the binary wraps them with `anyhow`.

use std::path::PathBuf;

/// Errors returned by the connection-identifier pool
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The OS could not supply memory for a new page
    #[error("failed to allocate a pool page (size: {size}, align: {align})")]
    AllocationFailure { size: usize, align: usize },

    /// Identifier payload does not fit in a slot
    #[error("identifier is {len} bytes but slots hold at most {max}")]
    IdentifierTooLong { len: usize, max: usize },

    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised while constructing a [`TextLogger`](crate::util::TextLogger)
///
/// Only construction can fail; every later write reports through `tracing`.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("failed to create log file {path:?}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write byte-order mark to {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
