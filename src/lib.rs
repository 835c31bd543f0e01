//! ctsTraffic-rs connection-identifier pool
//!
//! Fixed-size buffers for the identifier token exchanged at connection setup,
//! served from a page-based, growable, thread-safe slab so that high
//! connection churn never touches the general-purpose allocator.

pub mod churn;
pub mod config;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod util;

pub use config::Config;
pub use connection::{ConnectionId, CONNECTION_ID_LENGTH};
pub use error::{LoggerError, PoolError};
pub use pool::{ConnectionIdPool, IdBuffer, SlotAddr, TaskHandle};

/// Crate version for display
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
