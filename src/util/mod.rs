//! Utility modules

mod status;
mod text_logger;
mod tracing_setup;

pub use status::{StatusFormat, StatusLine};
pub use text_logger::{TextLogger, BYTE_ORDER_MARK};
pub use tracing_setup::init_tracing;
