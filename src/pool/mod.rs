//! Connection-identifier slot pool
//!
//! Page-based slab of fixed-size slots handed out during connection setup.
//! Allocation pops the head of a LIFO free list; release pushes it back.

mod guard;
mod page;
mod slot_pool;
mod task;

pub use guard::IdBuffer;
pub use page::page_size;
pub use slot_pool::ConnectionIdPool;
pub use task::{SlotAddr, TaskHandle};
