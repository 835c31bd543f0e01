//! Connection-identifier slot pool
//!
//! All pages and the free list sit behind one `parking_lot::Mutex`. The lock
//! covers a free-list pop/push or a growth event and nothing else; identifier
//! bytes are copied after it is dropped.

use parking_lot::Mutex;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

use super::page::{page_size, Page};
use super::task::{SlotAddr, TaskHandle};
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::metrics::{PoolCounters, PoolStats};
use crate::util::TextLogger;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

struct PoolInner {
    /// Append-only; a page is never dropped before the pool
    pages: Vec<Page>,
    /// LIFO stack of free slots, head at the end. Capacity always covers
    /// every slot, so release never reallocates.
    free: Vec<SlotAddr>,
    /// Per-page in-use bitmap, empty unless release verification is on
    in_use: Vec<Vec<bool>>,
    outstanding: usize,
    capacity: usize,
}

/// Growable slab of fixed-size connection-identifier buffers
pub struct ConnectionIdPool {
    id: u64,
    slot_size: usize,
    growth_rate: usize,
    page_size: usize,
    verify_releases: bool,
    inner: Mutex<PoolInner>,
    counters: PoolCounters,
    logger: Option<Arc<TextLogger>>,
}

impl ConnectionIdPool {
    /// Create an empty pool; the first allocation adds the first page
    pub fn new(config: &PoolConfig) -> Result<Self, PoolError> {
        if config.slot_size == 0 {
            return Err(PoolError::InvalidConfig("slot_size must be > 0".into()));
        }

        let page_size = page_size();
        let growth_rate = config.effective_growth_rate(page_size);
        let verify_releases = config.effective_verify_releases();

        debug!(
            slot_size = config.slot_size,
            growth_rate,
            page_size,
            verify_releases,
            "Connection id pool created"
        );

        Ok(Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            slot_size: config.slot_size,
            growth_rate,
            page_size,
            verify_releases,
            inner: Mutex::new(PoolInner {
                pages: Vec::new(),
                free: Vec::new(),
                in_use: Vec::new(),
                outstanding: 0,
                capacity: 0,
            }),
            counters: PoolCounters::new(),
            logger: None,
        })
    }

    /// Report allocation failures to a text log as well as `tracing`
    pub fn with_logger(mut self, logger: Arc<TextLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Take a free slot and copy `identifier` into it
    ///
    /// Bytes past the identifier are zeroed. Grows the pool when the free
    /// list is empty; on growth failure nothing is modified.
    pub fn allocate(&self, identifier: &[u8]) -> Result<TaskHandle, PoolError> {
        if identifier.len() > self.slot_size {
            return Err(PoolError::IdentifierTooLong {
                len: identifier.len(),
                max: self.slot_size,
            });
        }

        let (addr, slot) = {
            let mut inner = self.inner.lock();
            let popped = inner.free.pop();
            let addr = match popped {
                Some(addr) => addr,
                None => match self.grow(&mut inner) {
                    Ok(addr) => addr,
                    Err(err) => {
                        drop(inner);
                        self.report_allocation_failure(&err);
                        return Err(err);
                    }
                },
            };

            if self.verify_releases {
                let was_in_use =
                    std::mem::replace(&mut inner.in_use[addr.page()][addr.slot()], true);
                if was_in_use {
                    drop(inner);
                    self.contract_violation("free list handed out an in-use slot", addr);
                }
            }
            inner.outstanding += 1;
            (addr, inner.pages[addr.page()].slot_ptr(addr.slot()))
        };

        // SAFETY: the slot was just taken off the free list, so no other
        // handle refers to it, and it spans slot_size bytes.
        unsafe {
            ptr::copy_nonoverlapping(identifier.as_ptr(), slot.as_ptr(), identifier.len());
            ptr::write_bytes(
                slot.as_ptr().add(identifier.len()),
                0,
                self.slot_size - identifier.len(),
            );
        }

        self.counters.allocated();
        Ok(TaskHandle::new(self.id, addr, slot, self.slot_size))
    }

    /// Return a slot to the head of the free list
    ///
    /// The very next non-growing `allocate` hands this slot out again.
    ///
    /// # Panics
    ///
    /// If the handle came from a different pool, or (with release
    /// verification on) if its slot is not currently in use.
    pub fn release(&self, task: TaskHandle) {
        self.check_owner(&task);
        let addr = task.slot_addr();

        let mut inner = self.inner.lock();
        if self.verify_releases {
            let was_in_use =
                std::mem::replace(&mut inner.in_use[addr.page()][addr.slot()], false);
            if !was_in_use {
                drop(inner);
                self.contract_violation("release of a slot that is not in use", addr);
            }
        }
        inner.free.push(addr);
        inner.outstanding -= 1;
        drop(inner);

        self.counters.released();
    }

    /// Read the bytes of an outstanding slot
    pub fn buffer<'a>(&'a self, task: &'a TaskHandle) -> &'a [u8] {
        self.check_owner(task);
        // SAFETY: the slot stays valid while the pool lives and is only
        // reachable through this handle.
        unsafe { std::slice::from_raw_parts(task.buffer_ptr().as_ptr(), task.buffer_length()) }
    }

    /// Write access to an outstanding slot, e.g. to receive a peer's identifier
    pub fn buffer_mut<'a>(&'a self, task: &'a mut TaskHandle) -> &'a mut [u8] {
        self.check_owner(task);
        // SAFETY: as for `buffer`; the exclusive borrow of the handle rules
        // out any other access to the slot.
        unsafe { std::slice::from_raw_parts_mut(task.buffer_ptr().as_ptr(), task.buffer_length()) }
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Slots added per growth event
    pub fn growth_rate(&self) -> usize {
        self.growth_rate
    }

    pub fn page_count(&self) -> usize {
        self.inner.lock().pages.len()
    }

    /// Total slots across all pages
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Slots currently held by task handles
    pub fn in_use(&self) -> usize {
        self.inner.lock().outstanding
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        let (pages, capacity, in_use) = {
            let inner = self.inner.lock();
            (inner.pages.len(), inner.capacity, inner.outstanding)
        };
        self.counters
            .snapshot(self.slot_size, self.page_size, pages, capacity, in_use)
    }

    /// Add one page and return its first slot for the pending allocation.
    ///
    /// Every fallible step runs before the pool is touched.
    fn grow(&self, inner: &mut PoolInner) -> Result<SlotAddr, PoolError> {
        let slots = self.growth_rate;
        let oom = |size| PoolError::AllocationFailure {
            size,
            align: self.page_size,
        };

        let new_capacity = inner.capacity.checked_add(slots).ok_or(oom(usize::MAX))?;
        let reserve = new_capacity - inner.free.len();
        inner
            .free
            .try_reserve_exact(reserve)
            .map_err(|_| oom(reserve.saturating_mul(std::mem::size_of::<SlotAddr>())))?;
        inner.pages.try_reserve(1).map_err(|_| oom(std::mem::size_of::<Page>()))?;

        let mut bitmap = Vec::new();
        if self.verify_releases {
            inner.in_use.try_reserve(1).map_err(|_| oom(std::mem::size_of::<Vec<bool>>()))?;
            bitmap.try_reserve_exact(slots).map_err(|_| oom(slots))?;
            bitmap.resize(slots, false);
        }

        // Only `slots` are carved; any tail of the rounded-up block stays unused.
        let page = Page::allocate(self.slot_size, slots, self.page_size)?;
        let page_index = inner.pages.len();
        debug!(
            page = page_index,
            slots,
            bytes = page.bytes(),
            capacity = new_capacity,
            "Growing connection id pool"
        );

        // Push in reverse so slot 0 is on top; it is handed out right away.
        inner
            .free
            .extend((1..page.slots()).rev().map(|slot| SlotAddr::new(page_index, slot)));
        inner.pages.push(page);
        if self.verify_releases {
            inner.in_use.push(bitmap);
        }
        inner.capacity = new_capacity;

        self.counters.grew();
        Ok(SlotAddr::new(page_index, 0))
    }

    fn report_allocation_failure(&self, err: &PoolError) {
        self.counters.allocation_failed();
        error!(error = %err, slot_size = self.slot_size, "Connection id pool could not grow");
        if let Some(logger) = &self.logger {
            logger.log_error(&format!("connection id pool could not grow: {err}"));
        }
    }

    fn check_owner(&self, task: &TaskHandle) {
        if task.pool_id() != self.id {
            self.contract_violation("task handle belongs to another pool", task.slot_addr());
        }
    }

    fn contract_violation(&self, what: &str, addr: SlotAddr) -> ! {
        error!(
            page = addr.page(),
            slot = addr.slot(),
            pool = self.id,
            "Connection id pool misuse: {what}"
        );
        if let Some(logger) = &self.logger {
            logger.log_error(&format!(
                "connection id pool misuse: {what} (page {}, slot {})",
                addr.page(),
                addr.slot()
            ));
        }
        panic!("connection id pool misuse: {what}");
    }
}

impl std::fmt::Debug for ConnectionIdPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionIdPool")
            .field("id", &self.id)
            .field("slot_size", &self.slot_size)
            .field("growth_rate", &self.growth_rate)
            .field("verify_releases", &self.verify_releases)
            .finish_non_exhaustive()
    }
}
