//! Pool pages
//!
//! A page is a zeroed block aligned to the OS allocation granularity and
//! carved into equal slots. Pages never move once created.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::PoolError;

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Returns the OS page size.
///
/// On Unix this queries `sysconf`; elsewhere it falls back to 4KB.
#[cfg(unix)]
pub fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions and _SC_PAGESIZE is always defined.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        FALLBACK_PAGE_SIZE
    }
}

#[cfg(not(unix))]
pub fn page_size() -> usize {
    FALLBACK_PAGE_SIZE
}

/// One contiguous block of slots
pub(crate) struct Page {
    base: NonNull<u8>,
    layout: Layout,
    slot_size: usize,
    slots: usize,
}

// SAFETY: the page exclusively owns its block. Slot bytes are only touched by
// the holder of the slot's task handle, and slots are disjoint.
unsafe impl Send for Page {}
unsafe impl Sync for Page {}

impl Page {
    /// Allocate a zeroed page holding `slots` slots of `slot_size` bytes
    ///
    /// The block is rounded up to a whole number of OS pages and aligned to
    /// `page_size`, which must be a power of two.
    pub(crate) fn allocate(
        slot_size: usize,
        slots: usize,
        page_size: usize,
    ) -> Result<Self, PoolError> {
        let failure = |size| PoolError::AllocationFailure {
            size,
            align: page_size,
        };

        let wanted = slot_size.checked_mul(slots).ok_or(failure(usize::MAX))?;
        let bytes = round_up(wanted, page_size).ok_or(failure(wanted))?;
        let layout = Layout::from_size_align(bytes, page_size).map_err(|_| failure(bytes))?;

        // SAFETY: slot_size and slots are non-zero, so the layout is too.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let base = NonNull::new(ptr).ok_or(failure(bytes))?;

        Ok(Self {
            base,
            layout,
            slot_size,
            slots,
        })
    }

    /// Stable address of a slot
    pub(crate) fn slot_ptr(&self, slot: usize) -> NonNull<u8> {
        assert!(slot < self.slots, "slot {slot} out of range for page");
        // SAFETY: slot < slots keeps the offset inside the block, and the
        // block base is non-null.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(slot * self.slot_size)) }
    }

    pub(crate) fn slots(&self) -> usize {
        self.slots
    }

    pub(crate) fn bytes(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        // SAFETY: base was returned by alloc_zeroed with exactly this layout.
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
    }
}

fn round_up(bytes: usize, granularity: usize) -> Option<usize> {
    let rounded = bytes.checked_add(granularity - 1)? / granularity * granularity;
    Some(rounded)
}
