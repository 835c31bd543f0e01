//! Task handles for pooled slots

use std::ptr::NonNull;

/// Location of a slot inside a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotAddr {
    page: usize,
    slot: usize,
}

impl SlotAddr {
    pub(crate) fn new(page: usize, slot: usize) -> Self {
        Self { page, slot }
    }

    /// Index of the owning page
    pub fn page(&self) -> usize {
        self.page
    }

    /// Index of the slot within its page
    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// Descriptor for a connection-identifier buffer
///
/// The pool owns the memory; a handle only borrows one slot from
/// `allocate` until it is passed back to `release`. Handles are move-only,
/// so a slot cannot be released twice through safe code.
#[derive(Debug)]
#[must_use = "the slot stays in use until the handle is released"]
pub struct TaskHandle {
    pool_id: u64,
    addr: SlotAddr,
    buffer: NonNull<u8>,
    buffer_length: usize,
    buffer_offset: usize,
}

// SAFETY: the pointer targets pool memory that outlives every handle the
// pool hands out, and only the handle holder touches those bytes.
unsafe impl Send for TaskHandle {}
unsafe impl Sync for TaskHandle {}

impl TaskHandle {
    pub(crate) fn new(pool_id: u64, addr: SlotAddr, buffer: NonNull<u8>, length: usize) -> Self {
        Self {
            pool_id,
            addr,
            buffer,
            buffer_length: length,
            buffer_offset: 0,
        }
    }

    /// Address of the slot's first byte
    ///
    /// Stable for the life of the pool. Two outstanding handles never share it.
    pub fn as_ptr(&self) -> *const u8 {
        self.buffer.as_ptr()
    }

    /// Always the pool's slot size
    pub fn buffer_length(&self) -> usize {
        self.buffer_length
    }

    /// Always zero
    pub fn buffer_offset(&self) -> usize {
        self.buffer_offset
    }

    pub fn slot_addr(&self) -> SlotAddr {
        self.addr
    }

    pub(crate) fn pool_id(&self) -> u64 {
        self.pool_id
    }

    pub(crate) fn buffer_ptr(&self) -> NonNull<u8> {
        self.buffer
    }

    /// Duplicate a handle, bypassing move-only semantics
    #[cfg(test)]
    pub(crate) fn duplicate(&self) -> Self {
        Self { ..*self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_addr_ordering() {
        let a = SlotAddr::new(0, 5);
        let b = SlotAddr::new(1, 0);
        assert!(a < b);
        assert_eq!(a.page(), 0);
        assert_eq!(a.slot(), 5);
    }

    #[test]
    fn test_handle_shape() {
        let mut byte = 0u8;
        let handle = TaskHandle::new(7, SlotAddr::new(0, 0), NonNull::from(&mut byte), 37);
        assert_eq!(handle.buffer_length(), 37);
        assert_eq!(handle.buffer_offset(), 0);
        assert_eq!(handle.as_ptr(), &byte as *const u8);
    }
}
