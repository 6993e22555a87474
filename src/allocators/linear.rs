//! Linear (bump) allocator.
//!
//! The fastest strategy: allocation advances a single cursor past the
//! aligned payload. Individual frees are invalid; `reset` reclaims the
//! whole buffer in one step.

use std::ptr::NonNull;

use crate::allocators::Strategy;
use crate::stats::AllocatorStats;
use crate::util::align::align_in;

/// Bump allocator over a fixed buffer.
pub struct LinearAllocator {
    buffer: NonNull<u8>,
    end: usize,
    cursor: usize,
    stats: AllocatorStats,
}

// SAFETY: the allocator exclusively owns the buffer span it manages.
unsafe impl Send for LinearAllocator {}

impl LinearAllocator {
    /// Rewind the cursor to the start of the buffer and zero the active
    /// counters, invalidating every live allocation at once.
    ///
    /// This is the only way a linear allocator reclaims space.
    pub fn reset(&mut self) {
        #[cfg(feature = "debug")]
        // SAFETY: the whole buffer belongs to this allocator.
        unsafe {
            crate::debug::poison::poison_freed(self.buffer.as_ptr(), self.stats.capacity);
        }

        self.cursor = self.buffer.as_ptr() as usize;
        self.stats.active_allocations = 0;
        self.stats.active_bytes = 0;
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.end - self.cursor
    }
}

impl Strategy for LinearAllocator {
    unsafe fn init(buffer: NonNull<u8>, size: usize) -> Self {
        let start = buffer.as_ptr() as usize;
        Self {
            buffer,
            end: start + size,
            cursor: start,
            stats: AllocatorStats::with_capacity(size),
        }
    }

    fn allocate(&mut self, size: usize, align: usize) -> *mut u8 {
        let payload = align_in(align, size, self.cursor as *mut u8, self.remaining());
        if payload.is_null() {
            return std::ptr::null_mut();
        }

        let adjustment = payload as usize - self.cursor;
        self.cursor = payload as usize + size;
        self.stats.record_alloc(size + adjustment);

        payload
    }

    unsafe fn free(&mut self, _ptr: *mut u8) {
        debug_assert!(false, "linear allocators do not free individual allocations");
    }

    fn stats(&self) -> AllocatorStats {
        self.stats
    }

    fn begin(&self) -> usize {
        self.buffer.as_ptr() as usize
    }

    fn end(&self) -> usize {
        self.end
    }
}

impl Drop for LinearAllocator {
    fn drop(&mut self) {
        // Other strategies treat live allocations at teardown as a leak; a
        // linear allocator can still reclaim everything, so warn and reset.
        if self.stats.active_allocations != 0 {
            log::warn!(
                "linear allocator dropped without reset ({} live allocations); resetting",
                self.stats.active_allocations
            );
            self.reset();
        }
    }
}
