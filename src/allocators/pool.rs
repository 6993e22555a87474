//! Fixed-block pool allocator.
//!
//! The buffer is partitioned into `BLOCK_SIZE` chunks threaded into an
//! intrusive free list that lives inside the blocks themselves, with no side
//! metadata. Allocation and free are O(1) pops and pushes; blocks are
//! uniform, so no coalescing is ever needed.

use std::mem;
use std::ptr::NonNull;

use crate::allocators::Strategy;
use crate::stats::AllocatorStats;
use crate::util::align::is_aligned;

/// Intrusive free-list node stored in each free block.
#[repr(C)]
struct FreeNode {
    next: *mut FreeNode,
}

/// Pool of `buffer_size / BLOCK_SIZE` equal blocks.
pub struct PoolAllocator<const BLOCK_SIZE: usize> {
    buffer: NonNull<u8>,
    num_blocks: usize,
    head: *mut FreeNode,
    stats: AllocatorStats,
}

// SAFETY: the allocator exclusively owns the buffer span it manages.
unsafe impl<const BLOCK_SIZE: usize> Send for PoolAllocator<BLOCK_SIZE> {}

impl<const BLOCK_SIZE: usize> PoolAllocator<BLOCK_SIZE> {
    /// Number of blocks managed by this pool.
    pub fn block_count(&self) -> usize {
        self.num_blocks
    }
}

impl<const BLOCK_SIZE: usize> Strategy for PoolAllocator<BLOCK_SIZE> {
    unsafe fn init(buffer: NonNull<u8>, size: usize) -> Self {
        const {
            assert!(
                BLOCK_SIZE >= mem::size_of::<FreeNode>(),
                "block size cannot hold the free-list node"
            );
            assert!(
                BLOCK_SIZE % mem::align_of::<FreeNode>() == 0,
                "block size must keep every block aligned for the free-list node"
            );
        }

        let num_blocks = size / BLOCK_SIZE;
        debug_assert!(num_blocks > 0, "pool buffer holds zero blocks");

        // Thread the blocks last-to-first so the list starts at the front of
        // the buffer.
        let mut head: *mut FreeNode = std::ptr::null_mut();
        for i in (0..num_blocks).rev() {
            let node = buffer.as_ptr().add(i * BLOCK_SIZE) as *mut FreeNode;
            node.write(FreeNode { next: head });
            head = node;
        }

        Self {
            buffer,
            num_blocks,
            head,
            stats: AllocatorStats::with_capacity(num_blocks * BLOCK_SIZE),
        }
    }

    fn allocate(&mut self, size: usize, align: usize) -> *mut u8 {
        debug_assert!(
            size <= BLOCK_SIZE,
            "pool allocator cannot satisfy allocations larger than its block size"
        );

        if self.head.is_null() {
            return std::ptr::null_mut();
        }

        let block = self.head;
        debug_assert!(
            is_aligned(block as *const u8, align),
            "pool allocator does not support over-aligned requests"
        );

        // SAFETY: head points at a free node this pool wrote.
        self.head = unsafe { (*block).next };
        self.stats.record_alloc(BLOCK_SIZE);

        block as *mut u8
    }

    unsafe fn free(&mut self, ptr: *mut u8) {
        debug_assert!(
            self.contains(ptr),
            "pointer is not managed by this pool allocator"
        );

        #[cfg(feature = "debug")]
        crate::debug::poison::poison_freed(ptr, BLOCK_SIZE);

        let node = ptr as *mut FreeNode;
        node.write(FreeNode { next: self.head });
        self.head = node;
        self.stats.record_free(BLOCK_SIZE);
    }

    fn stats(&self) -> AllocatorStats {
        self.stats
    }

    fn begin(&self) -> usize {
        self.buffer.as_ptr() as usize
    }

    fn end(&self) -> usize {
        self.buffer.as_ptr() as usize + self.num_blocks * BLOCK_SIZE
    }
}

impl<const BLOCK_SIZE: usize> Drop for PoolAllocator<BLOCK_SIZE> {
    fn drop(&mut self) {
        debug_assert!(
            self.stats.active_allocations == 0,
            "memory leak detected in pool allocator"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(align(16))]
    struct Buffer<const N: usize>([u8; N]);

    impl<const N: usize> Buffer<N> {
        fn new() -> Self {
            Self([0; N])
        }

        fn ptr(&mut self) -> NonNull<u8> {
            NonNull::new(self.0.as_mut_ptr()).unwrap()
        }
    }

    #[test]
    fn test_exact_capacity() {
        let mut buf = Buffer::<64>::new();
        let mut pool = unsafe { PoolAllocator::<16>::init(buf.ptr(), 64) };
        assert_eq!(pool.block_count(), 4);

        // Exactly four allocations succeed, the fifth fails.
        let blocks: Vec<*mut u8> = (0..4).map(|_| pool.allocate(16, 8)).collect();
        assert!(blocks.iter().all(|p| !p.is_null()));
        assert!(pool.allocate(16, 8).is_null());

        // Freeing one block admits exactly one more allocation.
        unsafe { pool.free(blocks[2]) };
        let again = pool.allocate(16, 8);
        assert_eq!(again, blocks[2]);
        assert!(pool.allocate(16, 8).is_null());

        unsafe {
            pool.free(blocks[0]);
            pool.free(blocks[1]);
            pool.free(again);
            pool.free(blocks[3]);
        }
    }

    #[test]
    fn test_no_stomping() {
        let mut buf = Buffer::<128>::new();
        let mut pool = unsafe { PoolAllocator::<16>::init(buf.ptr(), 128) };

        let blocks: Vec<*mut u64> = (0..8).map(|_| pool.allocate(8, 8) as *mut u64).collect();
        for (i, &p) in blocks.iter().enumerate() {
            unsafe { p.write(0xA000 + i as u64) };
        }
        for (i, &p) in blocks.iter().enumerate() {
            assert_eq!(unsafe { *p }, 0xA000 + i as u64);
        }

        for p in blocks {
            unsafe { pool.free(p as *mut u8) };
        }
        assert_eq!(pool.stats().active_allocations, 0);
    }

    #[test]
    fn test_free_then_reuse_is_lifo() {
        let mut buf = Buffer::<64>::new();
        let mut pool = unsafe { PoolAllocator::<32>::init(buf.ptr(), 64) };

        let a = pool.allocate(32, 8);
        let b = pool.allocate(32, 8);
        unsafe {
            pool.free(a);
            pool.free(b);
        }

        // Most recently freed block comes back first.
        assert_eq!(pool.allocate(32, 8), b);
        assert_eq!(pool.allocate(32, 8), a);
        unsafe {
            pool.free(a);
            pool.free(b);
        }
    }

    #[test]
    fn test_stats_track_blocks() {
        let mut buf = Buffer::<96>::new();
        let mut pool = unsafe { PoolAllocator::<32>::init(buf.ptr(), 96) };

        let a = pool.allocate(20, 8);
        assert_eq!(pool.stats().active_bytes, 32);
        assert_eq!(pool.stats().capacity, 96);

        unsafe { pool.free(a) };
        assert_eq!(pool.stats().active_bytes, 0);
        assert_eq!(pool.stats().total_allocations, 1);
    }
}
