//! Per-strategy allocation counters.

use crate::util::size::format_bytes;

/// Counters every allocation strategy keeps about itself.
///
/// Snapshots are plain copies and form the debug surface for leak auditing:
/// a strategy or zone reporting `active_allocations > 0` at teardown has
/// leaked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Size of the managed buffer in bytes.
    pub capacity: usize,

    /// Allocations currently live.
    pub active_allocations: usize,

    /// Bytes currently handed out, including per-allocation bookkeeping.
    pub active_bytes: usize,

    /// Allocations performed over the strategy's lifetime.
    pub total_allocations: usize,

    /// Bytes handed out over the strategy's lifetime.
    pub total_bytes: usize,
}

impl AllocatorStats {
    /// Fresh counters for a buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Bytes not currently handed out. Ignores fragmentation, so a request
    /// of this size may still fail.
    pub fn free_space(&self) -> usize {
        self.capacity - self.active_bytes
    }

    pub(crate) fn record_alloc(&mut self, bytes: usize) {
        self.active_allocations += 1;
        self.active_bytes += bytes;
        self.total_allocations += 1;
        self.total_bytes += bytes;
    }

    pub(crate) fn record_free(&mut self, bytes: usize) {
        debug_assert!(self.active_allocations > 0, "free without a matching allocation");
        debug_assert!(self.active_bytes >= bytes, "freed more bytes than are active");
        self.active_allocations -= 1;
        self.active_bytes -= bytes;
    }
}

impl std::fmt::Display for AllocatorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} in use, {} active / {} lifetime allocations",
            format_bytes(self.active_bytes),
            format_bytes(self.capacity),
            self.active_allocations,
            self.total_allocations,
        )
    }
}
