//! Memory poisoning.
//!
//! Freed and reset spans are filled with a known pattern so use-after-free
//! reads show up as recognizable garbage instead of stale data.

/// Pattern written over freed or reset memory.
pub const FREED_PATTERN: u8 = 0xCD;

/// Fill a span with the freed pattern.
///
/// # Safety
///
/// The span must be valid for writes of `size` bytes.
pub unsafe fn poison_freed(ptr: *mut u8, size: usize) {
    std::ptr::write_bytes(ptr, FREED_PATTERN, size);
}

/// Whether every byte of the span still carries the freed pattern.
pub fn is_poisoned(ptr: *const u8, size: usize) -> bool {
    (0..size).all(|i| {
        // SAFETY: caller keeps the span readable while checking.
        unsafe { *ptr.add(i) == FREED_PATTERN }
    })
}
