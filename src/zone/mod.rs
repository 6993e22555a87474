//! Memory zones: named, lockable regions backed by one allocation strategy.
//!
//! A zone obtains its buffer from a parent zone (forming a tree) or from
//! the process heap, serializes access behind a mutex, and registers
//! itself so raw pointers can be resolved back to their owner. Children
//! hold a reference to their parent, so a parent cannot be torn down while
//! any child is alive.

use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::Arc;

use crate::allocators::{Strategy, DEFAULT_ALIGNMENT};
use crate::stats::AllocatorStats;
use crate::sync::Mutex;
use crate::util::size::format_bytes;

pub mod registry;
pub mod scope;

/// Object-safe surface shared by every zone regardless of strategy.
///
/// The registry and the scoped-context machinery traffic in
/// `Arc<dyn MemSpace>`, so zones with different strategies mix freely in
/// one tree.
pub trait MemSpace: Send + Sync {
    /// Allocate `size` bytes aligned to `align`. Returns null when the zone
    /// cannot satisfy the request.
    fn allocate(&self, size: usize, align: usize) -> *mut u8;

    /// Return an allocation to the zone.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this zone and not
    /// freed since.
    unsafe fn free(&self, ptr: *mut u8);

    /// Move an allocation to a new size, when the strategy supports it.
    ///
    /// # Safety
    ///
    /// Same contract as [`MemSpace::free`] for `ptr`.
    unsafe fn reallocate(&self, ptr: *mut u8, size: usize, align: usize) -> *mut u8;

    /// Whether `ptr` falls inside this zone's buffer.
    fn contains(&self, ptr: *const u8) -> bool;

    /// Debug name given at construction.
    fn name(&self) -> &str;

    /// Snapshot of the embedded strategy's counters.
    fn stats(&self) -> AllocatorStats;
}

impl dyn MemSpace {
    /// Allocate uninitialized storage sized and aligned for a `T`.
    pub fn alloc_uninit<T>(&self) -> *mut T {
        self.allocate(mem::size_of::<T>(), mem::align_of::<T>()) as *mut T
    }

    /// Destroy the value at `ptr` and return its storage to the zone.
    ///
    /// Counterpart of [`ZoneBox::into_raw`].
    ///
    /// # Safety
    ///
    /// `ptr` must point at a live `T` allocated from this zone and must not
    /// be used afterwards.
    pub unsafe fn destroy<T>(&self, ptr: *mut T) {
        std::ptr::drop_in_place(ptr);
        self.free(ptr as *mut u8);
    }
}

/// A named region of memory backed by one allocation strategy.
pub struct Zone<S: Strategy> {
    name: String,
    parent: Option<Arc<dyn MemSpace>>,
    buffer: NonNull<u8>,
    size: usize,
    strategy: Mutex<S>,
}

// SAFETY: the raw buffer pointer is exclusively owned by this zone, and the
// strategy behind the mutex is only reachable through locked methods.
unsafe impl<S: Strategy + Send> Send for Zone<S> {}
unsafe impl<S: Strategy + Send> Sync for Zone<S> {}

impl<S: Strategy + Send + 'static> Zone<S> {
    /// Create a zone of `size` bytes named `name`.
    ///
    /// The backing buffer comes from `parent` when given, otherwise from
    /// the process heap. The zone registers itself for reverse pointer
    /// lookup and unregisters on drop.
    ///
    /// # Panics
    ///
    /// Panics when `parent` cannot supply `size` bytes, or when the process
    /// heap refuses the root buffer.
    pub fn new(parent: Option<Arc<dyn MemSpace>>, size: usize, name: &str) -> Arc<Self> {
        let buffer = match &parent {
            Some(parent) => {
                let ptr = parent.allocate(size, DEFAULT_ALIGNMENT);
                NonNull::new(ptr).unwrap_or_else(|| {
                    panic!(
                        "parent zone \"{}\" cannot back a {} zone",
                        parent.name(),
                        format_bytes(size)
                    )
                })
            }
            None => {
                let layout = buffer_layout(size);
                // SAFETY: the layout has non-zero size.
                let ptr = unsafe { std::alloc::alloc(layout) };
                NonNull::new(ptr).expect("failed to allocate zone buffer from the process heap")
            }
        };

        // SAFETY: the buffer is valid for `size` bytes and exclusively ours
        // until the zone drops.
        let strategy = unsafe { S::init(buffer, size) };

        let zone = Arc::new(Self {
            name: name.to_owned(),
            parent,
            buffer,
            size,
            strategy: Mutex::new(strategy),
        });

        log::debug!("zone \"{}\" created: {}", zone.name, format_bytes(size));

        let dyn_zone: Arc<dyn MemSpace> = zone.clone();
        let weak: std::sync::Weak<dyn MemSpace> = Arc::downgrade(&dyn_zone);
        registry::register(
            Arc::as_ptr(&zone) as *const () as usize,
            zone.begin(),
            zone.end(),
            weak,
        );

        zone
    }

    /// Make this zone the current zone for the enclosing scope.
    pub fn scope(self: &Arc<Self>) -> scope::ZoneScope {
        scope::ZoneScope::enter(self.clone())
    }

    /// Allocate storage for a `T` and move `value` into it, returning an
    /// owning handle that destroys and frees it on drop.
    ///
    /// Returns `None` when the zone is exhausted.
    pub fn boxed<T>(self: &Arc<Self>, value: T) -> Option<ZoneBox<T>> {
        ZoneBox::new_in(&(self.clone() as Arc<dyn MemSpace>), value)
    }

    /// Allocate uninitialized storage sized and aligned for a `T`.
    pub fn alloc_uninit<T>(&self) -> *mut T {
        MemSpace::allocate(self, mem::size_of::<T>(), mem::align_of::<T>()) as *mut T
    }
}

impl<S: Strategy> Zone<S> {
    /// First address of the zone's buffer.
    pub fn begin(&self) -> usize {
        self.buffer.as_ptr() as usize
    }

    /// One past the last address of the zone's buffer.
    pub fn end(&self) -> usize {
        self.buffer.as_ptr() as usize + self.size
    }

    /// Run `f` with the locked strategy. Strategy-specific operations
    /// (`reset` on a linear zone, `pop` on a stack zone) go through here.
    pub fn with_strategy<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.strategy.lock())
    }
}

impl<S: Strategy + Send> MemSpace for Zone<S> {
    fn allocate(&self, size: usize, align: usize) -> *mut u8 {
        self.strategy.lock().allocate(size, align)
    }

    unsafe fn free(&self, ptr: *mut u8) {
        self.strategy.lock().free(ptr);
    }

    unsafe fn reallocate(&self, ptr: *mut u8, size: usize, align: usize) -> *mut u8 {
        self.strategy.lock().reallocate(ptr, size, align)
    }

    fn contains(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        addr >= self.begin() && addr < self.end()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn stats(&self) -> AllocatorStats {
        self.strategy.lock().stats()
    }
}

impl<S: Strategy> Drop for Zone<S> {
    fn drop(&mut self) {
        registry::unregister(self as *const Self as *const () as usize);

        let stats = self.strategy.lock().stats();
        if stats.active_allocations > 0 {
            log::error!(
                "zone \"{}\" dropped with {} live allocations ({})",
                self.name,
                stats.active_allocations,
                format_bytes(stats.active_bytes)
            );
        } else {
            log::debug!("zone \"{}\" destroyed", self.name);
        }

        match &self.parent {
            // SAFETY: the buffer was allocated by this parent in `new`.
            Some(parent) => unsafe { parent.free(self.buffer.as_ptr()) },
            // SAFETY: the buffer was allocated in `new` with this layout.
            None => unsafe { std::alloc::dealloc(self.buffer.as_ptr(), buffer_layout(self.size)) },
        }
    }
}

fn buffer_layout(size: usize) -> std::alloc::Layout {
    std::alloc::Layout::from_size_align(size, DEFAULT_ALIGNMENT).expect("invalid zone size")
}

/// Owning handle for a value constructed inside a zone.
///
/// Dropping the box runs the value's destructor and returns the storage to
/// the owning zone.
pub struct ZoneBox<T> {
    ptr: NonNull<T>,
    zone: Arc<dyn MemSpace>,
}

// SAFETY: the box is the unique owner of the pointee; the zone handle is
// already Send + Sync.
unsafe impl<T: Send> Send for ZoneBox<T> {}
unsafe impl<T: Sync> Sync for ZoneBox<T> {}

impl<T> ZoneBox<T> {
    /// Allocate storage in `zone` and move `value` into it.
    ///
    /// Returns `None` when the zone is exhausted; `value` is dropped.
    pub fn new_in(zone: &Arc<dyn MemSpace>, value: T) -> Option<Self> {
        let ptr = zone.alloc_uninit::<T>();
        NonNull::new(ptr).map(|ptr| {
            // SAFETY: the allocation is sized and aligned for T.
            unsafe { ptr.as_ptr().write(value) };
            Self {
                ptr,
                zone: zone.clone(),
            }
        })
    }

    /// The zone this value lives in.
    pub fn zone(&self) -> &Arc<dyn MemSpace> {
        &self.zone
    }

    /// Get the raw pointer.
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Get the raw mutable pointer.
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Leak the box, returning the raw pointer.
    ///
    /// The caller becomes responsible for destroying the value and freeing
    /// it back to the zone.
    pub fn into_raw(self) -> *mut T {
        let ptr = self.ptr.as_ptr();
        mem::forget(self);
        ptr
    }
}

impl<T> Deref for ZoneBox<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: the box uniquely owns a live, initialized T.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for ZoneBox<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the box uniquely owns a live, initialized T.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for ZoneBox<T> {
    fn drop(&mut self) {
        // SAFETY: the pointee is live and the storage came from this zone.
        unsafe {
            std::ptr::drop_in_place(self.ptr.as_ptr());
            self.zone.free(self.ptr.as_ptr() as *mut u8);
        }
    }
}
