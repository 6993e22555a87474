//! # zonealloc
//!
//! Hierarchical zone-based memory allocation for game engines.
//!
//! ## Features
//!
//! - Four interchangeable strategies over caller-supplied buffers:
//!   linear (bump), stack (LIFO), fixed-block pool, and a coalescing
//!   free list
//! - Zones: named, lockable regions that nest under a parent zone
//! - Scoped redirection of default allocations into the active zone
//! - Reverse pointer-to-zone lookup through a live-zone registry
//! - Leak detection at zone and strategy teardown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zonealloc::{size::mb, FreeListAllocator, Zone};
//!
//! let world = Zone::<FreeListAllocator>::new(None, mb(4), "world");
//! let entities = Zone::<FreeListAllocator>::new(Some(world.clone()), mb(1), "entities");
//!
//! let hp = entities.boxed(100u32).expect("zone exhausted");
//! assert_eq!(*hp, 100);
//! ```
//!
//! ## Capturing default allocations
//!
//! Install [`ZoneRouter`] as the global allocator and wrap any code path -
//! including third-party calls - in a [`ZoneScope`] to capture its
//! allocations in a zone of your choosing.

pub mod allocators;
pub mod util;
pub mod zone;

mod global;
mod stats;
mod sync;

#[cfg(feature = "debug")]
pub mod debug;

// Re-export the public API at the crate root for convenience.
pub use allocators::{
    FreeListAllocator, LinearAllocator, PoolAllocator, StackAllocator, Strategy,
    DEFAULT_ALIGNMENT,
};
pub use global::ZoneRouter;
pub use stats::AllocatorStats;
pub use util::size;
pub use zone::registry;
pub use zone::scope::{current_zone, ZoneScope};
pub use zone::{MemSpace, Zone, ZoneBox};
