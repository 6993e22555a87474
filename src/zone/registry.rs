//! Process-wide registry of live zones.
//!
//! Maps raw addresses back to their owning zone, for deallocation paths
//! that no longer know which zone an allocation came from (drop glue
//! running after the allocating scope exited, third-party callbacks).

use std::sync::{Arc, Weak};

use crate::stats::AllocatorStats;
use crate::sync::Mutex;
use crate::zone::MemSpace;

struct Entry {
    /// Identity of the registering zone, used to unregister.
    key: usize,
    begin: usize,
    end: usize,
    zone: Weak<dyn MemSpace>,
}

static ZONES: Mutex<Vec<Entry>> = Mutex::new(Vec::new());

pub(crate) fn register(key: usize, begin: usize, end: usize, zone: Weak<dyn MemSpace>) {
    ZONES.lock().push(Entry {
        key,
        begin,
        end,
        zone,
    });
}

pub(crate) fn unregister(key: usize) {
    ZONES.lock().retain(|entry| entry.key != key);
}

/// Resolve a raw pointer to the zone that owns it.
///
/// Child buffers nest inside their parent's range, so the tightest
/// containing span wins. Returns `None` for pointers no live zone claims.
// TODO: switch the scan to an address-sorted range index if live zone
// counts grow past a handful.
pub fn find(ptr: *const u8) -> Option<Arc<dyn MemSpace>> {
    let addr = ptr as usize;
    let zones = ZONES.lock();

    let mut best: Option<(usize, Arc<dyn MemSpace>)> = None;
    for entry in zones.iter() {
        if addr < entry.begin || addr >= entry.end {
            continue;
        }
        if let Some(zone) = entry.zone.upgrade() {
            let span = entry.end - entry.begin;
            if best.as_ref().map_or(true, |(best_span, _)| span < *best_span) {
                best = Some((span, zone));
            }
        }
    }

    best.map(|(_, zone)| zone)
}

/// Number of live zones currently registered.
pub fn len() -> usize {
    let zones = ZONES.lock();
    zones
        .iter()
        .filter(|entry| entry.zone.strong_count() > 0)
        .count()
}

/// Name and counters of every live zone, for leak auditing and telemetry.
pub fn snapshot() -> Vec<(String, AllocatorStats)> {
    let zones = ZONES.lock();
    zones
        .iter()
        .filter_map(|entry| entry.zone.upgrade())
        .map(|zone| (zone.name().to_owned(), zone.stats()))
        .collect()
}
