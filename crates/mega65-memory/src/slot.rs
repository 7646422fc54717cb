//! Lazily resolved address slots.
//!
//! One slot per CPU page plus a few special slots for DMA, flat addressing
//! and the monitor. A slot is `None` until the first access after an
//! invalidation fills it with the routes for its page. Special slots carry
//! the linear page they were resolved for and refill when a different page
//! is presented.

use bitflags::bitflags;

/// Reader/writer selected for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Linear page 0: bytes 0 and 1 are the CPU port.
    ZeroPage,
    /// Chip RAM, shadow ROM and extra RAM.
    MainRam,
    /// Chip RAM window onto colour RAM.
    SharedColour,
    ColourRam,
    SlowRam,
    SlowDevice,
    CharWom,
    /// Linear I/O area, all layouts.
    Io,
    /// CPU $D000 window, offset by the layout at access time.
    LegacyIo,
    DiskBuffer,
    I2c,
    Ethernet,
    HypervisorRam,
    /// Reads $FF, ignores writes.
    Dummy,
    Unmapped,
}

/// A handler and the address of the first byte of its page.
///
/// The base is linear, except for [`Handler::LegacyIo`] where it is the
/// CPU page address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub handler: Handler,
    pub base: u32,
}

impl Route {
    #[must_use]
    pub const fn new(handler: Handler, base: u32) -> Self {
        Self { handler, base }
    }
}

bitflags! {
    /// State baked into a resolution besides the zone policy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SlotDeps: u8 {
        /// Picked real or dummy storage based on privilege.
        const PRIVILEGE = 0x01;
        /// Picked RAM or dummy writes based on shadow ROM protection.
        const ROM_PROTECT = 0x02;
    }
}

/// Cached routes of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub read: Route,
    pub write: Route,
    pub deps: SlotDeps,
}

impl Resolved {
    /// Same route for both directions.
    #[must_use]
    pub const fn both(route: Route, deps: SlotDeps) -> Self {
        Self {
            read: route,
            write: route,
            deps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    /// CPU page $xx00-$xxFF.
    Page(u8),
    DmaList,
    DmaSourceRead,
    DmaSourceWrite,
    DmaTargetRead,
    DmaTargetWrite,
    Flat,
    Debug,
}

impl SlotId {
    pub const SPECIAL: [Self; 7] = [
        Self::DmaList,
        Self::DmaSourceRead,
        Self::DmaSourceWrite,
        Self::DmaTargetRead,
        Self::DmaTargetWrite,
        Self::Flat,
        Self::Debug,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Page(page) => page as usize,
            Self::DmaList => 256,
            Self::DmaSourceRead => 257,
            Self::DmaSourceWrite => 258,
            Self::DmaTargetRead => 259,
            Self::DmaTargetWrite => 260,
            Self::Flat => 261,
            Self::Debug => 262,
        }
    }

    const fn from_index(index: usize) -> Self {
        match index {
            0..=255 => Self::Page(index as u8),
            256 => Self::DmaList,
            257 => Self::DmaSourceRead,
            258 => Self::DmaSourceWrite,
            259 => Self::DmaTargetRead,
            260 => Self::DmaTargetWrite,
            261 => Self::Flat,
            _ => Self::Debug,
        }
    }
}

const SLOT_COUNT: usize = 263;

#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Page address the slot was resolved for.
    key: u32,
    resolved: Resolved,
}

pub struct SlotCache {
    slots: [Option<Entry>; SLOT_COUNT],
    resolves: u64,
}

impl Default for SlotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: [None; SLOT_COUNT],
            resolves: 0,
        }
    }

    /// Cached routes for `id` if it was resolved for page `key`.
    #[must_use]
    pub fn get(&self, id: SlotId, key: u32) -> Option<Resolved> {
        self.slots[id.index()]
            .filter(|entry| entry.key == key)
            .map(|entry| entry.resolved)
    }

    pub fn fill(&mut self, id: SlotId, key: u32, resolved: Resolved) {
        self.resolves += 1;
        self.slots[id.index()] = Some(Entry { key, resolved });
    }

    /// Drop the 16 page slots of 4K zone `zone`.
    pub fn invalidate_zone(&mut self, zone: usize) {
        let first = zone * 16;
        self.slots[first..first + 16].fill(None);
    }

    /// Drop every slot whose resolution depends on any of `deps`. Returns
    /// how many were dropped.
    pub fn invalidate_where(&mut self, deps: SlotDeps) -> usize {
        let mut dropped = 0;
        for slot in &mut self.slots {
            if slot.is_some_and(|entry| entry.resolved.deps.intersects(deps)) {
                *slot = None;
                dropped += 1;
            }
        }
        dropped
    }

    #[must_use]
    pub fn is_resolved(&self, id: SlotId) -> bool {
        self.slots[id.index()].is_some()
    }

    /// Resolved slots with the page each was resolved for.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, u32, &Resolved)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|entry| (SlotId::from_index(index), entry.key, &entry.resolved))
        })
    }

    /// Total fills since construction.
    #[must_use]
    pub const fn resolve_count(&self) -> u64 {
        self.resolves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram(base: u32, deps: SlotDeps) -> Resolved {
        Resolved::both(Route::new(Handler::MainRam, base), deps)
    }

    #[test]
    fn special_slot_misses_on_new_page() {
        let mut cache = SlotCache::new();
        cache.fill(SlotId::DmaSourceRead, 0x1000, ram(0x1000, SlotDeps::empty()));
        assert!(cache.get(SlotId::DmaSourceRead, 0x1000).is_some());
        assert!(cache.get(SlotId::DmaSourceRead, 0x1100).is_none());
        assert!(cache.get(SlotId::DmaSourceWrite, 0x1000).is_none());
    }

    #[test]
    fn zone_invalidation_covers_sixteen_pages() {
        let mut cache = SlotCache::new();
        for page in 0x9F..=0xB0u8 {
            let key = u32::from(page) << 8;
            cache.fill(SlotId::Page(page), key, ram(key, SlotDeps::empty()));
        }
        cache.invalidate_zone(0xA);
        assert!(cache.is_resolved(SlotId::Page(0x9F)));
        assert!((0xA0..=0xAF).all(|p| !cache.is_resolved(SlotId::Page(p))));
        assert!(cache.is_resolved(SlotId::Page(0xB0)));
    }

    #[test]
    fn tagged_invalidation_is_selective() {
        let mut cache = SlotCache::new();
        cache.fill(SlotId::Page(0x10), 0x1000, ram(0x1000, SlotDeps::empty()));
        cache.fill(SlotId::Page(0x20), 0x2000, ram(0x2000, SlotDeps::PRIVILEGE));
        cache.fill(SlotId::Debug, 0x3000, ram(0x3000, SlotDeps::ROM_PROTECT));
        assert_eq!(cache.invalidate_where(SlotDeps::PRIVILEGE), 1);
        assert!(cache.is_resolved(SlotId::Page(0x10)));
        assert!(!cache.is_resolved(SlotId::Page(0x20)));
        assert!(cache.is_resolved(SlotId::Debug));
        assert_eq!(cache.iter().count(), 2);
        assert_eq!(cache.resolve_count(), 3);
    }

    #[test]
    fn slot_indices_round_trip() {
        for id in SlotId::SPECIAL {
            assert_eq!(SlotId::from_index(id.index()), id);
        }
        assert_eq!(SlotId::from_index(0x42), SlotId::Page(0x42));
    }
}
