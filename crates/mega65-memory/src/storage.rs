//! Backing stores.

use crate::region::{COLOUR_RAM_START, SHARED_COLOUR_START};

pub const MAIN_RAM_SIZE: usize = 0x6_0000;
pub const COLOUR_RAM_SIZE: usize = 0x8000;
pub const CHAR_WOM_SIZE: usize = 0x2000;
pub const HYPERVISOR_RAM_SIZE: usize = 0x4000;
pub const DISK_BUFFER_SIZE: usize = 0x1000;
pub const CARTRIDGE_SIZE: usize = 0x1_0000;

/// Every byte array the mapper routes to.
///
/// Colour RAM is a single buffer; the chip RAM window at $1F800 reaches its
/// first 2K through [`colour_index`].
pub(crate) struct Storage {
    /// Chip RAM, shadow ROM and extra RAM: linear $00000-$5FFFF.
    pub main_ram: Box<[u8]>,
    pub colour_ram: Box<[u8]>,
    pub char_wom: Box<[u8]>,
    pub hypervisor_ram: Box<[u8]>,
    pub disk_buffer: Box<[u8]>,
    pub slow_ram: Box<[u8]>,
    /// Cartridge image, empty when none is inserted.
    pub cartridge: Vec<u8>,
}

impl Storage {
    pub fn new(slow_ram_size: u32) -> Self {
        Self {
            main_ram: filled(MAIN_RAM_SIZE),
            colour_ram: filled(COLOUR_RAM_SIZE),
            char_wom: filled(CHAR_WOM_SIZE),
            hypervisor_ram: filled(HYPERVISOR_RAM_SIZE),
            disk_buffer: filled(DISK_BUFFER_SIZE),
            slow_ram: filled(slow_ram_size as usize),
            cartridge: Vec::new(),
        }
    }
}

fn filled(len: usize) -> Box<[u8]> {
    vec![0xFF; len].into_boxed_slice()
}

/// Colour RAM index for an address in either colour RAM window.
///
/// Callers only pass addresses from the shared 2K chip RAM window or the
/// 32K colour RAM region.
pub(crate) const fn colour_index(linear: u32) -> usize {
    if linear < COLOUR_RAM_START {
        (linear - SHARED_COLOUR_START) as usize
    } else {
        (linear - COLOUR_RAM_START) as usize
    }
}
