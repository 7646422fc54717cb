//! Static partition of the 28-bit linear address space.
//!
//! | Range               | Region                                   |
//! |---------------------|------------------------------------------|
//! | $0000000-$001F7FF   | Chip RAM                                 |
//! | $001F800-$001FFFF   | Chip RAM window onto colour RAM (2K)     |
//! | $0020000-$003FFFF   | Shadow ROM ("ROM RAM")                   |
//! | $0040000-$005FFFF   | Extra RAM                                |
//! | $0060000-$00FFFFF   | Reserved                                 |
//! | $4000000-$7FFFFFF   | Slow device (cartridge)                  |
//! | $8000000-...        | Slow RAM, then reserved up to $FDFFFFF   |
//! | $FF7E000-$FF7FFFF   | Character WOM                            |
//! | $FF80000-$FF87FFF   | Colour RAM (32K)                         |
//! | $FFD0000-$FFD3FFF   | I/O, one 4K register set per layout      |
//! | $FFD6000-$FFD6FFF   | Disk buffer (privileged)                 |
//! | $FFD7000-$FFD70FF   | I2C                                      |
//! | $FFDE800-$FFDEFFF   | Ethernet buffer                          |
//! | $FFF8000-$FFFBFFF   | Hypervisor RAM (privileged)              |
//!
//! Everything else is unmapped.

use crate::error::MemoryError;

/// Highest valid linear address.
pub const LINEAR_SPACE_END: u32 = 0x0FFF_FFFF;

pub const SHARED_COLOUR_START: u32 = 0x001_F800;
pub const ROM_RAM_START: u32 = 0x002_0000;
pub const EXTRA_RAM_START: u32 = 0x004_0000;
pub const MAIN_RAM_END: u32 = 0x005_FFFF;
pub const SLOW_DEVICE_START: u32 = 0x400_0000;
pub const SLOW_RAM_START: u32 = 0x800_0000;
pub const CHAR_WOM_START: u32 = 0xFF7_E000;
pub const COLOUR_RAM_START: u32 = 0xFF8_0000;
pub const IO_START: u32 = 0xFFD_0000;
pub const DISK_BUFFER_START: u32 = 0xFFD_6000;
pub const I2C_START: u32 = 0xFFD_7000;
pub const ETHERNET_START: u32 = 0xFFD_E800;
pub const HYPERVISOR_RAM_START: u32 = 0xFFF_8000;

/// What backs a linear region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    ChipRam,
    /// Chip RAM addresses that show the first 2K of colour RAM.
    SharedColourRam,
    /// Shadow ROM: RAM holding the ROM images, optionally write-protected.
    RomRam,
    ExtraRam,
    /// Decoded but empty: reads $FF, writes ignored.
    Reserved,
    /// No backing device at all.
    Unmapped,
    SlowDevice,
    SlowRam,
    CharWom,
    ColourRam,
    Io,
    DiskBuffer,
    I2c,
    Ethernet,
    HypervisorRam,
}

impl RegionKind {
    /// Regions whose contents are only visible in privileged mode.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::DiskBuffer | Self::HypervisorRam)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearRegion {
    pub start: u32,
    /// Inclusive.
    pub end: u32,
    pub kind: RegionKind,
}

impl LinearRegion {
    #[must_use]
    pub const fn new(start: u32, end: u32, kind: RegionKind) -> Self {
        Self { start, end, kind }
    }

    #[must_use]
    pub const fn contains(&self, address: u32) -> bool {
        address >= self.start && address <= self.end
    }
}

/// Ordered, gap-free table of linear regions.
#[derive(Debug, Clone)]
pub struct RegionMap {
    regions: Vec<LinearRegion>,
}

impl RegionMap {
    /// Build the standard table with `slow_ram_size` bytes of auxiliary RAM.
    pub fn new(slow_ram_size: u32) -> Result<Self, MemoryError> {
        use RegionKind::{
            CharWom, ChipRam, ColourRam, DiskBuffer, Ethernet, ExtraRam, HypervisorRam, I2c, Io,
            Reserved, RomRam, SharedColourRam, SlowDevice, SlowRam, Unmapped,
        };

        let slow_ram_end = SLOW_RAM_START
            .checked_add(slow_ram_size)
            .and_then(|end| end.checked_sub(1))
            .filter(|&end| end >= SLOW_RAM_START && end < 0xFE0_0000)
            .ok_or_else(|| {
                MemoryError::configuration(format!("slow RAM size {slow_ram_size:#X} out of range"))
            })?;

        let mut regions = vec![
            LinearRegion::new(0, SHARED_COLOUR_START - 1, ChipRam),
            LinearRegion::new(SHARED_COLOUR_START, ROM_RAM_START - 1, SharedColourRam),
            LinearRegion::new(ROM_RAM_START, EXTRA_RAM_START - 1, RomRam),
            LinearRegion::new(EXTRA_RAM_START, MAIN_RAM_END, ExtraRam),
            LinearRegion::new(MAIN_RAM_END + 1, 0x00F_FFFF, Reserved),
            LinearRegion::new(0x010_0000, SLOW_DEVICE_START - 1, Unmapped),
            LinearRegion::new(SLOW_DEVICE_START, SLOW_RAM_START - 1, SlowDevice),
            LinearRegion::new(SLOW_RAM_START, slow_ram_end, SlowRam),
        ];
        if slow_ram_end < 0xFDF_FFFF {
            regions.push(LinearRegion::new(slow_ram_end + 1, 0xFDF_FFFF, Reserved));
        }
        regions.extend_from_slice(&[
            LinearRegion::new(0xFE0_0000, CHAR_WOM_START - 1, Unmapped),
            LinearRegion::new(CHAR_WOM_START, COLOUR_RAM_START - 1, CharWom),
            LinearRegion::new(COLOUR_RAM_START, 0xFF8_7FFF, ColourRam),
            LinearRegion::new(0xFF8_8000, IO_START - 1, Unmapped),
            LinearRegion::new(IO_START, 0xFFD_3FFF, Io),
            LinearRegion::new(0xFFD_4000, DISK_BUFFER_START - 1, Unmapped),
            LinearRegion::new(DISK_BUFFER_START, I2C_START - 1, DiskBuffer),
            LinearRegion::new(I2C_START, 0xFFD_70FF, I2c),
            LinearRegion::new(0xFFD_7100, ETHERNET_START - 1, Unmapped),
            LinearRegion::new(ETHERNET_START, 0xFFD_EFFF, Ethernet),
            LinearRegion::new(0xFFD_F000, HYPERVISOR_RAM_START - 1, Unmapped),
            LinearRegion::new(HYPERVISOR_RAM_START, 0xFFF_BFFF, HypervisorRam),
            LinearRegion::new(0xFFF_C000, LINEAR_SPACE_END, Unmapped),
        ]);

        Self::from_regions(regions)
    }

    /// Check and adopt an arbitrary table.
    ///
    /// The table must start at 0, end at [`LINEAR_SPACE_END`], have no gaps
    /// or overlaps, and put every boundary on a 256-byte page.
    pub fn from_regions(regions: Vec<LinearRegion>) -> Result<Self, MemoryError> {
        let Some(first) = regions.first() else {
            return Err(MemoryError::configuration("region table is empty"));
        };
        if first.start != 0 {
            return Err(MemoryError::configuration(format!(
                "region table starts at ${:07X}, not $0000000",
                first.start
            )));
        }

        let mut next_start = 0u32;
        for region in &regions {
            if region.start != next_start {
                return Err(MemoryError::configuration(format!(
                    "{:?} region at ${:07X} leaves a gap or overlap (expected ${next_start:07X})",
                    region.kind, region.start
                )));
            }
            if region.end < region.start || region.end > LINEAR_SPACE_END {
                return Err(MemoryError::configuration(format!(
                    "{:?} region ${:07X}-${:07X} is malformed",
                    region.kind, region.start, region.end
                )));
            }
            if region.start & 0xFF != 0 || region.end & 0xFF != 0xFF {
                return Err(MemoryError::configuration(format!(
                    "{:?} region ${:07X}-${:07X} is not page aligned",
                    region.kind, region.start, region.end
                )));
            }
            next_start = region.end.wrapping_add(1);
        }

        if regions.last().map(|r| r.end) != Some(LINEAR_SPACE_END) {
            return Err(MemoryError::configuration(format!(
                "region table ends at ${:07X}, not ${LINEAR_SPACE_END:07X}",
                next_start.wrapping_sub(1)
            )));
        }

        Ok(Self { regions })
    }

    /// Region claiming `address`.
    ///
    /// # Panics
    ///
    /// Panics if `address` is above [`LINEAR_SPACE_END`].
    #[must_use]
    pub fn lookup(&self, address: u32) -> &LinearRegion {
        assert!(
            address <= LINEAR_SPACE_END,
            "linear address ${address:08X} outside the 28-bit space"
        );
        let index = self.regions.partition_point(|r| r.end < address);
        &self.regions[index]
    }

    #[must_use]
    pub fn regions(&self) -> &[LinearRegion] {
        &self.regions
    }
}
