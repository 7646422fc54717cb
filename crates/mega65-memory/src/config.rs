//! Mapper configuration.

use crate::error::{MemoryError, UnmappedPolicy};

/// Default auxiliary ("slow") RAM size: 8 MiB.
pub const DEFAULT_SLOW_RAM_SIZE: u32 = 8 << 20;

/// Largest auxiliary RAM that fits between $8000000 and the high I/O megabyte.
pub const MAX_SLOW_RAM_SIZE: u32 = 0x7E0_0000;

/// I/O register personality of the legacy $D000 window.
///
/// The linear I/O area at $FFD0000 holds one 4K register set per layout;
/// the selector picks which one the CPU sees at $D000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IoLayout {
    /// C64 (VIC-II) register set.
    #[default]
    Vic2,
    /// C65 (VIC-III) register set.
    Vic3,
    /// MEGA65 (VIC-IV) register set.
    Vic4,
}

impl IoLayout {
    /// 4K block index within the linear I/O area.
    #[must_use]
    pub const fn selector(self) -> u8 {
        match self {
            Self::Vic2 => 0,
            Self::Vic3 => 1,
            Self::Vic4 => 3,
        }
    }

    /// Decode a 2-bit selector. The unused value 2 falls back to VIC-III.
    #[must_use]
    pub const fn from_selector(selector: u8) -> Self {
        match selector & 3 {
            0 => Self::Vic2,
            1 | 2 => Self::Vic3,
            _ => Self::Vic4,
        }
    }
}

/// Configuration for constructing a [`Mega65Memory`](crate::Mega65Memory).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryConfig {
    /// Auxiliary RAM at $8000000, in bytes. Multiple of 256.
    pub slow_ram_size: u32,
    /// Shadow ROM ($20000-$3FFFF) starts write-protected.
    pub rom_protect: bool,
    /// Initial I/O layout.
    pub io_layout: IoLayout,
    /// Initial handling of unmapped accesses.
    pub unmapped: UnmappedPolicy,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            slow_ram_size: DEFAULT_SLOW_RAM_SIZE,
            rom_protect: false,
            io_layout: IoLayout::default(),
            unmapped: UnmappedPolicy::default(),
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.slow_ram_size == 0 || self.slow_ram_size > MAX_SLOW_RAM_SIZE {
            return Err(MemoryError::configuration(format!(
                "slow RAM size {:#X} outside 1..={MAX_SLOW_RAM_SIZE:#X}",
                self.slow_ram_size
            )));
        }
        if self.slow_ram_size % 0x100 != 0 {
            return Err(MemoryError::configuration(format!(
                "slow RAM size {:#X} is not a whole number of pages",
                self.slow_ram_size
            )));
        }
        Ok(())
    }
}
