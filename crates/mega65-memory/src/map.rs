//! The 4510 `MAP` instruction with the MEGA65 megabyte extension.
//!
//! `MAP` loads the mapper from the four CPU registers:
//!
//! | Reg | Bits 7-4                  | Bits 3-0                  |
//! |-----|---------------------------|---------------------------|
//! | A   | low offset bits 15-12     | low offset bits 11-8      |
//! | X   | map enable, blocks 3-0    | low offset bits 19-16     |
//! | Y   | high offset bits 15-12    | high offset bits 11-8     |
//! | Z   | map enable, blocks 7-4    | high offset bits 19-16    |
//!
//! `X = $0F` instead loads A into the low megabyte register, leaving the
//! low offset and enables alone; `Z = $0F` does the same for Y and the
//! high half. Blocks 0-3 ($0000-$7FFF) use the low half, blocks 4-7 the
//! high half.
//!
//! A mapped CPU address translates to
//! `(base & $FF00000) + ((base + addr) & $FFFFF)` with
//! `base = megabyte << 20 + offset`: the offset wraps inside its megabyte.

use crate::bank::{BankPolicy, ZONES};
use log::debug;

/// Mapper state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapConfig {
    pub megabyte_low: u8,
    /// Byte offset, bits 19-8.
    pub offset_low: u32,
    pub megabyte_high: u8,
    pub offset_high: u32,
    /// Bit n set: 8K block n is mapped.
    pub block_mask: u8,
}

impl MapConfig {
    /// Apply one `MAP` instruction to this state.
    #[must_use]
    pub fn decode(self, a: u8, x: u8, y: u8, z: u8) -> Self {
        let mut next = self;
        if x == 0x0F {
            next.megabyte_low = a;
        } else {
            next.offset_low = (u32::from(x & 0x0F) << 16) | (u32::from(a) << 8);
            next.block_mask = (next.block_mask & 0xF0) | (x >> 4);
        }
        if z == 0x0F {
            next.megabyte_high = y;
        } else {
            next.offset_high = (u32::from(z & 0x0F) << 16) | (u32::from(y) << 8);
            next.block_mask = (next.block_mask & 0x0F) | (z & 0xF0);
        }
        next
    }

    #[must_use]
    pub const fn is_mapped(&self, block: usize) -> bool {
        self.block_mask & (1 << block) != 0
    }

    /// Translation base (`megabyte << 20 + offset`) of an 8K block.
    #[must_use]
    pub fn block_base(&self, block: usize) -> u32 {
        if block < 4 {
            (u32::from(self.megabyte_low) << 20) + self.offset_low
        } else {
            (u32::from(self.megabyte_high) << 20) + self.offset_high
        }
    }

    /// Linear address of `cpu_addr`, or `None` if its block is not mapped.
    #[must_use]
    pub fn translate(&self, cpu_addr: u16) -> Option<u32> {
        let block = usize::from(cpu_addr >> 13);
        self.is_mapped(block)
            .then(|| translate(self.block_base(block), cpu_addr))
    }

    /// The six hypervisor save registers ($D64A-$D64F).
    #[must_use]
    pub fn saved_registers(&self) -> [u8; 6] {
        [
            ((self.offset_low >> 16) & 0x0F) as u8 | ((self.block_mask & 0x0F) << 4),
            (self.offset_low >> 8) as u8,
            ((self.offset_high >> 16) & 0x0F) as u8 | (self.block_mask & 0xF0),
            (self.offset_high >> 8) as u8,
            self.megabyte_low,
            self.megabyte_high,
        ]
    }

    /// Inverse of [`saved_registers`](Self::saved_registers).
    #[must_use]
    pub fn from_saved_registers(regs: [u8; 6]) -> Self {
        Self {
            offset_low: (u32::from(regs[0] & 0x0F) << 16) | (u32::from(regs[1]) << 8),
            offset_high: (u32::from(regs[2] & 0x0F) << 16) | (u32::from(regs[3]) << 8),
            block_mask: (regs[0] >> 4) | (regs[2] & 0xF0),
            megabyte_low: regs[4],
            megabyte_high: regs[5],
        }
    }
}

/// Translate a CPU address through a block base.
#[must_use]
pub const fn translate(base: u32, cpu_addr: u16) -> u32 {
    (base & 0xFF0_0000) + (base.wrapping_add(cpu_addr as u32) & 0xF_FFFF)
}

/// Effective policy of a 4K zone once `MAP` is taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZonePolicy {
    /// Legacy banking applies.
    Bank(BankPolicy),
    /// Mapped: translation base of the zone's block.
    Linear(u32),
}

/// Merge the mapper with the legacy policy of one zone. Mapping wins.
#[must_use]
pub fn effective_zone(config: &MapConfig, bank: &[BankPolicy; ZONES], zone: usize) -> ZonePolicy {
    let block = zone / 2;
    if config.is_mapped(block) {
        ZonePolicy::Linear(config.block_base(block))
    } else {
        ZonePolicy::Bank(bank[zone])
    }
}

#[must_use]
pub fn effective_zones(config: &MapConfig, bank: &[BankPolicy; ZONES]) -> [ZonePolicy; ZONES] {
    std::array::from_fn(|zone| effective_zone(config, bank, zone))
}

/// `MAP`/`EOM` state machine.
#[derive(Debug, Default)]
pub struct MapEngine {
    config: MapConfig,
    inhibit_interrupts: bool,
}

impl MapEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute `MAP`. Interrupts stay inhibited until the next `EOM`.
    /// Returns whether the mapping changed.
    pub fn apply(&mut self, a: u8, x: u8, y: u8, z: u8) -> bool {
        self.inhibit_interrupts = true;
        let next = self.config.decode(a, x, y, z);
        debug!("MAP A=${a:02X} X=${x:02X} Y=${y:02X} Z=${z:02X} -> {next:?}");
        self.install(next)
    }

    /// Execute `EOM` (NOP). Returns whether it closed a `MAP` sequence.
    pub fn commit(&mut self) -> bool {
        let was_map = std::mem::take(&mut self.inhibit_interrupts);
        if was_map {
            debug!("EOM: interrupts enabled");
        }
        was_map
    }

    /// Install a whole configuration without touching the interrupt state.
    pub fn set_config(&mut self, config: MapConfig) -> bool {
        self.install(config)
    }

    fn install(&mut self, config: MapConfig) -> bool {
        let changed = config != self.config;
        self.config = config;
        changed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub const fn config(&self) -> &MapConfig {
        &self.config
    }

    #[must_use]
    pub const fn interrupts_inhibited(&self) -> bool {
        self.inhibit_interrupts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_follows_register_layout() {
        let config = MapConfig::default().decode(0x45, 0x23, 0x80, 0x31);
        assert_eq!(config.offset_low, 0x3_4500);
        assert_eq!(config.offset_high, 0x1_8000);
        assert_eq!(config.block_mask, 0x32);
        assert!(config.is_mapped(1));
        assert!(!config.is_mapped(0));
        assert!(config.is_mapped(4));
        assert!(config.is_mapped(5));
    }

    #[test]
    fn megabyte_form_keeps_offsets() {
        let mapped = MapConfig::default().decode(0x45, 0x23, 0x00, 0x00);
        let config = mapped.decode(0x81, 0x0F, 0xFF, 0x0F);
        assert_eq!(config.megabyte_low, 0x81);
        assert_eq!(config.megabyte_high, 0xFF);
        assert_eq!(config.offset_low, 0x3_4500);
        assert_eq!(config.block_mask, 0x02);
    }

    #[test]
    fn translation_wraps_in_megabyte() {
        assert_eq!(translate(0x813_4500, 0x2000), 0x813_6500);
        assert_eq!(translate(0x80F_F000, 0x2000), 0x800_1000);
        assert_eq!(translate(0x000_0000, 0x1234), 0x1234);
    }

    #[test]
    fn saved_registers_round_trip() {
        let config = MapConfig {
            megabyte_low: 0x81,
            offset_low: 0xA_B200,
            megabyte_high: 0xFF,
            offset_high: 0x3_0000,
            block_mask: 0xC5,
        };
        let regs = config.saved_registers();
        assert_eq!(regs, [0x5A, 0xB2, 0xC3, 0x00, 0x81, 0xFF]);
        assert_eq!(MapConfig::from_saved_registers(regs), config);
    }

    #[test]
    fn eom_without_map_is_plain_nop() {
        let mut engine = MapEngine::new();
        assert!(!engine.commit());
        engine.apply(0, 0, 0, 0);
        assert!(engine.interrupts_inhibited());
        assert!(engine.commit());
        assert!(!engine.interrupts_inhibited());
        assert!(!engine.commit());
    }

    #[test]
    fn mapping_overrides_bank_policy() {
        let bank = [BankPolicy::LegacyIo; ZONES];
        let config = MapConfig::default().decode(0x00, 0x00, 0x00, 0x80);
        let zones = effective_zones(&config, &bank);
        assert_eq!(zones[0xD], ZonePolicy::Bank(BankPolicy::LegacyIo));
        assert_eq!(zones[0xE], ZonePolicy::Linear(0));
        assert_eq!(zones[0xF], ZonePolicy::Linear(0));
    }
}
