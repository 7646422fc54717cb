//! Legacy banking: the 6510-style CPU port and the VIC-III ROM select.
//!
//! The composite port code is `(data | !ddr) & 7`. Bits of $D030 (masked
//! with [`ROM_SELECT_MASK`]) overlay C65 ROM images on top of it:
//!
//! | Zone          | ROM select bit      | Port code                                   |
//! |---------------|---------------------|---------------------------------------------|
//! | $8000-$9FFF   | 3: C65 ROM $38000   | RAM                                         |
//! | $A000-$BFFF   | 4: C65 ROM $3A000   | 3,7: BASIC; else RAM                        |
//! | $C000-$CFFF   | 5: C65 ROM $2C000   | RAM                                         |
//! | $D000-$DFFF   | none                | 0,4: RAM; 1,2,3: CHARGEN; 5,6,7: I/O        |
//! | $E000-$FFFF   | 7: C65 ROM $3E000   | 2,3,6,7: KERNAL; else RAM                   |
//!
//! A set ROM select bit wins over the port. The ROM select is ignored in
//! privileged mode. Everything below $8000 is always RAM.

use log::debug;

/// $D030 bits that select ROM images.
pub const ROM_SELECT_MASK: u8 = 0xB8;

const ROM_AT_8000: u8 = 0x08;
const ROM_AT_A000: u8 = 0x10;
const ROM_AT_C000: u8 = 0x20;
const ROM_AT_E000: u8 = 0x80;

/// Number of 4K zones in the CPU address space.
pub const ZONES: usize = 16;

/// First zone of each banked area, in the order [`BankEngine::bank_policies`]
/// reports them.
pub const BANKED_ZONES: [usize; 5] = [0x8, 0xA, 0xC, 0xD, 0xE];

/// A ROM image inside shadow ROM and the CPU address it appears at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomBank {
    pub image_base: u32,
    pub cpu_base: u16,
    /// Writes go to the RAM under the ROM instead of the image.
    pub writes_through: bool,
}

impl RomBank {
    pub const C65_8000: Self = Self::c65(0x3_8000, 0x8000);
    pub const C65_A000: Self = Self::c65(0x3_A000, 0xA000);
    pub const C65_C000: Self = Self::c65(0x2_C000, 0xC000);
    pub const C65_E000: Self = Self::c65(0x3_E000, 0xE000);
    pub const BASIC: Self = Self::c64(0x2_A000, 0xA000);
    pub const CHARGEN: Self = Self::c64(0x2_D000, 0xD000);
    pub const KERNAL: Self = Self::c64(0x2_E000, 0xE000);

    const fn c65(image_base: u32, cpu_base: u16) -> Self {
        Self {
            image_base,
            cpu_base,
            writes_through: false,
        }
    }

    const fn c64(image_base: u32, cpu_base: u16) -> Self {
        Self {
            image_base,
            cpu_base,
            writes_through: true,
        }
    }

    /// Linear address of the image byte shown at `cpu_addr`. The offset
    /// wraps inside the 8K window, so the result stays in shadow ROM for
    /// any `cpu_addr`.
    #[must_use]
    pub const fn image_address(self, cpu_addr: u16) -> u32 {
        self.image_base + (cpu_addr.wrapping_sub(self.cpu_base) & 0x1FFF) as u32
    }
}

/// Legacy policy of one 4K zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankPolicy {
    Ram,
    ShadowRom(RomBank),
    /// The I/O window in the current layout.
    LegacyIo,
}

/// Composite port code from the direction and data registers.
#[must_use]
pub const fn port_code(ddr: u8, data: u8) -> u8 {
    (data | !ddr) & 7
}

/// Policy of `zone` (0-15) for a port code and an effective ROM select.
#[must_use]
pub fn zone_policy(zone: usize, code: u8, rom_select: u8) -> BankPolicy {
    let code = code & 7;
    match zone {
        0x8 | 0x9 if rom_select & ROM_AT_8000 != 0 => BankPolicy::ShadowRom(RomBank::C65_8000),
        0xA | 0xB if rom_select & ROM_AT_A000 != 0 => BankPolicy::ShadowRom(RomBank::C65_A000),
        0xA | 0xB if matches!(code, 3 | 7) => BankPolicy::ShadowRom(RomBank::BASIC),
        0xC if rom_select & ROM_AT_C000 != 0 => BankPolicy::ShadowRom(RomBank::C65_C000),
        0xD => match code {
            0 | 4 => BankPolicy::Ram,
            1..=3 => BankPolicy::ShadowRom(RomBank::CHARGEN),
            _ => BankPolicy::LegacyIo,
        },
        0xE | 0xF if rom_select & ROM_AT_E000 != 0 => BankPolicy::ShadowRom(RomBank::C65_E000),
        0xE | 0xF if matches!(code, 2 | 3 | 6 | 7) => BankPolicy::ShadowRom(RomBank::KERNAL),
        _ => BankPolicy::Ram,
    }
}

/// Policies of all 16 zones.
#[must_use]
pub fn policy_table(code: u8, rom_select: u8) -> [BankPolicy; ZONES] {
    std::array::from_fn(|zone| zone_policy(zone, code, rom_select))
}

/// Tracks the banking inputs and the policy table they produce.
pub struct BankEngine {
    ddr: u8,
    data: u8,
    rom_select: u8,
    privileged: bool,
    /// (port code, effective ROM select) the table was built from.
    inputs: (u8, u8),
    policies: [BankPolicy; ZONES],
}

impl Default for BankEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BankEngine {
    /// Power-on state: DDR and data both 7, no ROM selected, unprivileged.
    #[must_use]
    pub fn new() -> Self {
        let inputs = (port_code(7, 7), 0);
        Self {
            ddr: 7,
            data: 7,
            rom_select: 0,
            privileged: false,
            inputs,
            policies: policy_table(inputs.0, inputs.1),
        }
    }

    /// Store a port register (0 = DDR, 1 = data). Returns whether any zone
    /// policy changed.
    pub fn write_port(&mut self, reg: u8, value: u8) -> bool {
        if reg & 1 == 0 {
            self.ddr = value;
        } else {
            self.data = value;
        }
        self.rebuild()
    }

    pub fn set_port(&mut self, ddr: u8, data: u8) -> bool {
        self.ddr = ddr;
        self.data = data;
        self.rebuild()
    }

    /// Store the ROM select register; bits outside [`ROM_SELECT_MASK`] are
    /// dropped.
    pub fn set_rom_select(&mut self, value: u8) -> bool {
        self.rom_select = value & ROM_SELECT_MASK;
        self.rebuild()
    }

    pub fn set_privileged(&mut self, privileged: bool) -> bool {
        self.privileged = privileged;
        self.rebuild()
    }

    fn rebuild(&mut self) -> bool {
        let inputs = (self.code(), self.effective_rom_select());
        if inputs == self.inputs {
            return false;
        }
        self.inputs = inputs;
        let policies = policy_table(inputs.0, inputs.1);
        let changed = policies != self.policies;
        if changed {
            debug!(
                "banking: port code {} ROM select ${:02X} -> {:?}",
                inputs.0,
                inputs.1,
                self.bank_policies()
            );
        }
        self.policies = policies;
        changed
    }

    #[must_use]
    pub fn port(&self, reg: u8) -> u8 {
        if reg & 1 == 0 { self.ddr } else { self.data }
    }

    #[must_use]
    pub const fn code(&self) -> u8 {
        port_code(self.ddr, self.data)
    }

    /// ROM select as last written (masked).
    #[must_use]
    pub const fn rom_select(&self) -> u8 {
        self.rom_select
    }

    /// ROM select as the policy table sees it.
    #[must_use]
    pub const fn effective_rom_select(&self) -> u8 {
        if self.privileged { 0 } else { self.rom_select }
    }

    #[must_use]
    pub const fn privileged(&self) -> bool {
        self.privileged
    }

    #[must_use]
    pub fn policy(&self, zone: usize) -> BankPolicy {
        self.policies[zone]
    }

    #[must_use]
    pub fn policies(&self) -> &[BankPolicy; ZONES] {
        &self.policies
    }

    /// Policies of the five banked areas, $8000 through $E000.
    #[must_use]
    pub fn bank_policies(&self) -> [BankPolicy; 5] {
        BANKED_ZONES.map(|zone| self.policies[zone])
    }
}
