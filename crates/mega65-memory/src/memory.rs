//! The MEGA65 memory mapper.
//!
//! Every CPU access goes through a page slot. A slot resolves once, from
//! the MAP state, the legacy bank policy and the region table, and keeps
//! its routes until a configuration change drops it. Linear accesses from
//! DMA, flat addressing and the monitor use special slots keyed by the
//! linear page.
//!
//! Invalidation rules:
//!
//! - port, ROM select, MAP, `set_map_config` and reset drop the zones whose
//!   effective policy changed;
//! - privilege changes drop slots tagged [`SlotDeps::PRIVILEGE`] as well;
//! - ROM protection changes drop slots tagged [`SlotDeps::ROM_PROTECT`];
//! - layout changes and `EOM` drop nothing.

use crate::bank::{BankEngine, BankPolicy, ZONES};
use crate::config::{IoLayout, MemoryConfig};
use crate::error::{AbortOnUnmapped, MemoryError, UnmappedPolicy, UnmappedPrompt};
use crate::io::{IoDispatcher, IoEffect, NullIo};
use crate::map::{self, MapConfig, MapEngine, ZonePolicy};
use crate::region::{IO_START, LINEAR_SPACE_END, RegionKind, RegionMap, SHARED_COLOUR_START};
use crate::slot::{Handler, Resolved, Route, SlotCache, SlotDeps, SlotId};
use crate::storage::{CARTRIDGE_SIZE, COLOUR_RAM_SIZE, Storage, colour_index};
use emu_core::{Bus, LinearBus};
use log::{debug, error, trace};

/// Whose view a resolution is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum View {
    /// Running code: privilege masking and ROM protection apply.
    Cpu,
    /// Monitor: always the real store.
    Inspect,
}

pub struct Mega65Memory<I: IoDispatcher = NullIo> {
    pub(crate) regions: RegionMap,
    pub(crate) storage: Storage,
    pub(crate) bank: BankEngine,
    pub(crate) map: MapEngine,
    pub(crate) slots: SlotCache,
    /// Effective zone policies the page slots were last validated against.
    zones: [ZonePolicy; ZONES],
    pub(crate) io: I,
    pub(crate) layout: IoLayout,
    rom_protect: bool,
    pub(crate) unmapped: UnmappedPolicy,
    pub(crate) prompt: Box<dyn UnmappedPrompt>,
    pub(crate) fault: Option<MemoryError>,
    speed_request: Option<bool>,
    pub(crate) pc: u16,
}

impl Mega65Memory<NullIo> {
    /// Default configuration with no chips attached.
    pub fn with_defaults() -> Result<Self, MemoryError> {
        Self::new(&MemoryConfig::default(), NullIo)
    }
}

impl<I: IoDispatcher> Mega65Memory<I> {
    pub fn new(config: &MemoryConfig, io: I) -> Result<Self, MemoryError> {
        config.validate()?;
        let regions = RegionMap::new(config.slow_ram_size)?;
        let bank = BankEngine::new();
        let map = MapEngine::new();
        let zones = map::effective_zones(map.config(), bank.policies());
        debug!(
            "memory: {} regions, {} KiB slow RAM",
            regions.regions().len(),
            config.slow_ram_size >> 10
        );
        Ok(Self {
            regions,
            storage: Storage::new(config.slow_ram_size),
            bank,
            map,
            slots: SlotCache::new(),
            zones,
            io,
            layout: config.io_layout,
            rom_protect: config.rom_protect,
            unmapped: config.unmapped,
            prompt: Box::new(AbortOnUnmapped),
            fault: None,
            speed_request: None,
            pc: 0,
        })
    }

    /// Replace the prompt consulted on unmapped accesses.
    pub fn set_unmapped_prompt<P: UnmappedPrompt + 'static>(&mut self, prompt: P) {
        self.prompt = Box::new(prompt);
    }

    pub fn set_unmapped_policy(&mut self, policy: UnmappedPolicy) {
        self.unmapped = policy;
    }

    #[must_use]
    pub fn unmapped_policy(&self) -> UnmappedPolicy {
        self.unmapped
    }

    // --- resolution -------------------------------------------------------

    /// Routes for the linear page containing `address`.
    pub(crate) fn resolve_linear(&self, address: u32, view: View) -> Resolved {
        let base = address & !0xFF;
        let route = |handler| Route::new(handler, base);
        if base == 0 {
            // Linear $0000000-$00000FF: bytes 0 and 1 are the CPU port for
            // every path, including mapped blocks, DMA and the monitor.
            return Resolved::both(route(Handler::ZeroPage), SlotDeps::empty());
        }
        let inspect = view == View::Inspect;
        let kind = self.regions.lookup(base).kind;

        if kind.is_privileged() {
            let real = if kind == RegionKind::DiskBuffer {
                Handler::DiskBuffer
            } else {
                Handler::HypervisorRam
            };
            return if inspect {
                Resolved::both(route(real), SlotDeps::empty())
            } else if self.bank.privileged() {
                Resolved::both(route(real), SlotDeps::PRIVILEGE)
            } else {
                Resolved::both(route(Handler::Dummy), SlotDeps::PRIVILEGE)
            };
        }

        let plain = |handler| Resolved::both(route(handler), SlotDeps::empty());
        match kind {
            RegionKind::ChipRam | RegionKind::ExtraRam => plain(Handler::MainRam),
            RegionKind::RomRam if inspect => plain(Handler::MainRam),
            RegionKind::RomRam => Resolved {
                read: route(Handler::MainRam),
                write: route(if self.rom_protect {
                    Handler::Dummy
                } else {
                    Handler::MainRam
                }),
                deps: SlotDeps::ROM_PROTECT,
            },
            RegionKind::SharedColourRam => plain(Handler::SharedColour),
            RegionKind::Reserved => plain(Handler::Dummy),
            RegionKind::Unmapped if inspect => plain(Handler::Dummy),
            RegionKind::Unmapped => plain(Handler::Unmapped),
            RegionKind::SlowDevice => plain(Handler::SlowDevice),
            RegionKind::SlowRam => plain(Handler::SlowRam),
            RegionKind::CharWom => Resolved {
                read: route(if inspect {
                    Handler::CharWom
                } else {
                    Handler::Dummy
                }),
                write: route(Handler::CharWom),
                deps: SlotDeps::empty(),
            },
            RegionKind::ColourRam => plain(Handler::ColourRam),
            RegionKind::Io => plain(Handler::Io),
            RegionKind::I2c => Resolved {
                read: route(Handler::I2c),
                write: route(Handler::Dummy),
                deps: SlotDeps::empty(),
            },
            RegionKind::Ethernet => plain(Handler::Ethernet),
            RegionKind::DiskBuffer | RegionKind::HypervisorRam => plain(Handler::Dummy),
        }
    }

    /// Routes for CPU page `page` under the current configuration.
    pub(crate) fn resolve_cpu(&self, page: u8, view: View) -> Resolved {
        let zone = usize::from(page >> 4);
        let page_addr = u16::from(page) << 8;
        match map::effective_zone(self.map.config(), self.bank.policies(), zone) {
            ZonePolicy::Linear(base) => self.resolve_linear(map::translate(base, page_addr), view),
            ZonePolicy::Bank(BankPolicy::Ram) => self.resolve_linear(u32::from(page_addr), view),
            ZonePolicy::Bank(BankPolicy::ShadowRom(bank)) => {
                let image = self.resolve_linear(bank.image_address(page_addr), view);
                if bank.writes_through {
                    let ram = self.resolve_linear(u32::from(page_addr), view);
                    Resolved {
                        read: image.read,
                        write: ram.write,
                        deps: image.deps | ram.deps,
                    }
                } else {
                    image
                }
            }
            ZonePolicy::Bank(BankPolicy::LegacyIo) => Resolved::both(
                Route::new(Handler::LegacyIo, u32::from(page_addr)),
                SlotDeps::empty(),
            ),
        }
    }

    fn cpu_slot(&mut self, page: u8) -> Resolved {
        let id = SlotId::Page(page);
        let key = u32::from(page) << 8;
        if let Some(resolved) = self.slots.get(id, key) {
            return resolved;
        }
        let resolved = self.resolve_cpu(page, View::Cpu);
        self.slots.fill(id, key, resolved);
        resolved
    }

    fn linear_slot(&mut self, id: SlotId, address: u32, view: View) -> Resolved {
        let key = address & !0xFF;
        if let Some(resolved) = self.slots.get(id, key) {
            return resolved;
        }
        let resolved = self.resolve_linear(key, view);
        self.slots.fill(id, key, resolved);
        resolved
    }

    fn check_linear(&self, address: u32) -> u32 {
        if address > LINEAR_SPACE_END {
            let err = MemoryError::ImpossibleAddress {
                address,
                pc: self.pc,
            };
            error!("{err}");
            panic!("{err}");
        }
        address
    }

    pub(crate) fn linear_read(&mut self, id: SlotId, address: u32, view: View) -> u8 {
        let address = self.check_linear(address);
        let resolved = self.linear_slot(id, address, view);
        self.read_route(resolved.read, address as u8)
    }

    pub(crate) fn linear_write(&mut self, id: SlotId, address: u32, value: u8, view: View) {
        let address = self.check_linear(address);
        let resolved = self.linear_slot(id, address, view);
        self.write_route(resolved.write, address as u8, value);
    }

    /// Re-derive the effective zone policies and drop the page slots of
    /// every zone that changed.
    fn refresh_zones(&mut self) {
        let zones = map::effective_zones(self.map.config(), self.bank.policies());
        for (zone, (old, new)) in self.zones.iter().zip(&zones).enumerate() {
            if old != new {
                trace!("zone ${zone:X}000: {old:?} -> {new:?}");
                self.slots.invalidate_zone(zone);
            }
        }
        self.zones = zones;
    }

    // --- CPU path ---------------------------------------------------------

    pub fn cpu_read(&mut self, addr: u16) -> u8 {
        let resolved = self.cpu_slot((addr >> 8) as u8);
        self.read_route(resolved.read, addr as u8)
    }

    pub fn cpu_write(&mut self, addr: u16, value: u8) {
        let resolved = self.cpu_slot((addr >> 8) as u8);
        self.write_route(resolved.write, addr as u8, value);
    }

    /// Write-back of a read-modify-write instruction (`INC`, `ASL`, ...)
    /// through the same page slot as [`cpu_write`](Self::cpu_write).
    pub fn cpu_write_rmw(&mut self, addr: u16, old: u8, new: u8) {
        let resolved = self.cpu_slot((addr >> 8) as u8);
        self.write_route_rmw(resolved.write, addr as u8, old, new);
    }

    /// Program counter reported with unmapped and impossible accesses.
    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    #[must_use]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    // --- flat addressing --------------------------------------------------

    /// Byte access through the CPU's 32-bit flat addressing mode.
    pub fn flat_read(&mut self, address: u32) -> u8 {
        self.linear_read(SlotId::Flat, address, View::Cpu)
    }

    pub fn flat_write(&mut self, address: u32, value: u8) {
        self.linear_write(SlotId::Flat, address, value, View::Cpu);
    }

    /// Little-endian 32-bit read. Each byte address wraps at 28 bits.
    pub fn flat_read_u32(&mut self, address: u32) -> u32 {
        let bytes: [u8; 4] = std::array::from_fn(|i| {
            self.flat_read(address.wrapping_add(i as u32) & LINEAR_SPACE_END)
        });
        u32::from_le_bytes(bytes)
    }

    pub fn flat_write_u32(&mut self, address: u32, value: u32) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.flat_write(address.wrapping_add(i as u32) & LINEAR_SPACE_END, byte);
        }
    }

    // --- monitor path -----------------------------------------------------

    /// Linear read that ignores privilege masking and ROM protection.
    pub fn debug_read_linear(&mut self, address: u32) -> u8 {
        self.linear_read(SlotId::Debug, address, View::Inspect)
    }

    pub fn debug_write_linear(&mut self, address: u32, value: u8) {
        self.linear_write(SlotId::Debug, address, value, View::Inspect);
    }

    /// CPU-address read with the current banking but the monitor's view of
    /// each region. Nothing is cached.
    pub fn debug_read_cpu(&mut self, addr: u16) -> u8 {
        let resolved = self.resolve_cpu((addr >> 8) as u8, View::Inspect);
        self.read_route(resolved.read, addr as u8)
    }

    pub fn debug_write_cpu(&mut self, addr: u16, value: u8) {
        let resolved = self.resolve_cpu((addr >> 8) as u8, View::Inspect);
        self.write_route(resolved.write, addr as u8, value);
    }

    /// Side-effect-free read of storage-backed linear memory. `None` for
    /// I/O and other device windows.
    #[must_use]
    pub fn peek_linear(&self, address: u32) -> Option<u8> {
        if address > LINEAR_SPACE_END {
            return None;
        }
        let resolved = self.resolve_linear(address, View::Inspect);
        self.stored(resolved.read.handler, address)
    }

    /// Copy an image into linear memory, bypassing protection.
    pub fn load_linear(&mut self, address: u32, data: &[u8]) -> Result<(), MemoryError> {
        let end = u32::try_from(data.len())
            .ok()
            .and_then(|len| address.checked_add(len))
            .filter(|&end| end <= LINEAR_SPACE_END + 1)
            .ok_or(MemoryError::ImpossibleAddress {
                address,
                pc: self.pc,
            })?;
        for (addr, &byte) in (address..end).zip(data) {
            self.debug_write_linear(addr, byte);
        }
        debug!("loaded {} bytes at ${address:07X}", data.len());
        Ok(())
    }

    /// Attach a cartridge image at $4000000. Bytes past its end read $FF.
    pub fn insert_cartridge(&mut self, image: &[u8]) -> Result<(), MemoryError> {
        if image.len() > CARTRIDGE_SIZE {
            return Err(MemoryError::configuration(format!(
                "cartridge image is {} bytes, limit is {CARTRIDGE_SIZE}",
                image.len()
            )));
        }
        self.storage.cartridge = image.to_vec();
        debug!("cartridge inserted ({} bytes)", image.len());
        Ok(())
    }

    pub fn remove_cartridge(&mut self) {
        self.storage.cartridge.clear();
    }

    // --- configuration notifications --------------------------------------

    /// CPU write to $00 (DDR) or $01 (data).
    ///
    /// Writing $40 or $41 to the DDR is the MEGA65 speed control: it sets a
    /// speed request (fast when bit 0 is set) and leaves the DDR alone.
    pub fn write_cpu_port(&mut self, reg: u8, value: u8) {
        if reg & 1 == 0 && value & 0xFE == 0x40 {
            let fast = value & 1 != 0;
            debug!("CPU port speed request: fast={fast}");
            self.speed_request = Some(fast);
            return;
        }
        if self.bank.write_port(reg, value) {
            self.refresh_zones();
        }
    }

    /// Set both port registers at once (hypervisor exit, snapshots).
    pub fn set_cpu_port(&mut self, ddr: u8, data: u8) {
        if self.bank.set_port(ddr, data) {
            self.refresh_zones();
        }
    }

    #[must_use]
    pub fn cpu_port(&self, reg: u8) -> u8 {
        self.bank.port(reg)
    }

    /// Write to the VIC-III ROM select register ($D030).
    pub fn set_rom_select(&mut self, value: u8) {
        if self.bank.set_rom_select(value) {
            self.refresh_zones();
        }
    }

    #[must_use]
    pub fn rom_select(&self) -> u8 {
        self.bank.rom_select()
    }

    /// Legacy policies of $8000, $A000, $C000, $D000 and $E000.
    #[must_use]
    pub fn bank_policies(&self) -> [BankPolicy; 5] {
        self.bank.bank_policies()
    }

    /// Execute `MAP` with the CPU's A, X, Y and Z.
    pub fn apply_map(&mut self, a: u8, x: u8, y: u8, z: u8) {
        if self.map.apply(a, x, y, z) {
            self.refresh_zones();
        }
    }

    /// Execute `EOM`. Returns whether it ended a `MAP` sequence.
    pub fn commit_map(&mut self) -> bool {
        self.map.commit()
    }

    /// Interrupts are held off between `MAP` and `EOM`.
    #[must_use]
    pub fn interrupts_inhibited(&self) -> bool {
        self.map.interrupts_inhibited()
    }

    /// Install a full mapper state, as on hypervisor entry and exit.
    pub fn set_map_config(&mut self, config: MapConfig) {
        debug!("map config set: {config:?}");
        if self.map.set_config(config) {
            self.refresh_zones();
        }
    }

    #[must_use]
    pub fn map_config(&self) -> MapConfig {
        *self.map.config()
    }

    pub fn set_privileged(&mut self, privileged: bool) {
        if self.bank.privileged() == privileged {
            return;
        }
        debug!(
            "{} privileged mode",
            if privileged { "entering" } else { "leaving" }
        );
        let policies_changed = self.bank.set_privileged(privileged);
        let dropped = self.slots.invalidate_where(SlotDeps::PRIVILEGE);
        trace!("privilege change dropped {dropped} tagged slots");
        if policies_changed {
            self.refresh_zones();
        }
    }

    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.bank.privileged()
    }

    /// Resolved $D000 slots pick the new layout up on their next access.
    pub fn set_io_layout(&mut self, layout: IoLayout) {
        if layout != self.layout {
            debug!("I/O layout {:?} -> {layout:?}", self.layout);
            self.layout = layout;
        }
    }

    #[must_use]
    pub fn io_layout(&self) -> IoLayout {
        self.layout
    }

    pub fn set_rom_protect(&mut self, protect: bool) {
        if protect == self.rom_protect {
            return;
        }
        debug!("shadow ROM write protect: {protect}");
        self.rom_protect = protect;
        let dropped = self.slots.invalidate_where(SlotDeps::ROM_PROTECT);
        trace!("ROM protect change dropped {dropped} tagged slots");
    }

    #[must_use]
    pub fn rom_protect(&self) -> bool {
        self.rom_protect
    }

    /// Power-on banking: port 7/7, no ROM select, mapper cleared, no pending
    /// `EOM`. Memory contents and privilege are kept.
    pub fn reset(&mut self) {
        debug!("memory mapper reset");
        let privileged = self.bank.privileged();
        self.bank = BankEngine::new();
        self.bank.set_privileged(privileged);
        self.map.reset();
        self.refresh_zones();
        self.fault = None;
        self.speed_request = None;
    }

    pub(crate) fn apply_effect(&mut self, effect: IoEffect) {
        match effect {
            IoEffect::None => {}
            IoEffect::RomSelect(value) => self.set_rom_select(value),
            IoEffect::Layout(layout) => self.set_io_layout(layout),
            IoEffect::Privilege(privileged) => self.set_privileged(privileged),
            IoEffect::RomProtect(protect) => self.set_rom_protect(protect),
        }
    }

    // --- inspection -------------------------------------------------------

    #[must_use]
    pub fn is_resolved(&self, id: SlotId) -> bool {
        self.slots.is_resolved(id)
    }

    /// Number of slot resolutions since construction.
    #[must_use]
    pub fn resolve_count(&self) -> u64 {
        self.slots.resolve_count()
    }

    /// Cached slots that no longer match a fresh resolution. Empty whenever
    /// every configuration change invalidated what it had to.
    #[must_use]
    pub fn stale_slots(&self) -> Vec<SlotId> {
        self.slots
            .iter()
            .filter(|&(id, key, cached)| {
                let fresh = match id {
                    SlotId::Page(page) => self.resolve_cpu(page, View::Cpu),
                    SlotId::Debug => self.resolve_linear(key, View::Inspect),
                    _ => self.resolve_linear(key, View::Cpu),
                };
                fresh != *cached
            })
            .map(|(id, _, _)| id)
            .collect()
    }

    /// Linear address a CPU read of `addr` would reach. The $D000 I/O
    /// window reports its address in the linear I/O area.
    #[must_use]
    pub fn cpu_to_linear(&self, addr: u16) -> u32 {
        let resolved = self.resolve_cpu((addr >> 8) as u8, View::Cpu);
        match resolved.read.handler {
            Handler::LegacyIo => IO_START + u32::from(self.legacy_io_addr(u32::from(addr))),
            _ => resolved.read.base + u32::from(addr & 0xFF),
        }
    }

    /// Chip RAM as the video chip sees it (128K), including the colour RAM
    /// window at $1F800.
    #[must_use]
    pub fn chip_ram_read(&self, addr: u32) -> u8 {
        let addr = addr & 0x1_FFFF;
        if addr >= SHARED_COLOUR_START {
            self.storage.colour_ram[colour_index(addr)]
        } else {
            self.storage.main_ram[addr as usize]
        }
    }

    #[must_use]
    pub fn colour_ram_read(&self, offset: u16) -> u8 {
        self.storage.colour_ram[usize::from(offset) % COLOUR_RAM_SIZE]
    }

    pub fn colour_ram_write(&mut self, offset: u16, value: u8) {
        self.storage.colour_ram[usize::from(offset) % COLOUR_RAM_SIZE] = value;
    }

    /// Unmapped access the prompt chose to abort on, if any.
    pub fn take_fault(&mut self) -> Option<MemoryError> {
        self.fault.take()
    }

    /// Pending CPU speed request from the port: `Some(true)` for fast.
    pub fn take_speed_request(&mut self) -> Option<bool> {
        self.speed_request.take()
    }

    #[must_use]
    pub fn io(&self) -> &I {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut I {
        &mut self.io
    }
}

impl<I: IoDispatcher> Bus for Mega65Memory<I> {
    fn read(&mut self, address: u16) -> u8 {
        self.cpu_read(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        self.cpu_write(address, value);
    }
}

impl<I: IoDispatcher> LinearBus for Mega65Memory<I> {
    fn read_linear(&mut self, address: u32) -> u8 {
        self.debug_read_linear(address)
    }

    fn write_linear(&mut self, address: u32, value: u8) {
        self.debug_write_linear(address, value);
    }
}
