//! Reader and writer for each handler kind.

use crate::error::{AccessKind, MemoryError, UnmappedAccess, UnmappedChoice, UnmappedPolicy};
use crate::io::IoDispatcher;
use crate::memory::Mega65Memory;
use crate::region::{
    CHAR_WOM_START, DISK_BUFFER_START, ETHERNET_START, HYPERVISOR_RAM_START, IO_START,
    SLOW_DEVICE_START, SLOW_RAM_START,
};
use crate::slot::{Handler, Route};
use crate::storage::colour_index;
use log::{debug, error, trace, warn};

impl<I: IoDispatcher> Mega65Memory<I> {
    /// Byte held by a storage-backed handler, `None` for devices.
    pub(crate) fn stored(&self, handler: Handler, address: u32) -> Option<u8> {
        let storage = &self.storage;
        let byte = match handler {
            Handler::ZeroPage => match address {
                0 | 1 => self.bank.port(address as u8),
                _ => storage.main_ram[address as usize],
            },
            Handler::MainRam => storage.main_ram[address as usize],
            Handler::SharedColour | Handler::ColourRam => storage.colour_ram[colour_index(address)],
            Handler::SlowRam => storage.slow_ram[(address - SLOW_RAM_START) as usize],
            Handler::CharWom => storage.char_wom[(address - CHAR_WOM_START) as usize],
            Handler::DiskBuffer => storage.disk_buffer[(address - DISK_BUFFER_START) as usize],
            Handler::HypervisorRam => {
                storage.hypervisor_ram[(address - HYPERVISOR_RAM_START) as usize]
            }
            Handler::SlowDevice => storage
                .cartridge
                .get((address - SLOW_DEVICE_START) as usize)
                .copied()
                .unwrap_or(0xFF),
            Handler::I2c => 0x00,
            Handler::Dummy => 0xFF,
            Handler::Io
            | Handler::LegacyIo
            | Handler::Ethernet
            | Handler::Unmapped => return None,
        };
        Some(byte)
    }

    pub(crate) fn read_route(&mut self, route: Route, offset: u8) -> u8 {
        let address = route.base + u32::from(offset);
        match route.handler {
            Handler::Io => self.io.io_read((address - IO_START) as u16),
            Handler::LegacyIo => {
                let addr = self.legacy_io_addr(address);
                self.io.io_read(addr)
            }
            Handler::Ethernet => self.io.ethernet_read((address - ETHERNET_START) as u16),
            Handler::Unmapped => self.unmapped(address, AccessKind::Read),
            storage => self.stored(storage, address).unwrap_or(0xFF),
        }
    }

    pub(crate) fn write_route(&mut self, route: Route, offset: u8, value: u8) {
        let address = route.base + u32::from(offset);
        match route.handler {
            Handler::ZeroPage => match offset {
                0 | 1 => self.write_cpu_port(offset, value),
                _ => self.storage.main_ram[usize::from(offset)] = value,
            },
            Handler::MainRam => self.storage.main_ram[address as usize] = value,
            Handler::SharedColour | Handler::ColourRam => {
                self.storage.colour_ram[colour_index(address)] = value;
            }
            Handler::SlowRam => {
                self.storage.slow_ram[(address - SLOW_RAM_START) as usize] = value;
            }
            Handler::CharWom => {
                self.storage.char_wom[(address - CHAR_WOM_START) as usize] = value;
            }
            Handler::DiskBuffer => {
                self.storage.disk_buffer[(address - DISK_BUFFER_START) as usize] = value;
            }
            Handler::HypervisorRam => {
                self.storage.hypervisor_ram[(address - HYPERVISOR_RAM_START) as usize] = value;
            }
            Handler::SlowDevice => {
                debug!("write ${value:02X} to slow device ${address:07X} ignored");
            }
            Handler::Io => {
                let effect = self.io.io_write((address - IO_START) as u16, value);
                self.apply_effect(effect);
            }
            Handler::LegacyIo => {
                let addr = self.legacy_io_addr(address);
                let effect = self.io.io_write(addr, value);
                self.apply_effect(effect);
            }
            Handler::Ethernet => {
                self.io
                    .ethernet_write((address - ETHERNET_START) as u16, value);
            }
            Handler::I2c | Handler::Dummy => {}
            Handler::Unmapped => {
                self.unmapped(address, AccessKind::Write(value));
            }
        }
    }

    /// Write the final byte of a read-modify-write instruction. Chip
    /// registers also get the byte read before the modification; every
    /// other handler sees only `new`.
    pub(crate) fn write_route_rmw(&mut self, route: Route, offset: u8, old: u8, new: u8) {
        let address = route.base + u32::from(offset);
        let addr = match route.handler {
            Handler::Io => (address - IO_START) as u16,
            Handler::LegacyIo => self.legacy_io_addr(address),
            _ => return self.write_route(route, offset, new),
        };
        trace!("RMW: I/O ${addr:04X} old ${old:02X} new ${new:02X}");
        let effect = self.io.io_write_rmw(addr, old, new);
        self.apply_effect(effect);
    }

    /// Offset into the linear I/O area for a CPU address in the $D000
    /// window, using the layout in force now.
    pub(crate) fn legacy_io_addr(&self, cpu_addr: u32) -> u16 {
        (u16::from(self.layout.selector()) << 12) | (cpu_addr as u16 & 0x0FFF)
    }

    /// Apply the unmapped-access policy. Reads see the returned $FF.
    fn unmapped(&mut self, address: u32, kind: AccessKind) -> u8 {
        if self.unmapped == UnmappedPolicy::Ask {
            let access = UnmappedAccess {
                address,
                pc: self.pc,
                kind,
            };
            match self.prompt.choose(&access) {
                UnmappedChoice::Abort => {
                    error!("{access}: aborting");
                    if self.fault.is_none() {
                        self.fault = Some(MemoryError::UnmappedAccess(access));
                    }
                }
                UnmappedChoice::IgnoreOnce => warn!("{access}: ignored"),
                UnmappedChoice::IgnoreAlways => {
                    warn!("{access}: ignoring unmapped accesses from now on");
                    self.unmapped = UnmappedPolicy::IgnoreSilently;
                }
            }
        }
        0xFF
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MemoryConfig;
    use crate::error::{UnmappedChoice, UnmappedPolicy};
    use crate::io::{IoDispatcher, IoEffect};
    use crate::memory::Mega65Memory;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct EchoIo {
        last_write: Option<(u16, u8)>,
        eth: Vec<(u16, u8)>,
    }

    impl IoDispatcher for EchoIo {
        fn io_read(&mut self, addr: u16) -> u8 {
            (addr >> 8) as u8
        }

        fn io_write(&mut self, addr: u16, value: u8) -> IoEffect {
            self.last_write = Some((addr, value));
            IoEffect::None
        }

        fn ethernet_read(&mut self, offset: u16) -> u8 {
            offset as u8
        }

        fn ethernet_write(&mut self, offset: u16, value: u8) {
            self.eth.push((offset, value));
        }
    }

    fn make_memory() -> Mega65Memory<EchoIo> {
        Mega65Memory::new(&MemoryConfig::default(), EchoIo::default()).expect("default config")
    }

    #[test]
    fn linear_io_passes_layout_block() {
        let mut mem = make_memory();
        assert_eq!(mem.flat_read(0xFFD_3100), 0x31);
        mem.flat_write(0xFFD_1020, 0x05);
        assert_eq!(mem.io().last_write, Some((0x1020, 0x05)));
    }

    #[test]
    fn ethernet_window_goes_to_dispatcher() {
        let mut mem = make_memory();
        assert_eq!(mem.flat_read(0xFFD_E812), 0x12);
        mem.flat_write(0xFFD_E800, 0xAA);
        assert_eq!(mem.io().eth, vec![(0, 0xAA)]);
    }

    #[test]
    fn rmw_defaults_to_a_single_write() {
        let mut mem = make_memory();
        mem.cpu_write_rmw(0xD020, 0x01, 0x02);
        assert_eq!(mem.io().last_write, Some((0x0020, 0x02)));
    }

    #[test]
    fn i2c_reads_zero() {
        let mut mem = make_memory();
        mem.flat_write(0xFFD_7000, 0x55);
        assert_eq!(mem.flat_read(0xFFD_7000), 0x00);
    }

    #[test]
    fn reserved_reads_ff_and_drops_writes() {
        let mut mem = make_memory();
        mem.flat_write(0x7_0000, 0x12);
        assert_eq!(mem.flat_read(0x7_0000), 0xFF);
        assert!(mem.take_fault().is_none());
    }

    #[test]
    fn ignore_always_stops_asking() {
        let mut mem = make_memory();
        let asked = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&asked);
        mem.set_unmapped_prompt(move |_: &crate::error::UnmappedAccess| {
            *counter.borrow_mut() += 1;
            UnmappedChoice::IgnoreAlways
        });
        assert_eq!(mem.flat_read(0x20_0000), 0xFF);
        mem.flat_write(0x20_0001, 1);
        assert_eq!(*asked.borrow(), 1);
        assert_eq!(mem.unmapped_policy(), UnmappedPolicy::IgnoreSilently);
        assert!(mem.take_fault().is_none());
    }
}
