//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use mega65_memory::{
    IoDispatcher, IoEffect, IoLayout, Mega65Memory, MemoryConfig, UnmappedPolicy,
};

/// I/O dispatcher that records writes and decodes the few registers the
/// mapper cares about the way the VIC-III does.
#[derive(Default)]
pub struct RecordingIo {
    pub reads: Vec<u16>,
    pub writes: Vec<(u16, u8)>,
}

impl IoDispatcher for RecordingIo {
    fn io_read(&mut self, addr: u16) -> u8 {
        self.reads.push(addr);
        (addr & 0xFF) as u8
    }

    fn io_write(&mut self, addr: u16, value: u8) -> IoEffect {
        self.writes.push((addr, value));
        match addr {
            // $D030 in the C65 and MEGA65 register sets.
            0x1030 | 0x3030 => IoEffect::RomSelect(value),
            // $D02F key register, reduced to "pick a layout".
            0x002F | 0x102F | 0x302F => IoEffect::Layout(IoLayout::from_selector(value)),
            _ => IoEffect::None,
        }
    }

    /// The 65xx double write: the unmodified byte, then the result.
    fn io_write_rmw(&mut self, addr: u16, old: u8, new: u8) -> IoEffect {
        self.io_write(addr, old);
        self.io_write(addr, new)
    }
}

pub fn make_memory() -> Mega65Memory<RecordingIo> {
    Mega65Memory::new(&MemoryConfig::default(), RecordingIo::default())
        .expect("default config")
}

pub fn make_quiet_memory() -> Mega65Memory<RecordingIo> {
    let config = MemoryConfig {
        unmapped: UnmappedPolicy::IgnoreSilently,
        ..MemoryConfig::default()
    };
    Mega65Memory::new(&config, RecordingIo::default()).expect("quiet config")
}
