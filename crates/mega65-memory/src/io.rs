//! Chip register dispatcher seam.

use crate::config::IoLayout;

/// Mapper state changed as a side effect of an I/O register write.
///
/// The mapper applies the effect, with its invalidations, before the write
/// returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoEffect {
    #[default]
    None,
    /// $D030 was written.
    RomSelect(u8),
    /// The VIC key register switched register sets.
    Layout(IoLayout),
    /// Hypervisor entry (`true`) or exit.
    Privilege(bool),
    /// Shadow ROM write protection toggled.
    RomProtect(bool),
}

/// Chip registers behind the I/O area.
///
/// `addr` is the offset into the linear I/O area at $FFD0000: bits 13-12
/// select the layout block and bits 11-0 the register.
pub trait IoDispatcher {
    fn io_read(&mut self, addr: u16) -> u8;

    fn io_write(&mut self, addr: u16, value: u8) -> IoEffect;

    /// Final write of a read-modify-write instruction, with the byte the
    /// instruction read first. The 65xx bus writes `old` back before
    /// `new`; registers that react to that double write override this.
    fn io_write_rmw(&mut self, addr: u16, _old: u8, new: u8) -> IoEffect {
        self.io_write(addr, new)
    }

    /// Ethernet buffer ($FFDE800-$FFDEFFF), RX side.
    fn ethernet_read(&mut self, _offset: u16) -> u8 {
        0xFF
    }

    /// Ethernet buffer, TX side.
    fn ethernet_write(&mut self, _offset: u16, _value: u8) {}
}

/// No chips attached: registers read $FF and writes do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIo;

impl IoDispatcher for NullIo {
    fn io_read(&mut self, _addr: u16) -> u8 {
        0xFF
    }

    fn io_write(&mut self, _addr: u16, _value: u8) -> IoEffect {
        IoEffect::None
    }
}
