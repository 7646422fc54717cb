//! Memory bus interfaces.

/// CPU-side memory bus.
///
/// The CPU accesses memory and peripherals through this trait. The bus
/// applies whatever banking is in force and routes the access to the
/// backing device.
pub trait Bus {
    /// Read a byte from the given CPU address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given CPU address.
    fn write(&mut self, address: u16, value: u8);
}

/// Physical (linear) memory bus.
///
/// Machines whose physical address space is wider than the CPU's window
/// expose it here. Accesses bypass CPU banking entirely. Monitors use this
/// path to inspect the real backing store, so implementations should not
/// apply mode-dependent masking.
///
/// The valid address width is machine specific.
pub trait LinearBus {
    /// Read a byte from the given linear address.
    fn read_linear(&mut self, address: u32) -> u8;

    /// Write a byte to the given linear address.
    fn write_linear(&mut self, address: u32, value: u8);
}
