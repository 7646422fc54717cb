//! Linear accessors for the DMA controller.
//!
//! Each stream has its own slot, so a copy between two regions resolves
//! each side once per 256-byte page instead of once per byte.

use crate::io::IoDispatcher;
use crate::memory::{Mega65Memory, View};
use crate::slot::SlotId;

/// Memory as seen by a DMA controller: 28-bit linear addresses.
pub trait DmaMemory {
    /// Fetch a byte of the DMA job list.
    fn dma_list_read(&mut self, address: u32) -> u8;
    fn dma_source_read(&mut self, address: u32) -> u8;
    fn dma_source_write(&mut self, address: u32, value: u8);
    fn dma_target_read(&mut self, address: u32) -> u8;
    fn dma_target_write(&mut self, address: u32, value: u8);
}

impl<I: IoDispatcher> DmaMemory for Mega65Memory<I> {
    fn dma_list_read(&mut self, address: u32) -> u8 {
        self.linear_read(SlotId::DmaList, address, View::Cpu)
    }

    fn dma_source_read(&mut self, address: u32) -> u8 {
        self.linear_read(SlotId::DmaSourceRead, address, View::Cpu)
    }

    fn dma_source_write(&mut self, address: u32, value: u8) {
        self.linear_write(SlotId::DmaSourceWrite, address, value, View::Cpu);
    }

    fn dma_target_read(&mut self, address: u32) -> u8 {
        self.linear_read(SlotId::DmaTargetRead, address, View::Cpu)
    }

    fn dma_target_write(&mut self, address: u32, value: u8) {
        self.linear_write(SlotId::DmaTargetWrite, address, value, View::Cpu);
    }
}
