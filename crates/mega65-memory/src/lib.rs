//! MEGA65 memory mapper.
//!
//! Translates the CPU's 16-bit addresses and the DMA controller's 28-bit
//! linear addresses into backing storage or chip registers. Four inputs
//! decide where a CPU address goes:
//!
//! - the 6510-style CPU port at $00/$01,
//! - the VIC-III ROM select register ($D030),
//! - the 4510 `MAP` instruction, with the MEGA65 megabyte extension,
//! - privileged (hypervisor) mode.
//!
//! Resolutions are cached per 256-byte page in a [`SlotCache`] and dropped
//! whenever one of those inputs changes in a way that affects them.

mod bank;
mod config;
mod dma;
mod error;
mod handler;
mod io;
mod map;
mod memory;
mod observe;
mod region;
mod slot;
mod storage;

pub use bank::{
    BANKED_ZONES, BankEngine, BankPolicy, ROM_SELECT_MASK, RomBank, ZONES, policy_table,
    port_code, zone_policy,
};
pub use config::{DEFAULT_SLOW_RAM_SIZE, IoLayout, MAX_SLOW_RAM_SIZE, MemoryConfig};
pub use dma::DmaMemory;
pub use error::{
    AbortOnUnmapped, AccessKind, MemoryError, UnmappedAccess, UnmappedChoice, UnmappedPolicy,
    UnmappedPrompt,
};
pub use io::{IoDispatcher, IoEffect, NullIo};
pub use map::{MapConfig, MapEngine, ZonePolicy, effective_zones, translate};
pub use memory::Mega65Memory;
pub use region::{LINEAR_SPACE_END, LinearRegion, RegionKind, RegionMap};
pub use slot::{Handler, Resolved, Route, SlotCache, SlotDeps, SlotId};
