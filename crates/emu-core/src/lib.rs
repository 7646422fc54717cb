//! Core traits for memory-mapped machine emulation.
//!
//! Machine crates expose their address decoding through [`Bus`] (the CPU's
//! view) and [`LinearBus`] (the physical view used by DMA engines and
//! monitors), and their internal state through [`Observable`].

mod bus;
mod observable;

pub use bus::{Bus, LinearBus};
pub use observable::{Observable, Value};
