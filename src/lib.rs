//! RV32I instruction-set simulator.
//!
//! A single hart runs the base integer ISA plus raw CSR access against a flat
//! DRAM region and one memory-mapped UART. See [`cpu::Machine`] for the entry
//! points.

pub mod config;
pub mod cpu;
pub mod csr;
pub mod debug;
pub mod device;
pub mod loader;
pub mod mem;

pub use config::MachineConfig;
pub use cpu::Machine;
pub use cpu::trap::Trap;
