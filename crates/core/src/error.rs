//! Error types for the CPU, bus and memory layers.

use thiserror::Error;

/// Failures of the CPU's bus-facing operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    /// A read was attempted while no bus was connected.
    #[error("invalid read at ${addr:04X}: cpu is not connected to a bus")]
    InvalidRead { addr: u16 },

    /// A write was attempted while no bus was connected.
    #[error("invalid write of ${val:02X} at ${addr:04X}: cpu is not connected to a bus")]
    InvalidWrite { addr: u16, val: u8 },

    /// `connect` was given no usable bus reference.
    #[error("unknown error: no bus reference to connect")]
    Unknown,

    /// The back-reference is set once and never replaced.
    #[error("cpu is already connected to a bus")]
    AlreadyConnected,
}

/// Failures while building a bus.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    #[error("failed to wire cpu to bus: {0}")]
    Construction(#[source] CpuError),
}

/// Failures of fallible memory operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    #[error("address ${addr:04X} is outside a {size}-byte memory")]
    OutOfRange { addr: u32, size: usize },

    #[error("invalid memory size: {0} bytes (expected 1..=65536)")]
    InvalidSize(usize),
}
