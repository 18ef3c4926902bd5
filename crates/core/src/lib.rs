//! Cycle-counted MOS 6502 core.
//!
//! A [`Bus`] owns one [`Cpu`] and one [`Memory6502`] backend. The CPU decodes
//! through a static 256-entry table, does an instruction's work on the tick
//! that fetches it and then idles out the remaining cycles.
//!
//! ```
//! use emu_6502::Bus;
//!
//! let bus = Bus::new().unwrap();
//! // LDA #$2A at $0000, where the CPU starts at power-on
//! bus.load(0x0000, &[0xA9, 0x2A]).unwrap();
//! assert_eq!(bus.step_instruction(), 2);
//! assert_eq!(bus.cpu().a, 0x2A);
//! ```

pub mod bus;
pub mod cpu;
pub mod error;
pub mod logging;
pub mod memory;

pub use bus::Bus;
pub use cpu::{AddrMode, Cpu, Flag, Instruction, Registers, LOOKUP};
pub use error::{BusError, CpuError, MemoryError};
pub use memory::{Memory6502, Ram, SizedRam};
