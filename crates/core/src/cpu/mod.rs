//! MOS 6502 CPU state and clock.
//!
//! The CPU does all the logical work of an instruction on the tick that
//! fetches it, then idles for the rest of the instruction's declared cycle
//! count. Memory traffic goes through a non-owning reference to the [`Bus`]
//! that owns this CPU.

mod addressing;
mod instructions;
mod table;

pub use addressing::AddrMode;
pub use table::{Instruction, LOOKUP};

use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::bus::Bus;
use crate::error::CpuError;
use crate::logging::{log, LogCategory, LogLevel};

/// Program counter at power-on, before any reset sequence has run.
pub const POWER_ON_PC: u16 = 0x0000;
/// Stack pointer after a reset sequence.
pub const RESET_SP: u8 = 0xFD;
/// Cycles charged by the reset sequence.
pub const RESET_CYCLES: u8 = 8;

pub const STACK_BASE: u16 = 0x0100;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Status register bits (NV-BDIZC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Flag {
    Carry = 1 << 0,
    Zero = 1 << 1,
    InterruptDisable = 1 << 2,
    /// Kept for bit compatibility; arithmetic is always binary.
    Decimal = 1 << 3,
    Break = 1 << 4,
    /// Always reads as 1.
    Unused = 1 << 5,
    Overflow = 1 << 6,
    Negative = 1 << 7,
}

impl Flag {
    pub const ALL: [Flag; 8] = [
        Flag::Carry,
        Flag::Zero,
        Flag::InterruptDisable,
        Flag::Decimal,
        Flag::Break,
        Flag::Unused,
        Flag::Overflow,
        Flag::Negative,
    ];

    #[inline]
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

/// Architectural register file, as seen by a debugger or test harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
}

#[derive(Serialize, Deserialize)]
struct CpuState {
    registers: Registers,
    cycles: u8,
    clock_count: u64,
}

/// 6502 registers, flags and per-instruction scratch state.
#[derive(Debug)]
pub struct Cpu {
    /// Accumulator register
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Stack pointer (points to 0x0100 + sp)
    pub sp: u8,
    /// Program counter
    pub pc: u16,
    status: u8,

    // Scratch for the instruction in flight
    cycles: u8,
    fetched: u8,
    addr_abs: u16,
    addr_rel: u16,
    opcode: u8,
    mode: AddrMode,

    /// Ticks since power-on
    clock_count: u64,
    bus: Option<Weak<Bus>>,
}

impl Cpu {
    /// Power-on state: registers cleared, `pc` at [`POWER_ON_PC`], no bus.
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0,
            pc: POWER_ON_PC,
            status: Flag::Unused.mask(),
            cycles: 0,
            fetched: 0,
            addr_abs: 0,
            addr_rel: 0,
            opcode: 0,
            mode: AddrMode::Implied,
            clock_count: 0,
            bus: None,
        }
    }

    /// Store the back-reference to the owning bus.
    ///
    /// Fails with [`CpuError::Unknown`] when given nothing (or a reference to
    /// a bus that no longer exists), and with [`CpuError::AlreadyConnected`]
    /// on a second call.
    pub fn connect(&mut self, bus: Option<Weak<Bus>>) -> Result<(), CpuError> {
        let bus = bus
            .filter(|b| b.strong_count() > 0)
            .ok_or(CpuError::Unknown)?;
        if self.bus.is_some() {
            return Err(CpuError::AlreadyConnected);
        }
        self.bus = Some(bus);
        log(LogCategory::Cpu, LogLevel::Debug, || {
            "CPU: connected to bus".to_string()
        });
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.bus.as_ref().is_some_and(|b| b.strong_count() > 0)
    }

    /// The bus this CPU is wired to, if it is still alive.
    pub fn bus(&self) -> Option<Rc<Bus>> {
        self.bus.as_ref().and_then(Weak::upgrade)
    }

    pub fn read(&self, addr: u16) -> Result<u8, CpuError> {
        self.bus()
            .map(|bus| bus.read(addr))
            .ok_or(CpuError::InvalidRead { addr })
    }

    pub fn write(&mut self, addr: u16, val: u8) -> Result<(), CpuError> {
        let bus = self.bus().ok_or(CpuError::InvalidWrite { addr, val })?;
        bus.write(addr, val);
        Ok(())
    }

    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        if value {
            self.status |= flag.mask();
        } else {
            self.status &= !flag.mask();
        }
    }

    pub fn get_flag(&self, flag: Flag) -> bool {
        self.status & flag.mask() != 0
    }

    pub fn status(&self) -> u8 {
        self.status
    }

    /// Cycles left before the CPU fetches its next opcode.
    pub fn cycles_remaining(&self) -> u8 {
        self.cycles
    }

    /// True when the next tick will fetch a new instruction.
    pub fn complete(&self) -> bool {
        self.cycles == 0
    }

    pub fn clock_count(&self) -> u64 {
        self.clock_count
    }

    /// Opcode of the most recently fetched instruction.
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Advance one clock cycle.
    ///
    /// # Panics
    ///
    /// If the CPU is not connected to a bus. Clocking an unwired CPU is a
    /// construction-order bug.
    pub fn clock(&mut self) {
        if self.cycles == 0 {
            let pc = self.pc;
            self.opcode = self.bus_read(pc);
            self.set_flag(Flag::Unused, true);
            self.pc = self.pc.wrapping_add(1);

            let instruction = &LOOKUP[self.opcode as usize];
            log(LogCategory::Cpu, LogLevel::Trace, || {
                format!(
                    "{:04X}  {:02X}  {} {} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
                    pc,
                    self.opcode,
                    instruction.name,
                    instruction.mode.short_name(),
                    self.a,
                    self.x,
                    self.y,
                    self.status,
                    self.sp,
                    self.clock_count
                )
            });

            self.cycles = instruction.cycles;
            let mode_extra = self.resolve(instruction.mode);
            let op_extra = (instruction.operate)(self);
            // Only instructions that read their operand pay the page-cross cycle
            self.cycles += mode_extra & op_extra;
            self.set_flag(Flag::Unused, true);
        }

        self.clock_count += 1;
        self.cycles -= 1;
    }

    /// Run the reset sequence: load `pc` from the reset vector and charge
    /// [`RESET_CYCLES`].
    ///
    /// # Panics
    ///
    /// If the CPU is not connected to a bus.
    pub fn reset(&mut self) {
        self.pc = self.read_word(RESET_VECTOR);
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = RESET_SP;
        self.status = Flag::Unused.mask();

        self.fetched = 0;
        self.addr_abs = 0;
        self.addr_rel = 0;
        self.cycles = RESET_CYCLES;
        log(LogCategory::Cpu, LogLevel::Debug, || {
            format!("CPU: reset, PC={:04X}", self.pc)
        });
    }

    pub fn registers(&self) -> Registers {
        Registers {
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            pc: self.pc,
            status: self.status,
        }
    }

    /// Overwrite the register file. The Unused bit is forced on.
    pub fn set_registers(&mut self, regs: Registers) {
        self.a = regs.a;
        self.x = regs.x;
        self.y = regs.y;
        self.sp = regs.sp;
        self.pc = regs.pc;
        self.status = regs.status | Flag::Unused.mask();
    }

    /// Registers and timing as JSON, for debugging and test harnesses.
    pub fn save_state(&self) -> serde_json::Value {
        serde_json::json!(CpuState {
            registers: self.registers(),
            cycles: self.cycles,
            clock_count: self.clock_count,
        })
    }

    pub fn load_state(&mut self, v: &serde_json::Value) -> Result<(), serde_json::Error> {
        let state = CpuState::deserialize(v)?;
        self.set_registers(state.registers);
        self.cycles = state.cycles;
        self.clock_count = state.clock_count;
        Ok(())
    }

    fn bus_read(&self, addr: u16) -> u8 {
        match self.read(addr) {
            Ok(v) => v,
            Err(e) => panic!("6502 clocked before it was wired to a bus: {e}"),
        }
    }

    fn bus_write(&mut self, addr: u16, val: u8) {
        if let Err(e) = self.write(addr, val) {
            panic!("6502 clocked before it was wired to a bus: {e}");
        }
    }

    fn read_word(&self, addr: u16) -> u16 {
        let lo = self.bus_read(addr) as u16;
        let hi = self.bus_read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn set_zero_negative(&mut self, v: u8) {
        self.set_flag(Flag::Zero, v == 0);
        self.set_flag(Flag::Negative, v & 0x80 != 0);
    }

    /// PLP/RTI: whole-byte load; Break is not a real latch and Unused stays set
    fn load_status(&mut self, v: u8) {
        self.status = (v | Flag::Unused.mask()) & !Flag::Break.mask();
    }

    fn push(&mut self, v: u8) {
        self.bus_write(STACK_BASE + self.sp as u16, v);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.bus_read(STACK_BASE + self.sp as u16)
    }

    fn push_word(&mut self, v: u16) {
        self.push((v >> 8) as u8);
        self.push(v as u8);
    }

    fn pop_word(&mut self) -> u16 {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        (hi << 8) | lo
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
