//! Addressing-mode resolution.
//!
//! Every resolver leaves `pc` just past the operand bytes it consumed and
//! returns 1 when the effective address crossed a page relative to its base.
//! Whether that costs a cycle is up to the instruction.

use super::Cpu;

/// How an instruction locates its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrMode {
    /// No operand bytes; `fetched` is the accumulator.
    Implied,
    /// Shift/rotate on the accumulator.
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    /// Signed branch displacement.
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// JMP ($xxxx) only.
    Indirect,
    /// ($zp,X)
    IndexedIndirectX,
    /// ($zp),Y
    IndirectIndexedY,
}

impl AddrMode {
    pub const ALL: [AddrMode; 13] = [
        AddrMode::Implied,
        AddrMode::Accumulator,
        AddrMode::Immediate,
        AddrMode::ZeroPage,
        AddrMode::ZeroPageX,
        AddrMode::ZeroPageY,
        AddrMode::Relative,
        AddrMode::Absolute,
        AddrMode::AbsoluteX,
        AddrMode::AbsoluteY,
        AddrMode::Indirect,
        AddrMode::IndexedIndirectX,
        AddrMode::IndirectIndexedY,
    ];

    /// Bytes following the opcode.
    pub const fn operand_bytes(self) -> u16 {
        match self {
            AddrMode::Implied | AddrMode::Accumulator => 0,
            AddrMode::Immediate
            | AddrMode::ZeroPage
            | AddrMode::ZeroPageX
            | AddrMode::ZeroPageY
            | AddrMode::Relative
            | AddrMode::IndexedIndirectX
            | AddrMode::IndirectIndexedY => 1,
            AddrMode::Absolute
            | AddrMode::AbsoluteX
            | AddrMode::AbsoluteY
            | AddrMode::Indirect => 2,
        }
    }

    /// Three-letter tag used in trace output.
    pub const fn short_name(self) -> &'static str {
        match self {
            AddrMode::Implied => "IMP",
            AddrMode::Accumulator => "ACC",
            AddrMode::Immediate => "IMM",
            AddrMode::ZeroPage => "ZP0",
            AddrMode::ZeroPageX => "ZPX",
            AddrMode::ZeroPageY => "ZPY",
            AddrMode::Relative => "REL",
            AddrMode::Absolute => "ABS",
            AddrMode::AbsoluteX => "ABX",
            AddrMode::AbsoluteY => "ABY",
            AddrMode::Indirect => "IND",
            AddrMode::IndexedIndirectX => "IZX",
            AddrMode::IndirectIndexedY => "IZY",
        }
    }
}

#[inline]
fn page_crossed(base: u16, effective: u16) -> u8 {
    ((base & 0xFF00) != (effective & 0xFF00)) as u8
}

impl Cpu {
    /// Resolve `mode` at the current `pc`, filling `addr_abs`, `addr_rel`
    /// or `fetched`. Returns the page-cross candidate (0 or 1).
    pub fn resolve(&mut self, mode: AddrMode) -> u8 {
        self.mode = mode;
        match mode {
            AddrMode::Implied | AddrMode::Accumulator => {
                self.fetched = self.a;
                0
            }
            AddrMode::Immediate => {
                self.addr_abs = self.pc;
                self.pc = self.pc.wrapping_add(1);
                0
            }
            AddrMode::ZeroPage => {
                self.addr_abs = self.fetch_byte() as u16;
                0
            }
            AddrMode::ZeroPageX => {
                self.addr_abs = self.fetch_byte().wrapping_add(self.x) as u16;
                0
            }
            AddrMode::ZeroPageY => {
                self.addr_abs = self.fetch_byte().wrapping_add(self.y) as u16;
                0
            }
            AddrMode::Relative => {
                self.addr_rel = self.fetch_byte() as i8 as i16 as u16;
                0
            }
            AddrMode::Absolute => {
                self.addr_abs = self.fetch_word();
                0
            }
            AddrMode::AbsoluteX => {
                let base = self.fetch_word();
                self.addr_abs = base.wrapping_add(self.x as u16);
                page_crossed(base, self.addr_abs)
            }
            AddrMode::AbsoluteY => {
                let base = self.fetch_word();
                self.addr_abs = base.wrapping_add(self.y as u16);
                page_crossed(base, self.addr_abs)
            }
            AddrMode::Indirect => {
                let ptr = self.fetch_word();
                let lo = self.bus_read(ptr) as u16;
                // NMOS bug: the high byte never comes from the next page
                let hi_addr = (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF);
                let hi = self.bus_read(hi_addr) as u16;
                self.addr_abs = (hi << 8) | lo;
                0
            }
            AddrMode::IndexedIndirectX => {
                let zp = self.fetch_byte().wrapping_add(self.x);
                let lo = self.bus_read(zp as u16) as u16;
                let hi = self.bus_read(zp.wrapping_add(1) as u16) as u16;
                self.addr_abs = (hi << 8) | lo;
                0
            }
            AddrMode::IndirectIndexedY => {
                let zp = self.fetch_byte();
                let lo = self.bus_read(zp as u16) as u16;
                let hi = self.bus_read(zp.wrapping_add(1) as u16) as u16;
                let base = (hi << 8) | lo;
                self.addr_abs = base.wrapping_add(self.y as u16);
                page_crossed(base, self.addr_abs)
            }
        }
    }

    /// Load the operand into `fetched`. Implied and accumulator modes
    /// already hold it.
    pub(crate) fn fetch(&mut self) -> u8 {
        if !matches!(self.mode, AddrMode::Implied | AddrMode::Accumulator) {
            self.fetched = self.bus_read(self.addr_abs);
        }
        self.fetched
    }

    #[inline]
    fn fetch_byte(&mut self) -> u8 {
        let v = self.bus_read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        v
    }

    #[inline]
    fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte() as u16;
        let hi = self.fetch_byte() as u16;
        (hi << 8) | lo
    }
}
