//! Opcode dispatch table.

use std::fmt;

use super::{AddrMode, Cpu};

/// One row of the dispatch table.
#[derive(Clone, Copy)]
pub struct Instruction {
    pub name: &'static str,
    pub operate: fn(&mut Cpu) -> u8,
    pub mode: AddrMode,
    /// Base cycles, before branch and page-cross penalties
    pub cycles: u8,
}

impl Instruction {
    /// True for the undocumented-opcode placeholders
    pub fn is_placeholder(&self) -> bool {
        self.name == ILLEGAL.name
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("cycles", &self.cycles)
            .finish()
    }
}

const fn op(name: &'static str, operate: fn(&mut Cpu) -> u8, mode: AddrMode, cycles: u8) -> Instruction {
    Instruction {
        name,
        operate,
        mode,
        cycles,
    }
}

const ILLEGAL: Instruction = op("???", Cpu::xxx, AddrMode::Implied, 2);

/// Indexed by opcode byte.
pub static LOOKUP: [Instruction; 256] = build();

const fn build() -> [Instruction; 256] {
    let mut table = [ILLEGAL; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = decode(i as u8);
        i += 1;
    }
    table
}

const fn decode(opcode: u8) -> Instruction {
    use AddrMode::*;

    match opcode {
        // ADC
        0x69 => op("ADC", Cpu::adc, Immediate, 2),
        0x65 => op("ADC", Cpu::adc, ZeroPage, 3),
        0x75 => op("ADC", Cpu::adc, ZeroPageX, 4),
        0x6D => op("ADC", Cpu::adc, Absolute, 4),
        0x7D => op("ADC", Cpu::adc, AbsoluteX, 4),
        0x79 => op("ADC", Cpu::adc, AbsoluteY, 4),
        0x61 => op("ADC", Cpu::adc, IndexedIndirectX, 6),
        0x71 => op("ADC", Cpu::adc, IndirectIndexedY, 5),

        // AND
        0x29 => op("AND", Cpu::and, Immediate, 2),
        0x25 => op("AND", Cpu::and, ZeroPage, 3),
        0x35 => op("AND", Cpu::and, ZeroPageX, 4),
        0x2D => op("AND", Cpu::and, Absolute, 4),
        0x3D => op("AND", Cpu::and, AbsoluteX, 4),
        0x39 => op("AND", Cpu::and, AbsoluteY, 4),
        0x21 => op("AND", Cpu::and, IndexedIndirectX, 6),
        0x31 => op("AND", Cpu::and, IndirectIndexedY, 5),

        // ASL
        0x0A => op("ASL", Cpu::asl, Accumulator, 2),
        0x06 => op("ASL", Cpu::asl, ZeroPage, 5),
        0x16 => op("ASL", Cpu::asl, ZeroPageX, 6),
        0x0E => op("ASL", Cpu::asl, Absolute, 6),
        0x1E => op("ASL", Cpu::asl, AbsoluteX, 7),

        // Branches
        0x90 => op("BCC", Cpu::bcc, Relative, 2),
        0xB0 => op("BCS", Cpu::bcs, Relative, 2),
        0xF0 => op("BEQ", Cpu::beq, Relative, 2),
        0x30 => op("BMI", Cpu::bmi, Relative, 2),
        0xD0 => op("BNE", Cpu::bne, Relative, 2),
        0x10 => op("BPL", Cpu::bpl, Relative, 2),
        0x50 => op("BVC", Cpu::bvc, Relative, 2),
        0x70 => op("BVS", Cpu::bvs, Relative, 2),

        // BIT
        0x24 => op("BIT", Cpu::bit, ZeroPage, 3),
        0x2C => op("BIT", Cpu::bit, Absolute, 4),

        0x00 => op("BRK", Cpu::brk, Implied, 7),

        // Flag clears
        0x18 => op("CLC", Cpu::clc, Implied, 2),
        0xD8 => op("CLD", Cpu::cld, Implied, 2),
        0x58 => op("CLI", Cpu::cli, Implied, 2),
        0xB8 => op("CLV", Cpu::clv, Implied, 2),

        // CMP
        0xC9 => op("CMP", Cpu::cmp, Immediate, 2),
        0xC5 => op("CMP", Cpu::cmp, ZeroPage, 3),
        0xD5 => op("CMP", Cpu::cmp, ZeroPageX, 4),
        0xCD => op("CMP", Cpu::cmp, Absolute, 4),
        0xDD => op("CMP", Cpu::cmp, AbsoluteX, 4),
        0xD9 => op("CMP", Cpu::cmp, AbsoluteY, 4),
        0xC1 => op("CMP", Cpu::cmp, IndexedIndirectX, 6),
        0xD1 => op("CMP", Cpu::cmp, IndirectIndexedY, 5),

        // CPX / CPY
        0xE0 => op("CPX", Cpu::cpx, Immediate, 2),
        0xE4 => op("CPX", Cpu::cpx, ZeroPage, 3),
        0xEC => op("CPX", Cpu::cpx, Absolute, 4),
        0xC0 => op("CPY", Cpu::cpy, Immediate, 2),
        0xC4 => op("CPY", Cpu::cpy, ZeroPage, 3),
        0xCC => op("CPY", Cpu::cpy, Absolute, 4),

        // DEC
        0xC6 => op("DEC", Cpu::dec, ZeroPage, 5),
        0xD6 => op("DEC", Cpu::dec, ZeroPageX, 6),
        0xCE => op("DEC", Cpu::dec, Absolute, 6),
        0xDE => op("DEC", Cpu::dec, AbsoluteX, 7),
        0xCA => op("DEX", Cpu::dex, Implied, 2),
        0x88 => op("DEY", Cpu::dey, Implied, 2),

        // EOR
        0x49 => op("EOR", Cpu::eor, Immediate, 2),
        0x45 => op("EOR", Cpu::eor, ZeroPage, 3),
        0x55 => op("EOR", Cpu::eor, ZeroPageX, 4),
        0x4D => op("EOR", Cpu::eor, Absolute, 4),
        0x5D => op("EOR", Cpu::eor, AbsoluteX, 4),
        0x59 => op("EOR", Cpu::eor, AbsoluteY, 4),
        0x41 => op("EOR", Cpu::eor, IndexedIndirectX, 6),
        0x51 => op("EOR", Cpu::eor, IndirectIndexedY, 5),

        // INC
        0xE6 => op("INC", Cpu::inc, ZeroPage, 5),
        0xF6 => op("INC", Cpu::inc, ZeroPageX, 6),
        0xEE => op("INC", Cpu::inc, Absolute, 6),
        0xFE => op("INC", Cpu::inc, AbsoluteX, 7),
        0xE8 => op("INX", Cpu::inx, Implied, 2),
        0xC8 => op("INY", Cpu::iny, Implied, 2),

        // Jumps
        0x4C => op("JMP", Cpu::jmp, Absolute, 3),
        0x6C => op("JMP", Cpu::jmp, Indirect, 5),
        0x20 => op("JSR", Cpu::jsr, Absolute, 6),

        // LDA
        0xA9 => op("LDA", Cpu::lda, Immediate, 2),
        0xA5 => op("LDA", Cpu::lda, ZeroPage, 3),
        0xB5 => op("LDA", Cpu::lda, ZeroPageX, 4),
        0xAD => op("LDA", Cpu::lda, Absolute, 4),
        0xBD => op("LDA", Cpu::lda, AbsoluteX, 4),
        0xB9 => op("LDA", Cpu::lda, AbsoluteY, 4),
        0xA1 => op("LDA", Cpu::lda, IndexedIndirectX, 6),
        0xB1 => op("LDA", Cpu::lda, IndirectIndexedY, 5),

        // LDX
        0xA2 => op("LDX", Cpu::ldx, Immediate, 2),
        0xA6 => op("LDX", Cpu::ldx, ZeroPage, 3),
        0xB6 => op("LDX", Cpu::ldx, ZeroPageY, 4),
        0xAE => op("LDX", Cpu::ldx, Absolute, 4),
        0xBE => op("LDX", Cpu::ldx, AbsoluteY, 4),

        // LDY
        0xA0 => op("LDY", Cpu::ldy, Immediate, 2),
        0xA4 => op("LDY", Cpu::ldy, ZeroPage, 3),
        0xB4 => op("LDY", Cpu::ldy, ZeroPageX, 4),
        0xAC => op("LDY", Cpu::ldy, Absolute, 4),
        0xBC => op("LDY", Cpu::ldy, AbsoluteX, 4),

        // LSR
        0x4A => op("LSR", Cpu::lsr, Accumulator, 2),
        0x46 => op("LSR", Cpu::lsr, ZeroPage, 5),
        0x56 => op("LSR", Cpu::lsr, ZeroPageX, 6),
        0x4E => op("LSR", Cpu::lsr, Absolute, 6),
        0x5E => op("LSR", Cpu::lsr, AbsoluteX, 7),

        0xEA => op("NOP", Cpu::nop, Implied, 2),

        // ORA
        0x09 => op("ORA", Cpu::ora, Immediate, 2),
        0x05 => op("ORA", Cpu::ora, ZeroPage, 3),
        0x15 => op("ORA", Cpu::ora, ZeroPageX, 4),
        0x0D => op("ORA", Cpu::ora, Absolute, 4),
        0x1D => op("ORA", Cpu::ora, AbsoluteX, 4),
        0x19 => op("ORA", Cpu::ora, AbsoluteY, 4),
        0x01 => op("ORA", Cpu::ora, IndexedIndirectX, 6),
        0x11 => op("ORA", Cpu::ora, IndirectIndexedY, 5),

        // Stack
        0x48 => op("PHA", Cpu::pha, Implied, 3),
        0x08 => op("PHP", Cpu::php, Implied, 3),
        0x68 => op("PLA", Cpu::pla, Implied, 4),
        0x28 => op("PLP", Cpu::plp, Implied, 4),

        // ROL
        0x2A => op("ROL", Cpu::rol, Accumulator, 2),
        0x26 => op("ROL", Cpu::rol, ZeroPage, 5),
        0x36 => op("ROL", Cpu::rol, ZeroPageX, 6),
        0x2E => op("ROL", Cpu::rol, Absolute, 6),
        0x3E => op("ROL", Cpu::rol, AbsoluteX, 7),

        // ROR
        0x6A => op("ROR", Cpu::ror, Accumulator, 2),
        0x66 => op("ROR", Cpu::ror, ZeroPage, 5),
        0x76 => op("ROR", Cpu::ror, ZeroPageX, 6),
        0x6E => op("ROR", Cpu::ror, Absolute, 6),
        0x7E => op("ROR", Cpu::ror, AbsoluteX, 7),

        0x40 => op("RTI", Cpu::rti, Implied, 6),
        0x60 => op("RTS", Cpu::rts, Implied, 6),

        // SBC
        0xE9 => op("SBC", Cpu::sbc, Immediate, 2),
        0xE5 => op("SBC", Cpu::sbc, ZeroPage, 3),
        0xF5 => op("SBC", Cpu::sbc, ZeroPageX, 4),
        0xED => op("SBC", Cpu::sbc, Absolute, 4),
        0xFD => op("SBC", Cpu::sbc, AbsoluteX, 4),
        0xF9 => op("SBC", Cpu::sbc, AbsoluteY, 4),
        0xE1 => op("SBC", Cpu::sbc, IndexedIndirectX, 6),
        0xF1 => op("SBC", Cpu::sbc, IndirectIndexedY, 5),

        // Flag sets
        0x38 => op("SEC", Cpu::sec, Implied, 2),
        0xF8 => op("SED", Cpu::sed, Implied, 2),
        0x78 => op("SEI", Cpu::sei, Implied, 2),

        // STA: indexed stores always take the fixed-up cycle
        0x85 => op("STA", Cpu::sta, ZeroPage, 3),
        0x95 => op("STA", Cpu::sta, ZeroPageX, 4),
        0x8D => op("STA", Cpu::sta, Absolute, 4),
        0x9D => op("STA", Cpu::sta, AbsoluteX, 5),
        0x99 => op("STA", Cpu::sta, AbsoluteY, 5),
        0x81 => op("STA", Cpu::sta, IndexedIndirectX, 6),
        0x91 => op("STA", Cpu::sta, IndirectIndexedY, 6),

        // STX / STY
        0x86 => op("STX", Cpu::stx, ZeroPage, 3),
        0x96 => op("STX", Cpu::stx, ZeroPageY, 4),
        0x8E => op("STX", Cpu::stx, Absolute, 4),
        0x84 => op("STY", Cpu::sty, ZeroPage, 3),
        0x94 => op("STY", Cpu::sty, ZeroPageX, 4),
        0x8C => op("STY", Cpu::sty, Absolute, 4),

        // Transfers
        0xAA => op("TAX", Cpu::tax, Implied, 2),
        0xA8 => op("TAY", Cpu::tay, Implied, 2),
        0xBA => op("TSX", Cpu::tsx, Implied, 2),
        0x8A => op("TXA", Cpu::txa, Implied, 2),
        0x9A => op("TXS", Cpu::txs, Implied, 2),
        0x98 => op("TYA", Cpu::tya, Implied, 2),

        _ => ILLEGAL,
    }
}
