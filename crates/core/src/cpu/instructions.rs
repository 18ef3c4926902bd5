//! Instruction operations.
//!
//! Each operation runs after its addressing mode has been resolved and
//! returns 1 if it is the kind of instruction that pays the page-cross
//! penalty, 0 otherwise.

use super::{AddrMode, Cpu, Flag, IRQ_VECTOR};
use crate::logging::{log, LogCategory, LogLevel};

impl Cpu {
    fn add_with_carry(&mut self, m: u8) {
        let carry_in = self.get_flag(Flag::Carry) as u16;
        let sum = self.a as u16 + m as u16 + carry_in;
        let result = sum as u8;
        self.set_flag(Flag::Carry, sum > 0xFF);
        // overflow: (~(A ^ M) & (A ^ R)) & 0x80
        self.set_flag(Flag::Overflow, (!(self.a ^ m) & (self.a ^ result)) & 0x80 != 0);
        self.a = result;
        self.set_zero_negative(result);
    }

    fn compare(&mut self, reg: u8) {
        let m = self.fetch();
        self.set_flag(Flag::Carry, reg >= m);
        self.set_zero_negative(reg.wrapping_sub(m));
    }

    fn branch_if(&mut self, condition: bool) -> u8 {
        if condition {
            self.cycles += 1;
            self.addr_abs = self.pc.wrapping_add(self.addr_rel);
            if self.addr_abs & 0xFF00 != self.pc & 0xFF00 {
                self.cycles += 1;
            }
            self.pc = self.addr_abs;
        }
        0
    }

    /// Store a shift/rotate result to the accumulator or back to memory
    fn write_back(&mut self, v: u8) {
        if matches!(self.mode, AddrMode::Implied | AddrMode::Accumulator) {
            self.a = v;
        } else {
            self.bus_write(self.addr_abs, v);
        }
    }

    // Loads and stores

    pub(crate) fn lda(&mut self) -> u8 {
        self.a = self.fetch();
        self.set_zero_negative(self.a);
        1
    }

    pub(crate) fn ldx(&mut self) -> u8 {
        self.x = self.fetch();
        self.set_zero_negative(self.x);
        1
    }

    pub(crate) fn ldy(&mut self) -> u8 {
        self.y = self.fetch();
        self.set_zero_negative(self.y);
        1
    }

    pub(crate) fn sta(&mut self) -> u8 {
        self.bus_write(self.addr_abs, self.a);
        0
    }

    pub(crate) fn stx(&mut self) -> u8 {
        self.bus_write(self.addr_abs, self.x);
        0
    }

    pub(crate) fn sty(&mut self) -> u8 {
        self.bus_write(self.addr_abs, self.y);
        0
    }

    // Arithmetic and logic

    pub(crate) fn adc(&mut self) -> u8 {
        let m = self.fetch();
        self.add_with_carry(m);
        1
    }

    /// A - M - (1 - C), done as ADC of the one's complement
    pub(crate) fn sbc(&mut self) -> u8 {
        let m = self.fetch();
        self.add_with_carry(m ^ 0xFF);
        1
    }

    pub(crate) fn and(&mut self) -> u8 {
        self.a &= self.fetch();
        self.set_zero_negative(self.a);
        1
    }

    pub(crate) fn ora(&mut self) -> u8 {
        self.a |= self.fetch();
        self.set_zero_negative(self.a);
        1
    }

    pub(crate) fn eor(&mut self) -> u8 {
        self.a ^= self.fetch();
        self.set_zero_negative(self.a);
        1
    }

    pub(crate) fn bit(&mut self) -> u8 {
        let m = self.fetch();
        self.set_flag(Flag::Zero, self.a & m == 0);
        self.set_flag(Flag::Overflow, m & 0x40 != 0);
        self.set_flag(Flag::Negative, m & 0x80 != 0);
        0
    }

    pub(crate) fn cmp(&mut self) -> u8 {
        self.compare(self.a);
        1
    }

    pub(crate) fn cpx(&mut self) -> u8 {
        self.compare(self.x);
        0
    }

    pub(crate) fn cpy(&mut self) -> u8 {
        self.compare(self.y);
        0
    }

    // Increments and decrements

    pub(crate) fn inc(&mut self) -> u8 {
        let v = self.fetch().wrapping_add(1);
        self.bus_write(self.addr_abs, v);
        self.set_zero_negative(v);
        0
    }

    pub(crate) fn dec(&mut self) -> u8 {
        let v = self.fetch().wrapping_sub(1);
        self.bus_write(self.addr_abs, v);
        self.set_zero_negative(v);
        0
    }

    pub(crate) fn inx(&mut self) -> u8 {
        self.x = self.x.wrapping_add(1);
        self.set_zero_negative(self.x);
        0
    }

    pub(crate) fn iny(&mut self) -> u8 {
        self.y = self.y.wrapping_add(1);
        self.set_zero_negative(self.y);
        0
    }

    pub(crate) fn dex(&mut self) -> u8 {
        self.x = self.x.wrapping_sub(1);
        self.set_zero_negative(self.x);
        0
    }

    pub(crate) fn dey(&mut self) -> u8 {
        self.y = self.y.wrapping_sub(1);
        self.set_zero_negative(self.y);
        0
    }

    // Shifts and rotates

    pub(crate) fn asl(&mut self) -> u8 {
        let old = self.fetch();
        let res = old << 1;
        self.set_flag(Flag::Carry, old & 0x80 != 0);
        self.set_zero_negative(res);
        self.write_back(res);
        0
    }

    pub(crate) fn lsr(&mut self) -> u8 {
        let old = self.fetch();
        let res = old >> 1;
        self.set_flag(Flag::Carry, old & 0x01 != 0);
        self.set_zero_negative(res);
        self.write_back(res);
        0
    }

    pub(crate) fn rol(&mut self) -> u8 {
        let old = self.fetch();
        let res = (old << 1) | self.get_flag(Flag::Carry) as u8;
        self.set_flag(Flag::Carry, old & 0x80 != 0);
        self.set_zero_negative(res);
        self.write_back(res);
        0
    }

    pub(crate) fn ror(&mut self) -> u8 {
        let old = self.fetch();
        let res = (old >> 1) | ((self.get_flag(Flag::Carry) as u8) << 7);
        self.set_flag(Flag::Carry, old & 0x01 != 0);
        self.set_zero_negative(res);
        self.write_back(res);
        0
    }

    // Branches

    pub(crate) fn bcc(&mut self) -> u8 {
        self.branch_if(!self.get_flag(Flag::Carry))
    }

    pub(crate) fn bcs(&mut self) -> u8 {
        self.branch_if(self.get_flag(Flag::Carry))
    }

    pub(crate) fn bne(&mut self) -> u8 {
        self.branch_if(!self.get_flag(Flag::Zero))
    }

    pub(crate) fn beq(&mut self) -> u8 {
        self.branch_if(self.get_flag(Flag::Zero))
    }

    pub(crate) fn bpl(&mut self) -> u8 {
        self.branch_if(!self.get_flag(Flag::Negative))
    }

    pub(crate) fn bmi(&mut self) -> u8 {
        self.branch_if(self.get_flag(Flag::Negative))
    }

    pub(crate) fn bvc(&mut self) -> u8 {
        self.branch_if(!self.get_flag(Flag::Overflow))
    }

    pub(crate) fn bvs(&mut self) -> u8 {
        self.branch_if(self.get_flag(Flag::Overflow))
    }

    // Jumps, subroutines, interrupts

    pub(crate) fn jmp(&mut self) -> u8 {
        self.pc = self.addr_abs;
        0
    }

    pub(crate) fn jsr(&mut self) -> u8 {
        self.push_word(self.pc.wrapping_sub(1));
        self.pc = self.addr_abs;
        0
    }

    pub(crate) fn rts(&mut self) -> u8 {
        self.pc = self.pop_word().wrapping_add(1);
        0
    }

    /// Skips the padding byte, so the pushed return address is the opcode
    /// address + 2.
    pub(crate) fn brk(&mut self) -> u8 {
        let at = self.pc_of_current_opcode();
        self.pc = self.pc.wrapping_add(1);
        self.push_word(self.pc);
        self.push(self.status | Flag::Break.mask() | Flag::Unused.mask());
        self.set_flag(Flag::InterruptDisable, true);
        self.pc = self.read_word(IRQ_VECTOR);
        log(LogCategory::Cpu, LogLevel::Debug, || {
            format!(
                "CPU: BRK at PC={:04X}, vectoring to {:04X}",
                at, self.pc
            )
        });
        0
    }

    pub(crate) fn rti(&mut self) -> u8 {
        let status = self.pop();
        self.load_status(status);
        self.pc = self.pop_word();
        0
    }

    // Stack

    pub(crate) fn pha(&mut self) -> u8 {
        self.push(self.a);
        0
    }

    pub(crate) fn pla(&mut self) -> u8 {
        self.a = self.pop();
        self.set_zero_negative(self.a);
        0
    }

    /// B and bit 5 are set in the pushed copy only
    pub(crate) fn php(&mut self) -> u8 {
        self.push(self.status | Flag::Break.mask() | Flag::Unused.mask());
        0
    }

    pub(crate) fn plp(&mut self) -> u8 {
        let status = self.pop();
        self.load_status(status);
        0
    }

    // Transfers

    pub(crate) fn tax(&mut self) -> u8 {
        self.x = self.a;
        self.set_zero_negative(self.x);
        0
    }

    pub(crate) fn tay(&mut self) -> u8 {
        self.y = self.a;
        self.set_zero_negative(self.y);
        0
    }

    pub(crate) fn txa(&mut self) -> u8 {
        self.a = self.x;
        self.set_zero_negative(self.a);
        0
    }

    pub(crate) fn tya(&mut self) -> u8 {
        self.a = self.y;
        self.set_zero_negative(self.a);
        0
    }

    pub(crate) fn tsx(&mut self) -> u8 {
        self.x = self.sp;
        self.set_zero_negative(self.x);
        0
    }

    pub(crate) fn txs(&mut self) -> u8 {
        self.sp = self.x;
        0
    }

    // Flags

    pub(crate) fn clc(&mut self) -> u8 {
        self.set_flag(Flag::Carry, false);
        0
    }

    pub(crate) fn sec(&mut self) -> u8 {
        self.set_flag(Flag::Carry, true);
        0
    }

    pub(crate) fn cli(&mut self) -> u8 {
        self.set_flag(Flag::InterruptDisable, false);
        0
    }

    pub(crate) fn sei(&mut self) -> u8 {
        self.set_flag(Flag::InterruptDisable, true);
        0
    }

    pub(crate) fn cld(&mut self) -> u8 {
        self.set_flag(Flag::Decimal, false);
        0
    }

    pub(crate) fn sed(&mut self) -> u8 {
        self.set_flag(Flag::Decimal, true);
        0
    }

    pub(crate) fn clv(&mut self) -> u8 {
        self.set_flag(Flag::Overflow, false);
        0
    }

    pub(crate) fn nop(&mut self) -> u8 {
        0
    }

    /// Placeholder for undocumented opcodes: no state change beyond the
    /// fetch.
    pub(crate) fn xxx(&mut self) -> u8 {
        log(LogCategory::Stubs, LogLevel::Warn, || {
            format!(
                "CPU: unemulated opcode {:02X} at PC={:04X} treated as NOP",
                self.opcode,
                self.pc_of_current_opcode()
            )
        });
        0
    }

    fn pc_of_current_opcode(&self) -> u16 {
        // Only meaningful before the operation moves pc
        self.pc.wrapping_sub(1 + self.mode.operand_bytes())
    }
}

#[cfg(test)]
mod tests {
    use crate::bus::tests::boot;
    use crate::cpu::{Flag, STACK_BASE};

    #[test]
    fn lda_immediate_sets_a_and_flags() {
        let bus = boot(&[0xA9, 0x05, 0xEA]);
        assert_eq!(bus.step_instruction(), 2);
        let cpu = bus.cpu();
        assert_eq!(cpu.a, 5);
        assert!(!cpu.get_flag(Flag::Zero));
        assert!(!cpu.get_flag(Flag::Negative));
    }

    #[test]
    fn lda_zero_and_negative_flags() {
        let bus = boot(&[0xA9, 0x00, 0xA9, 0x80]);
        bus.step_instruction();
        assert!(bus.cpu().get_flag(Flag::Zero));
        bus.step_instruction();
        assert!(!bus.cpu().get_flag(Flag::Zero));
        assert!(bus.cpu().get_flag(Flag::Negative));
    }

    #[test]
    fn lda_absolute_x_page_cross_costs_a_cycle() {
        // LDA $20FF,X with X=1 reads $2100
        let bus = boot(&[0xA2, 0x01, 0xBD, 0xFF, 0x20, 0xBD, 0x00, 0x20]);
        bus.write(0x2100, 0x42);
        bus.write(0x2001, 0x24);
        assert_eq!(bus.step_instruction(), 2);
        assert_eq!(bus.step_instruction(), 5);
        assert_eq!(bus.cpu().a, 0x42);
        assert_eq!(bus.step_instruction(), 4);
        assert_eq!(bus.cpu().a, 0x24);
    }

    #[test]
    fn lda_indirect_indexed_page_cross() {
        // LDY #$01; LDA ($40),Y with pointer $20FF
        let bus = boot(&[0xA0, 0x01, 0xB1, 0x40]);
        bus.write(0x0040, 0xFF);
        bus.write(0x0041, 0x20);
        bus.write(0x2100, 0x99);
        bus.step_instruction();
        assert_eq!(bus.step_instruction(), 6);
        assert_eq!(bus.cpu().a, 0x99);
    }

    #[test]
    fn store_absolute_x_never_pays_page_cross() {
        // LDX #$01; LDA #$5A; STA $20FF,X
        let bus = boot(&[0xA2, 0x01, 0xA9, 0x5A, 0x9D, 0xFF, 0x20]);
        bus.step_instruction();
        bus.step_instruction();
        assert_eq!(bus.step_instruction(), 5);
        assert_eq!(bus.read(0x2100), 0x5A);
    }

    #[test]
    fn ldx_zero_page_y_and_ldy_absolute_x() {
        // LDY #$02; LDX $10,Y; LDY $3000,X
        let bus = boot(&[0xA0, 0x02, 0xB6, 0x10, 0xBC, 0x00, 0x30]);
        bus.write(0x0012, 0x04);
        bus.write(0x3004, 0x7E);
        bus.step_instruction();
        assert_eq!(bus.step_instruction(), 4);
        assert_eq!(bus.cpu().x, 0x04);
        assert_eq!(bus.step_instruction(), 4);
        assert_eq!(bus.cpu().y, 0x7E);
    }

    #[test]
    fn stx_sty_store_registers() {
        // LDX #$11; LDY #$22; STX $10; STY $0300
        let bus = boot(&[0xA2, 0x11, 0xA0, 0x22, 0x86, 0x10, 0x8C, 0x00, 0x03]);
        for _ in 0..4 {
            bus.step_instruction();
        }
        assert_eq!(bus.read(0x0010), 0x11);
        assert_eq!(bus.read(0x0300), 0x22);
    }

    #[test]
    fn adc_carry_and_overflow() {
        // CLC; LDA #$50; ADC #$50 -> $A0, V set, C clear
        let bus = boot(&[0x18, 0xA9, 0x50, 0x69, 0x50, 0x69, 0x70]);
        for _ in 0..3 {
            bus.step_instruction();
        }
        {
            let cpu = bus.cpu();
            assert_eq!(cpu.a, 0xA0);
            assert!(cpu.get_flag(Flag::Overflow));
            assert!(!cpu.get_flag(Flag::Carry));
            assert!(cpu.get_flag(Flag::Negative));
        }
        // ADC #$70 -> $110: carry out, no signed overflow (neg + pos)
        bus.step_instruction();
        let cpu = bus.cpu();
        assert_eq!(cpu.a, 0x10);
        assert!(cpu.get_flag(Flag::Carry));
        assert!(!cpu.get_flag(Flag::Overflow));
    }

    #[test]
    fn adc_uses_carry_in() {
        // SEC; LDA #$FF; ADC #$01 -> $01 with carry
        let bus = boot(&[0x38, 0xA9, 0xFF, 0x69, 0x01]);
        for _ in 0..3 {
            bus.step_instruction();
        }
        let cpu = bus.cpu();
        assert_eq!(cpu.a, 0x01);
        assert!(cpu.get_flag(Flag::Carry));
    }

    #[test]
    fn adc_ignores_decimal_flag() {
        // SED; CLC; LDA #$09; ADC #$01 -> binary $0A
        let bus = boot(&[0xF8, 0x18, 0xA9, 0x09, 0x69, 0x01]);
        for _ in 0..4 {
            bus.step_instruction();
        }
        assert_eq!(bus.cpu().a, 0x0A);
        assert!(bus.cpu().get_flag(Flag::Decimal));
    }

    #[test]
    fn sbc_borrow_and_overflow() {
        // SEC; LDA #$50; SBC #$F0 -> $60, borrow (C clear), no overflow
        let bus = boot(&[0x38, 0xA9, 0x50, 0xE9, 0xF0]);
        for _ in 0..3 {
            bus.step_instruction();
        }
        {
            let cpu = bus.cpu();
            assert_eq!(cpu.a, 0x60);
            assert!(!cpu.get_flag(Flag::Carry));
            assert!(!cpu.get_flag(Flag::Overflow));
        }

        // SEC; LDA #$50; SBC #$B0 -> $A0, overflow
        let bus = boot(&[0x38, 0xA9, 0x50, 0xE9, 0xB0]);
        for _ in 0..3 {
            bus.step_instruction();
        }
        let cpu = bus.cpu();
        assert_eq!(cpu.a, 0xA0);
        assert!(cpu.get_flag(Flag::Overflow));
        assert!(!cpu.get_flag(Flag::Carry));
    }

    #[test]
    fn sbc_without_borrow_keeps_carry() {
        // SEC; LDA #$05; SBC #$03 -> $02, C set
        let bus = boot(&[0x38, 0xA9, 0x05, 0xE9, 0x03]);
        for _ in 0..3 {
            bus.step_instruction();
        }
        assert_eq!(bus.cpu().a, 0x02);
        assert!(bus.cpu().get_flag(Flag::Carry));
    }

    #[test]
    fn logic_ops() {
        // LDA #$F0; AND #$3C; ORA #$01; EOR #$FF
        let bus = boot(&[0xA9, 0xF0, 0x29, 0x3C, 0x09, 0x01, 0x49, 0xFF]);
        bus.step_instruction();
        bus.step_instruction();
        assert_eq!(bus.cpu().a, 0x30);
        bus.step_instruction();
        assert_eq!(bus.cpu().a, 0x31);
        bus.step_instruction();
        assert_eq!(bus.cpu().a, 0xCE);
        assert!(bus.cpu().get_flag(Flag::Negative));
    }

    #[test]
    fn bit_copies_high_bits_of_operand() {
        // LDA #$01; BIT $10
        let bus = boot(&[0xA9, 0x01, 0x24, 0x10]);
        bus.write(0x0010, 0xC0);
        bus.step_instruction();
        assert_eq!(bus.step_instruction(), 3);
        let cpu = bus.cpu();
        assert!(cpu.get_flag(Flag::Zero));
        assert!(cpu.get_flag(Flag::Overflow));
        assert!(cpu.get_flag(Flag::Negative));
        assert_eq!(cpu.a, 0x01);
    }

    #[test]
    fn compare_sets_carry_zero_negative() {
        // LDA #$40; CMP #$40; CMP #$41; CMP #$10
        let bus = boot(&[0xA9, 0x40, 0xC9, 0x40, 0xC9, 0x41, 0xC9, 0x10]);
        bus.step_instruction();
        bus.step_instruction();
        {
            let cpu = bus.cpu();
            assert!(cpu.get_flag(Flag::Carry));
            assert!(cpu.get_flag(Flag::Zero));
        }
        bus.step_instruction();
        {
            let cpu = bus.cpu();
            assert!(!cpu.get_flag(Flag::Carry));
            assert!(!cpu.get_flag(Flag::Zero));
            assert!(cpu.get_flag(Flag::Negative));
        }
        bus.step_instruction();
        let cpu = bus.cpu();
        assert!(cpu.get_flag(Flag::Carry));
        assert!(!cpu.get_flag(Flag::Negative));
    }

    #[test]
    fn cpx_cpy() {
        // LDX #$05; CPX #$06; LDY #$09; CPY $10
        let bus = boot(&[0xA2, 0x05, 0xE0, 0x06, 0xA0, 0x09, 0xC4, 0x10]);
        bus.write(0x0010, 0x09);
        bus.step_instruction();
        bus.step_instruction();
        assert!(!bus.cpu().get_flag(Flag::Carry));
        bus.step_instruction();
        assert_eq!(bus.step_instruction(), 3);
        assert!(bus.cpu().get_flag(Flag::Carry));
        assert!(bus.cpu().get_flag(Flag::Zero));
    }

    #[test]
    fn inc_dec_memory_wrap() {
        // INC $10; DEC $11
        let bus = boot(&[0xE6, 0x10, 0xC6, 0x11]);
        bus.write(0x0010, 0xFF);
        bus.write(0x0011, 0x00);
        assert_eq!(bus.step_instruction(), 5);
        assert_eq!(bus.read(0x0010), 0x00);
        assert!(bus.cpu().get_flag(Flag::Zero));
        assert_eq!(bus.step_instruction(), 5);
        assert_eq!(bus.read(0x0011), 0xFF);
        assert!(bus.cpu().get_flag(Flag::Negative));
    }

    #[test]
    fn register_increments() {
        // INX; INY; DEX; DEX; DEY
        let bus = boot(&[0xE8, 0xC8, 0xCA, 0xCA, 0x88]);
        for _ in 0..5 {
            bus.step_instruction();
        }
        let cpu = bus.cpu();
        assert_eq!(cpu.x, 0xFF);
        assert_eq!(cpu.y, 0x00);
        assert!(cpu.get_flag(Flag::Zero));
    }

    #[test]
    fn asl_accumulator_and_memory() {
        // LDA #$81; ASL A; ASL $10
        let bus = boot(&[0xA9, 0x81, 0x0A, 0x06, 0x10]);
        bus.write(0x0010, 0x40);
        bus.step_instruction();
        assert_eq!(bus.step_instruction(), 2);
        assert_eq!(bus.cpu().a, 0x02);
        assert!(bus.cpu().get_flag(Flag::Carry));
        assert_eq!(bus.step_instruction(), 5);
        assert_eq!(bus.read(0x0010), 0x80);
        assert!(!bus.cpu().get_flag(Flag::Carry));
        assert!(bus.cpu().get_flag(Flag::Negative));
        // accumulator untouched by the memory form
        assert_eq!(bus.cpu().a, 0x02);
    }

    #[test]
    fn lsr_sets_carry_from_bit_zero() {
        // LDA #$01; LSR A
        let bus = boot(&[0xA9, 0x01, 0x4A]);
        bus.step_instruction();
        bus.step_instruction();
        let cpu = bus.cpu();
        assert_eq!(cpu.a, 0);
        assert!(cpu.get_flag(Flag::Carry));
        assert!(cpu.get_flag(Flag::Zero));
    }

    #[test]
    fn rol_ror_through_carry() {
        // SEC; LDA #$80; ROL A -> $01, C=1; ROR A -> $80, C=1
        let bus = boot(&[0x38, 0xA9, 0x80, 0x2A, 0x6A]);
        for _ in 0..3 {
            bus.step_instruction();
        }
        assert_eq!(bus.cpu().a, 0x01);
        assert!(bus.cpu().get_flag(Flag::Carry));
        bus.step_instruction();
        assert_eq!(bus.cpu().a, 0x80);
        assert!(bus.cpu().get_flag(Flag::Carry));
    }

    #[test]
    fn rotate_memory_indexed() {
        // LDX #$05; ROR $10,X; ROL $0300,X
        let bus = boot(&[0xA2, 0x05, 0x76, 0x10, 0x3E, 0x00, 0x03]);
        bus.write(0x0015, 0x02);
        bus.write(0x0305, 0x80);
        bus.step_instruction();
        assert_eq!(bus.step_instruction(), 6);
        assert_eq!(bus.read(0x0015), 0x01);
        assert!(!bus.cpu().get_flag(Flag::Carry));
        assert_eq!(bus.step_instruction(), 7);
        assert_eq!(bus.read(0x0305), 0x00);
        assert!(bus.cpu().get_flag(Flag::Carry));
    }

    #[test]
    fn beq_branches_when_zero() {
        // LDA #0; BEQ +2; LDA #1; LDA #2
        let bus = boot(&[0xA9, 0x00, 0xF0, 0x02, 0xA9, 0x01, 0xA9, 0x02]);
        assert_eq!(bus.step_instruction(), 2);
        assert_eq!(bus.step_instruction(), 3);
        assert_eq!(bus.cpu().pc, 0x8006);
        assert_eq!(bus.step_instruction(), 2);
        assert_eq!(bus.cpu().a, 2);
    }

    #[test]
    fn branch_not_taken_costs_base_cycles() {
        // LDA #1; BEQ +2
        let bus = boot(&[0xA9, 0x01, 0xF0, 0x02]);
        bus.step_instruction();
        assert_eq!(bus.step_instruction(), 2);
        assert_eq!(bus.cpu().pc, 0x8004);
    }

    #[test]
    fn branch_backwards_across_page() {
        // At $8000: BNE -3 -> target $7FFF (previous page)
        let bus = boot(&[0xD0, 0xFD]);
        assert_eq!(bus.step_instruction(), 4);
        assert_eq!(bus.cpu().pc, 0x7FFF);
    }

    #[test]
    fn every_branch_follows_its_flag() {
        let cases: [(u8, Flag, bool); 8] = [
            (0x90, Flag::Carry, false),
            (0xB0, Flag::Carry, true),
            (0xD0, Flag::Zero, false),
            (0xF0, Flag::Zero, true),
            (0x10, Flag::Negative, false),
            (0x30, Flag::Negative, true),
            (0x50, Flag::Overflow, false),
            (0x70, Flag::Overflow, true),
        ];
        for (opcode, flag, taken_when) in cases {
            for state in [false, true] {
                let bus = boot(&[opcode, 0x10]);
                bus.cpu_mut().set_flag(flag, state);
                bus.step_instruction();
                let expected = if state == taken_when { 0x8012 } else { 0x8002 };
                assert_eq!(bus.cpu().pc, expected, "opcode {opcode:02X} with {flag:?}={state}");
            }
        }
    }

    #[test]
    fn jmp_absolute_and_indirect() {
        // JMP $9000; at $9000: JMP ($10FF) with the page-wrap bug
        let bus = boot(&[0x4C, 0x00, 0x90]);
        bus.load(0x9000, &[0x6C, 0xFF, 0x10]).unwrap();
        bus.write(0x10FF, 0x34);
        bus.write(0x1000, 0x12);
        assert_eq!(bus.step_instruction(), 3);
        assert_eq!(bus.cpu().pc, 0x9000);
        assert_eq!(bus.step_instruction(), 5);
        assert_eq!(bus.cpu().pc, 0x1234);
    }

    #[test]
    fn jsr_rts_returns() {
        // JSR $8010; LDA #1, with RTS at $8010
        let bus = boot(&[0x20, 0x10, 0x80, 0xA9, 0x01]);
        bus.write(0x8010, 0x60);
        assert_eq!(bus.step_instruction(), 6);
        assert_eq!(bus.cpu().pc, 0x8010);
        // return address - 1 on the stack, high byte first
        assert_eq!(bus.read(STACK_BASE + 0xFD), 0x80);
        assert_eq!(bus.read(STACK_BASE + 0xFC), 0x02);
        assert_eq!(bus.step_instruction(), 6);
        assert_eq!(bus.cpu().pc, 0x8003);
        assert_eq!(bus.step_instruction(), 2);
        assert_eq!(bus.cpu().a, 1);
        assert_eq!(bus.cpu().sp, 0xFD);
    }

    #[test]
    fn brk_pushes_state_and_vectors() {
        let bus = boot(&[0x00, 0xFF]);
        bus.write(0xFFFE, 0x00);
        bus.write(0xFFFF, 0x90);
        bus.cpu_mut().set_flag(Flag::Carry, true);
        assert_eq!(bus.step_instruction(), 7);
        let cpu = bus.cpu();
        assert_eq!(cpu.pc, 0x9000);
        assert!(cpu.get_flag(Flag::InterruptDisable));
        assert!(!cpu.get_flag(Flag::Break));
        assert_eq!(bus.read(STACK_BASE + 0xFD), 0x80);
        assert_eq!(bus.read(STACK_BASE + 0xFC), 0x02);
        let pushed = bus.read(STACK_BASE + 0xFB);
        assert_eq!(pushed & 0x31, 0x31);
        assert_eq!(cpu.sp, 0xFA);
    }

    #[test]
    fn brk_then_rti_resumes_after_padding() {
        // BRK; (pad); LDA #$07 ; handler at $9000: RTI
        let bus = boot(&[0x00, 0xEA, 0xA9, 0x07]);
        bus.write(0xFFFE, 0x00);
        bus.write(0xFFFF, 0x90);
        bus.write(0x9000, 0x40);
        bus.step_instruction();
        assert_eq!(bus.step_instruction(), 6);
        {
            let cpu = bus.cpu();
            assert_eq!(cpu.pc, 0x8002);
            assert!(!cpu.get_flag(Flag::Break));
            assert!(cpu.get_flag(Flag::Unused));
            assert!(!cpu.get_flag(Flag::InterruptDisable));
        }
        bus.step_instruction();
        assert_eq!(bus.cpu().a, 0x07);
    }

    #[test]
    fn pha_pla_roundtrip() {
        // LDA #$7F; PHA; LDA #0; PLA
        let bus = boot(&[0xA9, 0x7F, 0x48, 0xA9, 0x00, 0x68]);
        bus.step_instruction();
        assert_eq!(bus.step_instruction(), 3);
        assert_eq!(bus.step_instruction(), 2);
        assert!(bus.cpu().get_flag(Flag::Zero));
        assert_eq!(bus.step_instruction(), 4);
        assert_eq!(bus.cpu().a, 0x7F);
        assert!(!bus.cpu().get_flag(Flag::Zero));
    }

    #[test]
    fn php_plp_break_and_unused_bits() {
        // SEC; PHP; CLC; PLP
        let bus = boot(&[0x38, 0x08, 0x18, 0x28]);
        bus.step_instruction();
        bus.step_instruction();
        let pushed = bus.read(STACK_BASE + 0xFD);
        assert_eq!(pushed, 0x31);
        bus.step_instruction();
        assert!(!bus.cpu().get_flag(Flag::Carry));
        assert_eq!(bus.step_instruction(), 4);
        let cpu = bus.cpu();
        assert!(cpu.get_flag(Flag::Carry));
        assert!(!cpu.get_flag(Flag::Break));
        assert!(cpu.get_flag(Flag::Unused));
    }

    #[test]
    fn plp_forces_unused_bit() {
        // LDA #$00; PHA; PLP
        let bus = boot(&[0xA9, 0x00, 0x48, 0x28]);
        for _ in 0..3 {
            bus.step_instruction();
        }
        assert_eq!(bus.cpu().status(), 0x20);
    }

    #[test]
    fn transfers() {
        // LDA #$80; TAX; TAY; LDA #0; TXA; LDX #$40; TXS; TSX; TYA
        let bus = boot(&[
            0xA9, 0x80, 0xAA, 0xA8, 0xA9, 0x00, 0x8A, 0xA2, 0x40, 0x9A, 0xBA, 0x98,
        ]);
        bus.step_instruction();
        bus.step_instruction();
        bus.step_instruction();
        assert_eq!((bus.cpu().x, bus.cpu().y), (0x80, 0x80));
        assert!(bus.cpu().get_flag(Flag::Negative));
        bus.step_instruction();
        bus.step_instruction();
        assert_eq!(bus.cpu().a, 0x80);
        bus.step_instruction();
        bus.step_instruction();
        assert_eq!(bus.cpu().sp, 0x40);
        // TXS leaves flags alone
        assert!(!bus.cpu().get_flag(Flag::Negative));
        bus.step_instruction();
        assert_eq!(bus.cpu().x, 0x40);
        bus.step_instruction();
        assert_eq!(bus.cpu().a, 0x80);
    }

    #[test]
    fn flag_instructions() {
        // SEC SEI SED CLC CLI CLD
        let bus = boot(&[0x38, 0x78, 0xF8, 0x18, 0x58, 0xD8]);
        for _ in 0..3 {
            bus.step_instruction();
        }
        {
            let cpu = bus.cpu();
            assert!(cpu.get_flag(Flag::Carry));
            assert!(cpu.get_flag(Flag::InterruptDisable));
            assert!(cpu.get_flag(Flag::Decimal));
        }
        for _ in 0..3 {
            bus.step_instruction();
        }
        assert_eq!(bus.cpu().status(), 0x20);
    }

    #[test]
    fn clv_clears_overflow() {
        // LDA #$40; ADC #$40 (sets V); CLV
        let bus = boot(&[0xA9, 0x40, 0x69, 0x40, 0xB8]);
        bus.step_instruction();
        bus.step_instruction();
        assert!(bus.cpu().get_flag(Flag::Overflow));
        bus.step_instruction();
        assert!(!bus.cpu().get_flag(Flag::Overflow));
    }

    #[test]
    fn placeholder_opcode_only_advances_pc() {
        let bus = boot(&[0x02, 0xEA]);
        let before = bus.cpu().registers();
        assert_eq!(bus.step_instruction(), 2);
        let after = bus.cpu().registers();
        assert_eq!(after.pc, before.pc + 1);
        assert_eq!((after.a, after.x, after.y, after.sp), (before.a, before.x, before.y, before.sp));
        assert_eq!(after.status, before.status);
    }
}
