//! 8-bit and 16-bit arithmetic/logic: INC/DEC, ADD/ADC/SUB/SBC/AND/XOR/OR/CP,
//! ADD HL,rr, ADD SP,e8, DAA, CPL, SCF, CCF.

use super::constants::*;
use super::Cpu;
use crate::decoder::{DecodedInstruction, ResolvedOperand};
use crate::error::CoreResult;
use crate::memory::MemoryBus;

const WIDE_REGS: [&str; 5] = ["BC", "DE", "HL", "SP", "AF"];

fn is_wide_register(operand: &ResolvedOperand) -> bool {
    operand.is_immediate && WIDE_REGS.contains(&operand.name.as_str())
}

pub fn op_inc(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let operand = &instr.operands[0];
    if is_wide_register(operand) {
        let value = cpu.read_u16_operand(operand).wrapping_add(1);
        cpu.write_u16_operand(operand, value);
    } else {
        let value = cpu.read_u8_operand(bus, operand);
        let result = value.wrapping_add(1);
        cpu.set_flag(FLAG_Z, result == 0);
        cpu.set_flag(FLAG_N, false);
        cpu.set_flag(FLAG_H, (value & 0x0F) == 0x0F);
        cpu.write_u8_operand(bus, operand, result);
    }
    Ok(0)
}

pub fn op_dec(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let operand = &instr.operands[0];
    if is_wide_register(operand) {
        let value = cpu.read_u16_operand(operand).wrapping_sub(1);
        cpu.write_u16_operand(operand, value);
    } else {
        let value = cpu.read_u8_operand(bus, operand);
        let result = value.wrapping_sub(1);
        cpu.set_flag(FLAG_Z, result == 0);
        cpu.set_flag(FLAG_N, true);
        cpu.set_flag(FLAG_H, (value & 0x0F) == 0x00);
        cpu.write_u8_operand(bus, operand, result);
    }
    Ok(0)
}

fn add8(cpu: &mut Cpu, value: u8, carry_in: u8) {
    let a = cpu.registers.a;
    let (r1, c1) = a.overflowing_add(value);
    let (result, c2) = r1.overflowing_add(carry_in);
    let half_carry = (a & 0x0F) + (value & 0x0F) + carry_in > 0x0F;
    cpu.registers.a = result;
    cpu.set_flag(FLAG_Z, result == 0);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, half_carry);
    cpu.set_flag(FLAG_C, c1 || c2);
}

fn sub8(cpu: &mut Cpu, value: u8, carry_in: u8) -> u8 {
    let a = cpu.registers.a;
    let (r1, b1) = a.overflowing_sub(value);
    let (result, b2) = r1.overflowing_sub(carry_in);
    let half_borrow = (a & 0x0F) < (value & 0x0F) + carry_in;
    cpu.set_flag(FLAG_Z, result == 0);
    cpu.set_flag(FLAG_N, true);
    cpu.set_flag(FLAG_H, half_borrow);
    cpu.set_flag(FLAG_C, b1 || b2);
    result
}

pub fn op_add_a(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.read_u8_operand(bus, &instr.operands[1]);
    add8(cpu, value, 0);
    Ok(0)
}

pub fn op_adc_a(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.read_u8_operand(bus, &instr.operands[1]);
    let carry_in = cpu.get_flag(FLAG_C) as u8;
    add8(cpu, value, carry_in);
    Ok(0)
}

pub fn op_sub_a(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.read_u8_operand(bus, &instr.operands[1]);
    cpu.registers.a = sub8(cpu, value, 0);
    Ok(0)
}

pub fn op_sbc_a(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.read_u8_operand(bus, &instr.operands[1]);
    let carry_in = cpu.get_flag(FLAG_C) as u8;
    cpu.registers.a = sub8(cpu, value, carry_in);
    Ok(0)
}

pub fn op_and_a(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.read_u8_operand(bus, &instr.operands[1]);
    cpu.registers.a &= value;
    cpu.set_flag(FLAG_Z, cpu.registers.a == 0);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, true);
    cpu.set_flag(FLAG_C, false);
    Ok(0)
}

pub fn op_xor_a(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.read_u8_operand(bus, &instr.operands[1]);
    cpu.registers.a ^= value;
    cpu.set_flag(FLAG_Z, cpu.registers.a == 0);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, false);
    cpu.set_flag(FLAG_C, false);
    Ok(0)
}

pub fn op_or_a(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.read_u8_operand(bus, &instr.operands[1]);
    cpu.registers.a |= value;
    cpu.set_flag(FLAG_Z, cpu.registers.a == 0);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, false);
    cpu.set_flag(FLAG_C, false);
    Ok(0)
}

pub fn op_cp_a(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.read_u8_operand(bus, &instr.operands[1]);
    sub8(cpu, value, 0);
    Ok(0)
}

pub fn op_add_hl_rr(
    cpu: &mut Cpu,
    _bus: &mut MemoryBus,
    instr: &DecodedInstruction,
) -> CoreResult<u16> {
    let rr = cpu.read_u16_operand(&instr.operands[1]);
    let hl = cpu.registers.hl();
    let (result, carry) = hl.overflowing_add(rr);
    let half_carry = (hl & 0x0FFF) + (rr & 0x0FFF) > 0x0FFF;
    cpu.registers.set_hl(result);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, half_carry);
    cpu.set_flag(FLAG_C, carry);
    Ok(0)
}

/// Shared by ADD SP,e8 and LD HL,SP+e8: both sign-extend an 8-bit
/// displacement but compute H/C from an unsigned add of SP's low byte.
pub(super) fn sp_plus_offset(sp: u16, offset: i8) -> (u16, bool, bool) {
    let sp_lo = sp as u8;
    let offset_u8 = offset as u8;
    let (_, carry) = sp_lo.overflowing_add(offset_u8);
    let half_carry = (sp_lo & 0x0F) + (offset_u8 & 0x0F) > 0x0F;
    let result = sp.wrapping_add(offset as i16 as u16);
    (result, half_carry, carry)
}

pub fn op_add_sp_r8(
    cpu: &mut Cpu,
    _bus: &mut MemoryBus,
    instr: &DecodedInstruction,
) -> CoreResult<u16> {
    let offset = instr.operands[1].value.unwrap() as u8 as i8;
    let (result, half_carry, carry) = sp_plus_offset(cpu.registers.sp, offset);
    cpu.registers.sp = result;
    cpu.set_flag(FLAG_Z, false);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, half_carry);
    cpu.set_flag(FLAG_C, carry);
    Ok(0)
}

pub fn op_daa(cpu: &mut Cpu, _bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    let mut adjustment = 0u8;
    let mut set_carry = false;
    let n = cpu.get_flag(FLAG_N);
    let h = cpu.get_flag(FLAG_H);
    let c = cpu.get_flag(FLAG_C);
    if !n {
        if c || cpu.registers.a > 0x99 {
            adjustment |= 0x60;
            set_carry = true;
        }
        if h || (cpu.registers.a & 0x0F) > 0x09 {
            adjustment |= 0x06;
        }
        cpu.registers.a = cpu.registers.a.wrapping_add(adjustment);
    } else {
        if c {
            adjustment |= 0x60;
            set_carry = true;
        }
        if h {
            adjustment |= 0x06;
        }
        cpu.registers.a = cpu.registers.a.wrapping_sub(adjustment);
    }
    cpu.set_flag(FLAG_Z, cpu.registers.a == 0);
    cpu.set_flag(FLAG_H, false);
    cpu.set_flag(FLAG_C, set_carry);
    Ok(0)
}

pub fn op_cpl(cpu: &mut Cpu, _bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    cpu.registers.a = !cpu.registers.a;
    cpu.set_flag(FLAG_N, true);
    cpu.set_flag(FLAG_H, true);
    Ok(0)
}

pub fn op_scf(cpu: &mut Cpu, _bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, false);
    cpu.set_flag(FLAG_C, true);
    Ok(0)
}

pub fn op_ccf(cpu: &mut Cpu, _bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, false);
    let carry = cpu.get_flag(FLAG_C);
    cpu.set_flag(FLAG_C, !carry);
    Ok(0)
}
