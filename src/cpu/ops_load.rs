//! The LD family. One generic handler covers every two-operand LD
//! (register-register, register-immediate, register-memory, and the
//! HL+/HL-/(C)/a8/a16 addressing forms) by dispatching on operand
//! width; `LD (a16),SP` and `LD HL,SP+e8` get dedicated handlers since
//! neither fits the generic register/memory shape.

use super::constants::*;
use super::{ops_alu, Cpu};
use crate::decoder::DecodedInstruction;
use crate::error::CoreResult;
use crate::memory::MemoryBus;

const WIDE_REGS: [&str; 5] = ["BC", "DE", "HL", "SP", "AF"];

pub fn op_ld(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let dest = &instr.operands[0];
    let src = &instr.operands[1];
    if dest.is_immediate && WIDE_REGS.contains(&dest.name.as_str()) {
        let value = cpu.read_u16_operand(src);
        cpu.write_u16_operand(dest, value);
    } else {
        let value = cpu.read_u8_operand(bus, src);
        cpu.write_u8_operand(bus, dest, value);
    }
    Ok(0)
}

/// `LD (a16), SP`: stores SP as two little-endian bytes at a literal
/// 16-bit address, not through the register/memory operand machinery
/// (the destination is memory but the source is 16 bits wide).
pub fn op_ld_a16_sp(
    cpu: &mut Cpu,
    bus: &mut MemoryBus,
    instr: &DecodedInstruction,
) -> CoreResult<u16> {
    let addr = instr.operands[0].value.unwrap();
    let sp = cpu.registers.sp;
    bus.write(addr, sp as u8);
    bus.write(addr.wrapping_add(1), (sp >> 8) as u8);
    Ok(0)
}

/// `LD HL, SP+e8`: flag computation is identical to ADD SP,e8.
pub fn op_ld_hl_sp_plus_r8(
    cpu: &mut Cpu,
    _bus: &mut MemoryBus,
    instr: &DecodedInstruction,
) -> CoreResult<u16> {
    let offset = instr.operands[2].value.unwrap() as u8 as i8;
    let (result, half_carry, carry) = ops_alu::sp_plus_offset(cpu.registers.sp, offset);
    cpu.registers.set_hl(result);
    cpu.set_flag(FLAG_Z, false);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, half_carry);
    cpu.set_flag(FLAG_C, carry);
    Ok(0)
}
