//! CB-prefixed bit operations: BIT n,r / RES n,r / SET n,r. The bit
//! index is a decimal-digit operand name ("0".."7"), not a register.

use super::constants::*;
use super::Cpu;
use crate::decoder::DecodedInstruction;
use crate::error::CoreResult;
use crate::memory::MemoryBus;

fn bit_index(instr: &DecodedInstruction) -> u8 {
    instr.operands[0]
        .name
        .parse()
        .expect("BIT/RES/SET's first operand is always a decimal bit index")
}

/// Z is set when the tested bit is 0. H is always set; C is unaffected.
/// Non-destructive: the operand is read, never written back.
pub fn op_bit(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let n = bit_index(instr);
    let value = cpu.read_u8_operand(bus, &instr.operands[1]);
    cpu.set_flag(FLAG_Z, (value >> n) & 1 == 0);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, true);
    Ok(0)
}

/// No flags affected.
pub fn op_res(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let n = bit_index(instr);
    let operand = &instr.operands[1];
    let value = cpu.read_u8_operand(bus, operand);
    cpu.write_u8_operand(bus, operand, value & !(1 << n));
    Ok(0)
}

/// No flags affected.
pub fn op_set(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let n = bit_index(instr);
    let operand = &instr.operands[1];
    let value = cpu.read_u8_operand(bus, operand);
    cpu.write_u8_operand(bus, operand, value | (1 << n));
    Ok(0)
}
