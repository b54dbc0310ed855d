//! Rotates and shifts: the non-CB accumulator forms (RLCA/RRCA/RLA/RRA,
//! which always clear Z) and the CB-prefixed register/memory forms
//! (RLC/RRC/RL/RR/SLA/SRA/SWAP/SRL, which set Z from the result).

use super::constants::*;
use super::Cpu;
use crate::decoder::DecodedInstruction;
use crate::error::CoreResult;
use crate::memory::MemoryBus;

fn rlc(cpu: &mut Cpu, value: u8) -> u8 {
    let carry = value & 0x80 != 0;
    let result = value.rotate_left(1);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, false);
    cpu.set_flag(FLAG_C, carry);
    result
}

fn rrc(cpu: &mut Cpu, value: u8) -> u8 {
    let carry = value & 0x01 != 0;
    let result = value.rotate_right(1);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, false);
    cpu.set_flag(FLAG_C, carry);
    result
}

fn rl(cpu: &mut Cpu, value: u8) -> u8 {
    let carry_in = cpu.get_flag(FLAG_C) as u8;
    let carry_out = value & 0x80 != 0;
    let result = (value << 1) | carry_in;
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, false);
    cpu.set_flag(FLAG_C, carry_out);
    result
}

fn rr(cpu: &mut Cpu, value: u8) -> u8 {
    let carry_in = cpu.get_flag(FLAG_C) as u8;
    let carry_out = value & 0x01 != 0;
    let result = (value >> 1) | (carry_in << 7);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, false);
    cpu.set_flag(FLAG_C, carry_out);
    result
}

pub fn op_rlca(cpu: &mut Cpu, _bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.registers.a;
    cpu.registers.a = rlc(cpu, value);
    cpu.set_flag(FLAG_Z, false);
    Ok(0)
}

pub fn op_rrca(cpu: &mut Cpu, _bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.registers.a;
    cpu.registers.a = rrc(cpu, value);
    cpu.set_flag(FLAG_Z, false);
    Ok(0)
}

pub fn op_rla(cpu: &mut Cpu, _bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.registers.a;
    cpu.registers.a = rl(cpu, value);
    cpu.set_flag(FLAG_Z, false);
    Ok(0)
}

pub fn op_rra(cpu: &mut Cpu, _bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.registers.a;
    cpu.registers.a = rr(cpu, value);
    cpu.set_flag(FLAG_Z, false);
    Ok(0)
}

pub fn op_cb_rlc(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let operand = &instr.operands[0];
    let value = cpu.read_u8_operand(bus, operand);
    let result = rlc(cpu, value);
    cpu.set_flag(FLAG_Z, result == 0);
    cpu.write_u8_operand(bus, operand, result);
    Ok(0)
}

pub fn op_cb_rrc(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let operand = &instr.operands[0];
    let value = cpu.read_u8_operand(bus, operand);
    let result = rrc(cpu, value);
    cpu.set_flag(FLAG_Z, result == 0);
    cpu.write_u8_operand(bus, operand, result);
    Ok(0)
}

pub fn op_cb_rl(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let operand = &instr.operands[0];
    let value = cpu.read_u8_operand(bus, operand);
    let result = rl(cpu, value);
    cpu.set_flag(FLAG_Z, result == 0);
    cpu.write_u8_operand(bus, operand, result);
    Ok(0)
}

pub fn op_cb_rr(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let operand = &instr.operands[0];
    let value = cpu.read_u8_operand(bus, operand);
    let result = rr(cpu, value);
    cpu.set_flag(FLAG_Z, result == 0);
    cpu.write_u8_operand(bus, operand, result);
    Ok(0)
}

pub fn op_cb_sla(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let operand = &instr.operands[0];
    let value = cpu.read_u8_operand(bus, operand);
    let carry = value & 0x80 != 0;
    let result = value << 1;
    cpu.set_flag(FLAG_Z, result == 0);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, false);
    cpu.set_flag(FLAG_C, carry);
    cpu.write_u8_operand(bus, operand, result);
    Ok(0)
}

pub fn op_cb_sra(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let operand = &instr.operands[0];
    let value = cpu.read_u8_operand(bus, operand);
    let carry = value & 0x01 != 0;
    let result = (value >> 1) | (value & 0x80);
    cpu.set_flag(FLAG_Z, result == 0);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, false);
    cpu.set_flag(FLAG_C, carry);
    cpu.write_u8_operand(bus, operand, result);
    Ok(0)
}

pub fn op_cb_srl(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let operand = &instr.operands[0];
    let value = cpu.read_u8_operand(bus, operand);
    let carry = value & 0x01 != 0;
    let result = value >> 1;
    cpu.set_flag(FLAG_Z, result == 0);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, false);
    cpu.set_flag(FLAG_C, carry);
    cpu.write_u8_operand(bus, operand, result);
    Ok(0)
}

pub fn op_cb_swap(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let operand = &instr.operands[0];
    let value = cpu.read_u8_operand(bus, operand);
    let result = (value << 4) | (value >> 4);
    cpu.set_flag(FLAG_Z, result == 0);
    cpu.set_flag(FLAG_N, false);
    cpu.set_flag(FLAG_H, false);
    cpu.set_flag(FLAG_C, false);
    cpu.write_u8_operand(bus, operand, result);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::cpu::CpuConfig;
    use crate::memory::mapper::FixedRomMapper;

    fn harness() -> (Cpu, MemoryBus, Catalog) {
        (
            Cpu::new(CpuConfig { skip_boot_rom: true }),
            MemoryBus::new_post_boot(Box::new(FixedRomMapper::new(vec![0u8; 0x8000]))),
            Catalog::load_default().unwrap(),
        )
    }

    fn load(bus: &mut MemoryBus, addr: u16, program: &[u8]) {
        for (i, byte) in program.iter().enumerate() {
            bus.write(addr.wrapping_add(i as u16), *byte);
        }
    }

    #[test]
    fn rlca_clears_zero_flag_even_on_a_zero_result() {
        let (mut cpu, mut bus, catalog) = harness();
        cpu.registers.a = 0x00;
        cpu.registers.pc = 0xC000;
        load(&mut bus, 0xC000, &[0x07]); // RLCA
        cpu.step(&mut bus, &catalog).unwrap();
        assert_eq!(cpu.registers.a, 0x00);
        assert!(!cpu.get_flag(FLAG_Z));
    }

    #[test]
    fn cb_rlc_sets_zero_flag_on_a_zero_result() {
        let (mut cpu, mut bus, catalog) = harness();
        cpu.registers.a = 0x00;
        cpu.registers.pc = 0xC000;
        load(&mut bus, 0xC000, &[0xCB, 0x07]); // RLC A
        cpu.step(&mut bus, &catalog).unwrap();
        assert_eq!(cpu.registers.a, 0x00);
        assert!(cpu.get_flag(FLAG_Z));
    }

    #[test]
    fn rlc_rrc_is_identity() {
        let (mut cpu, mut bus, catalog) = harness();
        cpu.registers.a = 0x85;
        cpu.registers.pc = 0xC000;
        load(&mut bus, 0xC000, &[0xCB, 0x07, 0xCB, 0x0F]); // RLC A; RRC A
        cpu.step(&mut bus, &catalog).unwrap();
        cpu.step(&mut bus, &catalog).unwrap();
        assert_eq!(cpu.registers.a, 0x85);
    }

    #[test]
    fn swap_twice_is_identity() {
        let (mut cpu, mut bus, catalog) = harness();
        cpu.registers.a = 0x3C;
        cpu.registers.pc = 0xC000;
        load(&mut bus, 0xC000, &[0xCB, 0x37, 0xCB, 0x37]); // SWAP A; SWAP A
        cpu.step(&mut bus, &catalog).unwrap();
        cpu.step(&mut bus, &catalog).unwrap();
        assert_eq!(cpu.registers.a, 0x3C);
    }

    #[test]
    fn sra_preserves_sign_bit() {
        let (mut cpu, mut bus, catalog) = harness();
        cpu.registers.a = 0x81;
        cpu.registers.pc = 0xC000;
        load(&mut bus, 0xC000, &[0xCB, 0x2F]); // SRA A
        cpu.step(&mut bus, &catalog).unwrap();
        assert_eq!(cpu.registers.a, 0xC0);
        assert!(cpu.get_flag(FLAG_C));
    }

    #[test]
    fn cb_rotate_on_memory_operand_round_trips_through_hl() {
        let (mut cpu, mut bus, catalog) = harness();
        cpu.registers.set_hl(0xC100);
        bus.write(0xC100, 0x01);
        cpu.registers.pc = 0xC000;
        load(&mut bus, 0xC000, &[0xCB, 0x16]); // RL (HL)
        cpu.step(&mut bus, &catalog).unwrap();
        assert_eq!(bus.read(0xC100), 0x02);
    }
}
