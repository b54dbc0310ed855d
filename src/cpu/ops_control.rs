//! Control flow and misc single-effect instructions: NOP, HALT, STOP,
//! DI/EI, JR/JP, CALL/RET/RETI, RST, PUSH/POP.

use super::Cpu;
use crate::decoder::DecodedInstruction;
use crate::error::CoreResult;
use crate::memory::MemoryBus;

pub fn op_nop(_cpu: &mut Cpu, _bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    Ok(0)
}

pub fn op_di(cpu: &mut Cpu, _bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    cpu.ime = false;
    cpu.ime_pending = false;
    Ok(0)
}

pub fn op_ei(cpu: &mut Cpu, _bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    cpu.ime_pending = true;
    Ok(0)
}

/// HALT engages unless IME is clear and an interrupt is already pending
/// (IE & IF & 0x1F != 0), in which case the CPU keeps fetching normally.
pub fn op_halt(cpu: &mut Cpu, bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    let ie = bus.read_ie();
    let if_ = bus.read_if();
    let pending = ie & if_ & 0x1F != 0;
    if cpu.ime || !pending {
        cpu.halted = true;
    } else {
        log::debug!("HALT at PC={:#06X} with IME clear and an interrupt pending: does not engage", cpu.pc());
    }
    Ok(0)
}

const KEY1_ADDR: u16 = 0xFF4D;
const DIV_ADDR: u16 = 0xFF04;

/// Minimum viable STOP: resets DIV and, if the CGB speed-switch bit is
/// armed, toggles double-speed mode. Otherwise marks the CPU stopped;
/// resuming on a button press is outside this crate's scope.
pub fn op_stop(cpu: &mut Cpu, bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    let key1 = bus.read(KEY1_ADDR);
    if key1 & 0x01 != 0 {
        cpu.double_speed = !cpu.double_speed;
        let speed_bit = if cpu.double_speed { 0x80 } else { 0x00 };
        bus.write(KEY1_ADDR, (key1 & 0xFE) | speed_bit);
        bus.write(DIV_ADDR, 0);
    } else {
        cpu.stopped = true;
    }
    Ok(0)
}

fn condition_and_target<'a>(
    cpu: &Cpu,
    instr: &'a DecodedInstruction,
) -> (bool, &'a crate::decoder::ResolvedOperand) {
    if instr.operands.len() == 2 {
        (cpu.condition_met(&instr.operands[0].name), &instr.operands[1])
    } else {
        (true, &instr.operands[0])
    }
}

pub fn op_jr(cpu: &mut Cpu, _bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let (taken, target) = condition_and_target(cpu, instr);
    if taken {
        let offset = target.value.unwrap() as u8 as i8;
        cpu.registers.pc = cpu.registers.pc.wrapping_add(offset as i16 as u16);
        Ok(instr.branch_cycles.wrapping_sub(instr.base_cycles))
    } else {
        Ok(0)
    }
}

pub fn op_jp(cpu: &mut Cpu, _bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let (taken, target) = condition_and_target(cpu, instr);
    if taken {
        cpu.registers.pc = target.value.unwrap();
        Ok(instr.branch_cycles.wrapping_sub(instr.base_cycles))
    } else {
        Ok(0)
    }
}

pub fn op_jp_hl(cpu: &mut Cpu, _bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    cpu.registers.pc = cpu.registers.hl();
    Ok(0)
}

pub fn op_call(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let (taken, target) = condition_and_target(cpu, instr);
    if taken {
        let return_addr = cpu.registers.pc;
        let addr = target.value.unwrap();
        cpu.push_u16(bus, return_addr);
        cpu.registers.pc = addr;
        Ok(instr.branch_cycles.wrapping_sub(instr.base_cycles))
    } else {
        Ok(0)
    }
}

pub fn op_ret(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let taken = if instr.operands.is_empty() {
        true
    } else {
        cpu.condition_met(&instr.operands[0].name)
    };
    if taken {
        let addr = cpu.pop_u16(bus);
        cpu.registers.pc = addr;
        Ok(instr.branch_cycles.wrapping_sub(instr.base_cycles))
    } else {
        Ok(0)
    }
}

pub fn op_reti(cpu: &mut Cpu, bus: &mut MemoryBus, _instr: &DecodedInstruction) -> CoreResult<u16> {
    let addr = cpu.pop_u16(bus);
    cpu.registers.pc = addr;
    cpu.ime = true;
    cpu.ime_pending = false;
    Ok(0)
}

/// RST's operand name is a hex literal with an "H" suffix, e.g. "18H".
pub fn op_rst(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let name = &instr.operands[0].name;
    let hex = name.trim_end_matches('H');
    let vector = u16::from_str_radix(hex, 16).expect("RST operand is always a 2-digit hex literal");
    let return_addr = cpu.registers.pc;
    cpu.push_u16(bus, return_addr);
    cpu.registers.pc = vector;
    Ok(0)
}

pub fn op_push(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.read_u16_operand(&instr.operands[0]);
    cpu.push_u16(bus, value);
    Ok(0)
}

/// POP AF masks the popped low byte through `Registers::set_af`, which
/// already zeroes F's unwritable low nibble.
pub fn op_pop(cpu: &mut Cpu, bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    let value = cpu.pop_u16(bus);
    cpu.write_u16_operand(&instr.operands[0], value);
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
    fn call_pushes_return_address_and_jumps() {
        let (mut cpu, mut bus, catalog) = harness();
        cpu.registers.pc = 0xC000;
        cpu.registers.sp = 0xFFFE;
        load(&mut bus, 0xC000, &[0xCD, 0x34, 0x12]); // CALL 0x1234
        let cycles = cpu.step(&mut bus, &catalog).unwrap();
        assert_eq!(cpu.pc(), 0x1234);
        assert_eq!(cpu.sp(), 0xFFFC);
        assert_eq!(bus.read(0xFFFC), 0x03);
        assert_eq!(bus.read(0xFFFD), 0xC0);
        assert_eq!(cycles, 24);
    }

    #[test]
    fn untaken_conditional_call_skips_push_and_costs_base_cycles() {
        let (mut cpu, mut bus, catalog) = harness();
        cpu.registers.pc = 0xC000;
        cpu.registers.f = 0x00; // Z clear
        load(&mut bus, 0xC000, &[0xCC, 0x34, 0x12]); // CALL Z, 0x1234
        let cycles = cpu.step(&mut bus, &catalog).unwrap();
        assert_eq!(cpu.pc(), 0xC003);
        assert_eq!(cycles, 12);
    }

    #[test]
    fn jr_negative_offset_loops_back_to_itself() {
        let (mut cpu, mut bus, catalog) = harness();
        cpu.registers.pc = 0xC000;
        load(&mut bus, 0xC000, &[0x18, 0xFE]); // JR -2
        cpu.step(&mut bus, &catalog).unwrap();
        assert_eq!(cpu.pc(), 0xC000);
    }

    #[test]
    fn push_pop_round_trip_preserves_value() {
        let (mut cpu, mut bus, catalog) = harness();
        cpu.registers.set_bc(0xBEEF);
        cpu.registers.pc = 0xC000;
        load(&mut bus, 0xC000, &[0xC5, 0xD1]); // PUSH BC; POP DE
        cpu.step(&mut bus, &catalog).unwrap();
        cpu.step(&mut bus, &catalog).unwrap();
        assert_eq!(cpu.registers.de(), 0xBEEF);
    }

    #[test]
    fn pop_af_masks_low_nibble() {
        let (mut cpu, mut bus, catalog) = harness();
        cpu.registers.sp = 0xFFFC;
        bus.write(0xFFFC, 0xFF);
        bus.write(0xFFFD, 0x12);
        cpu.registers.pc = 0xC000;
        load(&mut bus, 0xC000, &[0xF1]); // POP AF
        cpu.step(&mut bus, &catalog).unwrap();
        assert_eq!(cpu.registers.a, 0x12);
        assert_eq!(cpu.registers.f, 0xF0);
    }

    #[test]
    fn rst_38_pushes_pc_and_jumps_to_fixed_vector() {
        let (mut cpu, mut bus, catalog) = harness();
        cpu.registers.pc = 0xC000;
        cpu.registers.sp = 0xFFFE;
        load(&mut bus, 0xC000, &[0xFF]); // RST 38H
        cpu.step(&mut bus, &catalog).unwrap();
        assert_eq!(cpu.pc(), 0x0038);
        assert_eq!(cpu.sp(), 0xFFFC);
    }
}
