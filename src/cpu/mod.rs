//! The Sharp SM83 CPU: register file, flags, stack, interrupt dispatch,
//! and the fetch/decode/execute loop.

pub mod constants;
pub mod dispatch;
pub mod ops_alu;
pub mod ops_bit;
pub mod ops_control;
pub mod ops_load;
pub mod ops_rotate;
pub mod registers;

use crate::catalog::Catalog;
use crate::decoder::{self, DecodedInstruction, PostAdjust, ResolvedOperand};
use crate::error::CoreResult;
use crate::interrupts;
use crate::memory::MemoryBus;
use constants::*;
use registers::Registers;

/// Construction-time CPU configuration: whether to run from the boot
/// ROM entry point with zeroed registers, or skip straight to the
/// canonical post-boot state.
#[derive(Debug, Clone, Copy)]
pub struct CpuConfig {
    pub skip_boot_rom: bool,
}

impl Default for CpuConfig {
    fn default() -> Self {
        CpuConfig {
            skip_boot_rom: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cpu {
    pub(crate) registers: Registers,
    pub(crate) ime: bool,
    pub(crate) ime_pending: bool,
    pub(crate) halted: bool,
    /// Set by STOP; cleared only by the CGB speed-switch path this
    /// crate stubs out (see `ops_control::op_stop`).
    pub(crate) stopped: bool,
    pub(crate) double_speed: bool,
    total_cycles: u64,
    /// Built from the first catalog passed to `step`, and cached —
    /// dispatch classification always tracks the same catalog instance
    /// the decoder runs against, never a second independently loaded one.
    dispatch: Option<dispatch::DispatchTables>,
}

impl Cpu {
    pub fn new(config: CpuConfig) -> Self {
        let registers = if config.skip_boot_rom {
            Registers::post_boot()
        } else {
            Registers::boot_rom_entry()
        };
        Cpu {
            registers,
            ime: false,
            ime_pending: false,
            halted: false,
            stopped: false,
            double_speed: false,
            total_cycles: 0,
            dispatch: None,
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn pc(&self) -> u16 {
        self.registers.pc
    }

    pub fn sp(&self) -> u16 {
        self.registers.sp
    }

    pub fn ime(&self) -> bool {
        self.ime
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    pub fn double_speed(&self) -> bool {
        self.double_speed
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Performs exactly one of: interrupt servicing, one instruction, or
    /// an idle halt tick. Never blocks; returns the T-cycles consumed.
    pub fn step(&mut self, bus: &mut MemoryBus, catalog: &Catalog) -> CoreResult<u16> {
        let ie = bus.read_ie();
        let if_ = bus.read_if();

        if self.ime {
            if let Some(source) = interrupts::highest_priority_pending(ie, if_) {
                self.service_interrupt(bus, source);
                self.total_cycles = self.total_cycles.wrapping_add(20);
                return Ok(20);
            }
        }

        if self.halted {
            if interrupts::highest_priority_pending(ie, if_).is_some() {
                self.halted = false;
            }
            self.total_cycles = self.total_cycles.wrapping_add(4);
            return Ok(4);
        }

        let was_ime_pending = self.ime_pending;

        let pc = self.registers.pc;
        let mut window = [0u8; 3];
        for (i, slot) in window.iter_mut().enumerate() {
            *slot = bus.read(pc.wrapping_add(i as u16));
        }

        let cycles = match decoder::decode(&window, 0, catalog) {
            Ok((_, instruction)) => self.execute(bus, catalog, &instruction)?,
            Err(err) => {
                log::error!("illegal opcode at PC={:#06X}: {}", pc, err);
                return Err(err.into());
            }
        };

        if was_ime_pending && self.ime_pending {
            self.ime = true;
            self.ime_pending = false;
        }

        self.total_cycles = self.total_cycles.wrapping_add(cycles as u64);
        Ok(cycles)
    }

    fn execute(
        &mut self,
        bus: &mut MemoryBus,
        catalog: &Catalog,
        instruction: &DecodedInstruction,
    ) -> CoreResult<u16> {
        self.registers.pc = self.registers.pc.wrapping_add(instruction.length_in_bytes as u16);
        let handler = self
            .dispatch_tables(catalog)
            .lookup(instruction.opcode, instruction.prefixed);
        let extra_cycles = handler(self, bus, instruction)?;
        Ok(instruction.base_cycles.wrapping_add(extra_cycles))
    }

    /// Returns the dispatch tables built from `catalog`, building and
    /// caching them on first use. Subsequent calls reuse the cached
    /// tables regardless of `catalog` — a `Cpu` decodes and dispatches
    /// against one catalog for its whole lifetime.
    fn dispatch_tables(&mut self, catalog: &Catalog) -> &dispatch::DispatchTables {
        if self.dispatch.is_none() {
            self.dispatch = Some(dispatch::DispatchTables::build(catalog));
        }
        self.dispatch.as_ref().unwrap()
    }

    fn service_interrupt(&mut self, bus: &mut MemoryBus, source: interrupts::Source) {
        self.ime = false;
        self.ime_pending = false;
        let if_ = bus.read_if();
        bus.write_if(if_ & !(1 << source.bit()));
        self.push_u16(bus, self.registers.pc);
        self.registers.pc = source.vector();
        self.halted = false;
    }

    // --- Stack ---

    pub(crate) fn push_u16(&mut self, bus: &mut MemoryBus, value: u16) {
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        bus.write(self.registers.sp, (value >> 8) as u8);
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        bus.write(self.registers.sp, value as u8);
    }

    pub(crate) fn pop_u16(&mut self, bus: &mut MemoryBus) -> u16 {
        let lo = bus.read(self.registers.sp) as u16;
        self.registers.sp = self.registers.sp.wrapping_add(1);
        let hi = bus.read(self.registers.sp) as u16;
        self.registers.sp = self.registers.sp.wrapping_add(1);
        (hi << 8) | lo
    }

    // --- Flags ---

    pub(crate) fn set_flag(&mut self, mask: u8, set: bool) {
        if set {
            self.registers.f |= mask;
        } else {
            self.registers.f &= !mask;
        }
        self.registers.f &= FLAG_WRITABLE_MASK;
    }

    pub(crate) fn get_flag(&self, mask: u8) -> bool {
        self.registers.f & mask != 0
    }

    // --- Generic operand access, shared by ops_load / ops_alu ---

    /// Reads an 8-bit operand: a plain register, or (for non-immediate
    /// operands) a byte through the bus at the operand's address.
    /// Applies HL+/HL- post-adjust after the access.
    pub(crate) fn read_u8_operand(&mut self, bus: &MemoryBus, operand: &ResolvedOperand) -> u8 {
        if operand.is_immediate {
            match operand.width_in_bytes {
                Some(_) => operand.value.unwrap() as u8,
                None => self.read_reg8(&operand.name),
            }
        } else {
            let addr = self.operand_address(operand);
            let value = bus.read(addr);
            self.apply_post_adjust(operand);
            value
        }
    }

    pub(crate) fn write_u8_operand(
        &mut self,
        bus: &mut MemoryBus,
        operand: &ResolvedOperand,
        value: u8,
    ) {
        if operand.is_immediate {
            self.write_reg8(&operand.name, value);
        } else {
            let addr = self.operand_address(operand);
            bus.write(addr, value);
            self.apply_post_adjust(operand);
        }
    }

    /// Reads a 16-bit register-pair operand (BC/DE/HL/SP/AF) or a
    /// resolved d16 immediate. Never used for memory-indirect operands.
    pub(crate) fn read_u16_operand(&self, operand: &ResolvedOperand) -> u16 {
        match operand.width_in_bytes {
            Some(_) => operand.value.unwrap(),
            None => self.read_reg16(&operand.name),
        }
    }

    pub(crate) fn write_u16_operand(&mut self, operand: &ResolvedOperand, value: u16) {
        self.write_reg16(&operand.name, value);
    }

    fn operand_address(&self, operand: &ResolvedOperand) -> u16 {
        match operand.name.as_str() {
            "BC" => self.registers.bc(),
            "DE" => self.registers.de(),
            "HL" => self.registers.hl(),
            "C" => 0xFF00 + self.registers.c as u16,
            "a8" => 0xFF00 + operand.value.unwrap(),
            "a16" => operand.value.unwrap(),
            other => unreachable!("{other} is never a memory-indirect operand"),
        }
    }

    fn apply_post_adjust(&mut self, operand: &ResolvedOperand) {
        match operand.post_adjust {
            PostAdjust::Inc => self.registers.set_hl(self.registers.hl().wrapping_add(1)),
            PostAdjust::Dec => self.registers.set_hl(self.registers.hl().wrapping_sub(1)),
            PostAdjust::None => {}
        }
    }

    pub(crate) fn read_reg8(&self, name: &str) -> u8 {
        match name {
            "A" => self.registers.a,
            "B" => self.registers.b,
            "C" => self.registers.c,
            "D" => self.registers.d,
            "E" => self.registers.e,
            "H" => self.registers.h,
            "L" => self.registers.l,
            other => unreachable!("{other} is not an 8-bit register"),
        }
    }

    pub(crate) fn write_reg8(&mut self, name: &str, value: u8) {
        match name {
            "A" => self.registers.a = value,
            "B" => self.registers.b = value,
            "C" => self.registers.c = value,
            "D" => self.registers.d = value,
            "E" => self.registers.e = value,
            "H" => self.registers.h = value,
            "L" => self.registers.l = value,
            other => unreachable!("{other} is not an 8-bit register"),
        }
    }

    pub(crate) fn read_reg16(&self, name: &str) -> u16 {
        match name {
            "BC" => self.registers.bc(),
            "DE" => self.registers.de(),
            "HL" => self.registers.hl(),
            "SP" => self.registers.sp,
            "AF" => self.registers.af(),
            other => unreachable!("{other} is not a 16-bit register"),
        }
    }

    pub(crate) fn write_reg16(&mut self, name: &str, value: u16) {
        match name {
            "BC" => self.registers.set_bc(value),
            "DE" => self.registers.set_de(value),
            "HL" => self.registers.set_hl(value),
            "SP" => self.registers.sp = value,
            "AF" => self.registers.set_af(value),
            other => unreachable!("{other} is not a 16-bit register"),
        }
    }

    /// Evaluates a branch condition mnemonic (`NZ`, `Z`, `NC`, `C`).
    pub(crate) fn condition_met(&self, condition: &str) -> bool {
        match condition {
            "NZ" => !self.get_flag(FLAG_Z),
            "Z" => self.get_flag(FLAG_Z),
            "NC" => !self.get_flag(FLAG_C),
            "C" => self.get_flag(FLAG_C),
            other => unreachable!("{other} is not a branch condition"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mapper::FixedRomMapper;

    fn test_bus() -> MemoryBus {
        MemoryBus::new_post_boot(Box::new(FixedRomMapper::new(vec![0u8; 0x8000])))
    }

    fn catalog() -> Catalog {
        Catalog::load_default().unwrap()
    }

    #[test]
    fn post_boot_nop_advances_pc_and_costs_four_cycles() {
        let mut cpu = Cpu::new(CpuConfig { skip_boot_rom: true });
        let mut bus = test_bus();
        bus.write(0x0100, 0x00); // NOP
        let before = cpu.registers.clone();
        let cycles = cpu.step(&mut bus, &catalog()).unwrap();
        assert_eq!(cycles, 4);
        assert_eq!(cpu.pc(), 0x0101);
        assert_eq!(cpu.registers.a, before.a);
        assert_eq!(cpu.registers.f, before.f);
    }

    #[test]
    fn ei_then_di_leaves_ime_false_and_halt_does_not_dispatch() {
        let mut cpu = Cpu::new(CpuConfig { skip_boot_rom: true });
        let mut bus = test_bus();
        bus.write_ie(0x01);
        bus.write_if(0x01);
        bus.write(0x0100, 0xFB); // EI
        bus.write(0x0101, 0xF3); // DI
        bus.write(0x0102, 0x76); // HALT
        cpu.step(&mut bus, &catalog()).unwrap();
        assert!(!cpu.ime());
        cpu.step(&mut bus, &catalog()).unwrap();
        assert!(!cpu.ime());
        cpu.step(&mut bus, &catalog()).unwrap();
        // ime is false and V-Blank is pending, so HALT does not engage
        // (§4.4.2) and no interrupt vector is taken.
        assert!(!cpu.halted());
        assert_eq!(cpu.pc(), 0x0103);
    }

    #[test]
    fn ei_delay_promotes_ime_after_the_following_instruction() {
        let mut cpu = Cpu::new(CpuConfig { skip_boot_rom: true });
        let mut bus = test_bus();
        bus.write(0x0100, 0xFB); // EI
        bus.write(0x0101, 0x00); // NOP
        cpu.step(&mut bus, &catalog()).unwrap();
        assert!(!cpu.ime());
        cpu.step(&mut bus, &catalog()).unwrap();
        assert!(cpu.ime());
    }

    #[test]
    fn echo_ram_write_observed_by_next_instruction() {
        let mut cpu = Cpu::new(CpuConfig { skip_boot_rom: true });
        let mut bus = test_bus();
        bus.write(0xC123, 0xAB);
        assert_eq!(bus.read(0xE123), 0xAB);
        let _ = cpu.step(&mut bus, &catalog());
    }
}
