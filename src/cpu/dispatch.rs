//! Builds the two flat, function-pointer dispatch tables (primary and
//! CB-prefixed) by classifying each catalog slot's mnemonic into the
//! family handler that implements it. Each [`Cpu`] builds its own
//! [`DispatchTables`] from the same [`Catalog`] it decodes against, once,
//! and caches it; `DispatchTables::lookup` is a plain array index after
//! that — no string comparison happens per instruction.

use super::{ops_alu, ops_bit, ops_control, ops_load, ops_rotate, Cpu};
use crate::catalog::{Catalog, CatalogSlot};
use crate::decoder::DecodedInstruction;
use crate::error::{CoreError, CoreResult};
use crate::memory::MemoryBus;

pub type Exec = fn(&mut Cpu, &mut MemoryBus, &DecodedInstruction) -> CoreResult<u16>;

fn op_illegal(_cpu: &mut Cpu, _bus: &mut MemoryBus, instr: &DecodedInstruction) -> CoreResult<u16> {
    Err(CoreError::Decode(crate::decoder::DecodeError::IllegalOpcode {
        opcode: instr.opcode,
        prefixed: instr.prefixed,
    }))
}

/// `PREFIX CB` occupies unprefixed slot 0xCB in the catalog but is never
/// reached: `decode` intercepts a leading 0xCB byte and decodes the
/// following byte against the CB table instead. Kept as an explicit
/// trap rather than silently aliasing some other handler.
fn op_unreachable_prefix(
    _cpu: &mut Cpu,
    _bus: &mut MemoryBus,
    _instr: &DecodedInstruction,
) -> CoreResult<u16> {
    unreachable!("0xCB is consumed by the decoder before dispatch, never executed directly")
}

fn classify_unprefixed(mnemonic: &str) -> Exec {
    match mnemonic {
        "NOP" => ops_control::op_nop,
        "STOP" => ops_control::op_stop,
        "HALT" => ops_control::op_halt,
        "DI" => ops_control::op_di,
        "EI" => ops_control::op_ei,
        "DAA" => ops_alu::op_daa,
        "CPL" => ops_alu::op_cpl,
        "SCF" => ops_alu::op_scf,
        "CCF" => ops_alu::op_ccf,
        "RLCA" => ops_rotate::op_rlca,
        "RRCA" => ops_rotate::op_rrca,
        "RLA" => ops_rotate::op_rla,
        "RRA" => ops_rotate::op_rra,
        "RET" => ops_control::op_ret,
        "RETI" => ops_control::op_reti,
        "JP HL" => ops_control::op_jp_hl,
        "LD (a16), SP" => ops_load::op_ld_a16_sp,
        "LD HL, SP+r8" => ops_load::op_ld_hl_sp_plus_r8,
        "PREFIX CB" => op_unreachable_prefix,
        _ => classify_unprefixed_family(mnemonic),
    }
}

fn classify_unprefixed_family(mnemonic: &str) -> Exec {
    if mnemonic.starts_with("LD ") || mnemonic.starts_with("LDH") {
        return ops_load::op_ld;
    }
    if mnemonic.starts_with("INC ") {
        return ops_alu::op_inc;
    }
    if mnemonic.starts_with("DEC ") {
        return ops_alu::op_dec;
    }
    if mnemonic.starts_with("ADD HL") {
        return ops_alu::op_add_hl_rr;
    }
    if mnemonic.starts_with("ADD SP") {
        return ops_alu::op_add_sp_r8;
    }
    if mnemonic.starts_with("ADD A") {
        return ops_alu::op_add_a;
    }
    if mnemonic.starts_with("ADC A") {
        return ops_alu::op_adc_a;
    }
    if mnemonic.starts_with("SUB A") {
        return ops_alu::op_sub_a;
    }
    if mnemonic.starts_with("SBC A") {
        return ops_alu::op_sbc_a;
    }
    if mnemonic.starts_with("AND A") {
        return ops_alu::op_and_a;
    }
    if mnemonic.starts_with("XOR A") {
        return ops_alu::op_xor_a;
    }
    if mnemonic.starts_with("OR A") {
        return ops_alu::op_or_a;
    }
    if mnemonic.starts_with("CP A") {
        return ops_alu::op_cp_a;
    }
    if mnemonic.starts_with("JR") {
        return ops_control::op_jr;
    }
    if mnemonic.starts_with("JP") {
        return ops_control::op_jp;
    }
    if mnemonic.starts_with("CALL") {
        return ops_control::op_call;
    }
    if mnemonic.starts_with("RET") {
        return ops_control::op_ret;
    }
    if mnemonic.starts_with("RST") {
        return ops_control::op_rst;
    }
    if mnemonic.starts_with("PUSH") {
        return ops_control::op_push;
    }
    if mnemonic.starts_with("POP") {
        return ops_control::op_pop;
    }
    unreachable!("unclassified unprefixed mnemonic: {mnemonic}");
}

fn classify_cb(mnemonic: &str) -> Exec {
    let head = mnemonic.split_whitespace().next().unwrap_or(mnemonic);
    match head {
        "RLC" => ops_rotate::op_cb_rlc,
        "RRC" => ops_rotate::op_cb_rrc,
        "RL" => ops_rotate::op_cb_rl,
        "RR" => ops_rotate::op_cb_rr,
        "SLA" => ops_rotate::op_cb_sla,
        "SRA" => ops_rotate::op_cb_sra,
        "SWAP" => ops_rotate::op_cb_swap,
        "SRL" => ops_rotate::op_cb_srl,
        "BIT" => ops_bit::op_bit,
        "RES" => ops_bit::op_res,
        "SET" => ops_bit::op_set,
        _ => unreachable!("unclassified CB-prefixed mnemonic: {mnemonic}"),
    }
}

pub(crate) fn build_unprefixed(catalog: &Catalog) -> [Exec; 256] {
    let mut table = [op_illegal as Exec; 256];
    for opcode in 0u16..256 {
        if let CatalogSlot::Entry(entry) = catalog.get(opcode as u8, false) {
            table[opcode as usize] = classify_unprefixed(&entry.mnemonic);
        }
    }
    table
}

pub(crate) fn build_cb(catalog: &Catalog) -> [Exec; 256] {
    let mut table = [op_illegal as Exec; 256];
    for opcode in 0u16..256 {
        if let CatalogSlot::Entry(entry) = catalog.get(opcode as u8, true) {
            table[opcode as usize] = classify_cb(&entry.mnemonic);
        }
    }
    table
}

/// The two flat dispatch tables, classified from whichever [`Catalog`]
/// the owning [`Cpu`] actually decodes against — never a second,
/// independently loaded catalog. Built once per `Cpu` and cached; see
/// `Cpu::dispatch_tables`.
#[derive(Debug, Clone)]
pub struct DispatchTables {
    unprefixed: [Exec; 256],
    cb: [Exec; 256],
}

impl DispatchTables {
    pub fn build(catalog: &Catalog) -> Self {
        DispatchTables {
            unprefixed: build_unprefixed(catalog),
            cb: build_cb(catalog),
        }
    }

    /// Flat array lookup keyed by opcode byte, with zero string
    /// comparison in the hot path: classification happens once, when
    /// the table is built.
    pub fn lookup(&self, opcode: u8, prefixed: bool) -> Exec {
        if prefixed {
            self.cb[opcode as usize]
        } else {
            self.unprefixed[opcode as usize]
        }
    }
}
