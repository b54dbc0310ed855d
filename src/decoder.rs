//! Pure instruction decoding: turns a byte window and a cursor into a
//! [`DecodedInstruction`] using the [`Catalog`](crate::catalog::Catalog).
//! Contains no side effects and touches no bus state — the same window
//! decoded twice always yields the same result.

use crate::catalog::{Catalog, CatalogEntry, CatalogSlot, OperandSpec, PostAdjust};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("cursor {cursor} needs {needed} more byte(s) but only {available} are available")]
    OutOfRange {
        cursor: usize,
        needed: usize,
        available: usize,
    },

    #[error("opcode {opcode:#04X}{} is illegal", if *.prefixed { " (CB-prefixed)" } else { "" })]
    IllegalOpcode { opcode: u8, prefixed: bool },
}

/// One resolved operand: the catalog's static description plus, for
/// immediate operands, the value read from the instruction stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOperand {
    pub name: String,
    pub is_immediate: bool,
    pub width_in_bytes: Option<u8>,
    pub post_adjust: PostAdjust,
    /// Present only when `width_in_bytes` is `Some`: the little-endian
    /// value read from the stream at decode time.
    pub value: Option<u16>,
}

/// An immutable, fully-resolved instruction: everything execution needs,
/// with no further bus reads required for its immediate operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub opcode: u8,
    pub prefixed: bool,
    pub mnemonic: String,
    pub length_in_bytes: u8,
    pub base_cycles: u16,
    pub branch_cycles: u16,
    pub operands: Vec<ResolvedOperand>,
}

/// Decodes one instruction starting at `cursor` in `window`.
///
/// Returns the cursor advanced past the instruction and its decoded
/// representation. `window` need only contain enough bytes for a single
/// instruction; it does not need to be the whole address space.
pub fn decode(
    window: &[u8],
    cursor: usize,
    catalog: &Catalog,
) -> Result<(usize, DecodedInstruction), DecodeError> {
    let mut pos = cursor;
    let first = read_u8(window, pos)?;
    pos += 1;

    let (opcode, prefixed) = if first == 0xCB {
        let second = read_u8(window, pos)?;
        pos += 1;
        (second, true)
    } else {
        (first, false)
    };

    let slot = catalog.get(opcode, prefixed);
    let entry: &CatalogEntry = match slot {
        CatalogSlot::Entry(entry) => entry,
        CatalogSlot::Illegal => return Err(DecodeError::IllegalOpcode { opcode, prefixed }),
    };

    let mut operands = Vec::with_capacity(entry.operands.len());
    for spec in &entry.operands {
        operands.push(resolve_operand(window, &mut pos, spec)?);
    }

    let instruction = DecodedInstruction {
        opcode,
        prefixed,
        mnemonic: entry.mnemonic.clone(),
        length_in_bytes: entry.length_in_bytes,
        base_cycles: entry.base_cycles,
        branch_cycles: entry.branch_cycles,
        operands,
    };

    Ok((pos, instruction))
}

fn resolve_operand(
    window: &[u8],
    pos: &mut usize,
    spec: &OperandSpec,
) -> Result<ResolvedOperand, DecodeError> {
    let value = match spec.width_in_bytes {
        Some(1) => {
            let v = read_u8(window, *pos)? as u16;
            *pos += 1;
            Some(v)
        }
        Some(2) => {
            let lo = read_u8(window, *pos)? as u16;
            let hi = read_u8(window, *pos + 1)? as u16;
            *pos += 2;
            Some((hi << 8) | lo)
        }
        Some(n) => unreachable!("catalog never declares a {n}-byte operand"),
        None => None,
    };

    Ok(ResolvedOperand {
        name: spec.name.clone(),
        is_immediate: spec.is_immediate,
        width_in_bytes: spec.width_in_bytes,
        post_adjust: spec.post_adjust(),
        value,
    })
}

fn read_u8(window: &[u8], pos: usize) -> Result<u8, DecodeError> {
    window.get(pos).copied().ok_or(DecodeError::OutOfRange {
        cursor: pos,
        needed: 1,
        available: window.len().saturating_sub(pos),
    })
}
