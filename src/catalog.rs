//! The opcode catalog: static metadata for the primary and CB-prefixed
//! instruction tables, loaded once from an external JSON description
//! (see `assets/opcodes.json`) and read-only thereafter.

use serde::Deserialize;
use std::collections::HashMap;

/// Default catalog data, compiled into the binary so the crate has no
/// runtime file dependency unless a host opts into a different one.
pub const DEFAULT_CATALOG_JSON: &str = include_str!("../assets/opcodes.json");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog JSON is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("catalog is missing opcode slot {prefixed_label} {opcode:#04X}")]
    Missing {
        opcode: u8,
        prefixed_label: &'static str,
    },
}

/// One operand slot in a catalog entry.
///
/// `width_in_bytes` is present only for operands that consume immediate
/// bytes from the instruction stream; register/condition mnemonics carry
/// no width. `post_adjust` models the HL+/HL- addressing forms.
#[derive(Debug, Clone, Deserialize)]
pub struct OperandSpec {
    pub name: String,
    #[serde(default = "default_true", rename = "immediate")]
    pub is_immediate: bool,
    #[serde(rename = "bytes")]
    pub width_in_bytes: Option<u8>,
    #[serde(default, rename = "increment")]
    pub increment: bool,
    #[serde(default, rename = "decrement")]
    pub decrement: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAdjust {
    None,
    Inc,
    Dec,
}

impl OperandSpec {
    pub fn post_adjust(&self) -> PostAdjust {
        match (self.increment, self.decrement) {
            (true, false) => PostAdjust::Inc,
            (false, true) => PostAdjust::Dec,
            _ => PostAdjust::None,
        }
    }
}

/// Raw deserialization shape for one catalog slot. A slot is either a
/// real instruction or an explicit "illegal" marker.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawSlot {
    Illegal { illegal: bool },
    Entry {
        mnemonic: String,
        bytes: u8,
        cycles: Vec<u16>,
        operands: Vec<OperandSpec>,
        #[serde(default = "default_true")]
        immediate: bool,
    },
}

/// A resolved catalog entry: either a concrete instruction description or
/// the illegal marker for a slot that real hardware leaves undefined.
#[derive(Debug, Clone)]
pub enum CatalogSlot {
    Entry(CatalogEntry),
    Illegal,
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub mnemonic: String,
    pub length_in_bytes: u8,
    /// Applies when the instruction has only one timing, or takes the
    /// untaken branch of a conditional.
    pub base_cycles: u16,
    /// Applies when a conditional branch is taken; equal to
    /// `base_cycles` for unconditional/non-branching instructions.
    pub branch_cycles: u16,
    pub operands: Vec<OperandSpec>,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    unprefixed: HashMap<String, RawSlot>,
    cbprefixed: HashMap<String, RawSlot>,
}

/// The loaded, read-only opcode catalog: 256 primary slots plus 256
/// CB-prefixed slots.
pub struct Catalog {
    unprefixed: [CatalogSlot; 256],
    cbprefixed: [CatalogSlot; 256],
}

impl Catalog {
    /// Loads the compiled-in default catalog.
    pub fn load_default() -> Result<Catalog, CatalogError> {
        Catalog::load_str(DEFAULT_CATALOG_JSON)
    }

    /// Parses a catalog from a JSON document matching the
    /// `{"unprefixed": {...}, "cbprefixed": {...}}` shape described in
    /// the external interfaces contract.
    pub fn load_str(json: &str) -> Result<Catalog, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        let unprefixed = build_table(&raw.unprefixed, "unprefixed")?;
        let cbprefixed = build_table(&raw.cbprefixed, "cbprefixed")?;
        Ok(Catalog {
            unprefixed,
            cbprefixed,
        })
    }

    /// Looks up the catalog entry for `opcode`, selecting the
    /// CB-prefixed table when `prefixed` is true.
    pub fn get(&self, opcode: u8, prefixed: bool) -> &CatalogSlot {
        if prefixed {
            &self.cbprefixed[opcode as usize]
        } else {
            &self.unprefixed[opcode as usize]
        }
    }
}

fn build_table(
    raw: &HashMap<String, RawSlot>,
    label: &'static str,
) -> Result<[CatalogSlot; 256], CatalogError> {
    let mut slots: Vec<CatalogSlot> = Vec::with_capacity(256);
    for opcode in 0u16..256 {
        let key = format!("0x{:02X}", opcode);
        let raw_slot = raw.get(&key).ok_or(CatalogError::Missing {
            opcode: opcode as u8,
            prefixed_label: label,
        })?;
        slots.push(match raw_slot {
            RawSlot::Illegal { illegal } if *illegal => CatalogSlot::Illegal,
            RawSlot::Illegal { .. } => CatalogSlot::Illegal,
            RawSlot::Entry {
                mnemonic,
                bytes,
                cycles,
                operands,
                ..
            } => {
                let base_cycles = *cycles.last().unwrap_or(&0);
                let branch_cycles = *cycles.first().unwrap_or(&0);
                CatalogSlot::Entry(CatalogEntry {
                    mnemonic: mnemonic.clone(),
                    length_in_bytes: *bytes,
                    base_cycles,
                    branch_cycles,
                    operands: operands.clone(),
                })
            }
        });
    }
    slots
        .try_into()
        .map_err(|_| unreachable!("exactly 256 slots built above"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_loads() {
        let catalog = Catalog::load_default().expect("default catalog must parse");
        match catalog.get(0x00, false) {
            CatalogSlot::Entry(entry) => {
                assert_eq!(entry.mnemonic, "NOP");
                assert_eq!(entry.length_in_bytes, 1);
                assert_eq!(entry.base_cycles, 4);
                assert_eq!(entry.branch_cycles, 4);
            }
            CatalogSlot::Illegal => panic!("0x00 must not be illegal"),
        }
    }

    #[test]
    fn conditional_branch_has_distinct_base_and_branch_cycles() {
        let catalog = Catalog::load_default().unwrap();
        match catalog.get(0x20, false) {
            CatalogSlot::Entry(entry) => {
                assert_eq!(entry.base_cycles, 8);
                assert_eq!(entry.branch_cycles, 12);
            }
            CatalogSlot::Illegal => panic!("JR NZ,r8 must not be illegal"),
        }
    }

    #[test]
    fn illegal_opcodes_are_explicit() {
        let catalog = Catalog::load_default().unwrap();
        assert!(matches!(catalog.get(0xD3, false), CatalogSlot::Illegal));
        assert!(matches!(catalog.get(0xFD, false), CatalogSlot::Illegal));
    }

    #[test]
    fn cb_table_is_fully_populated() {
        let catalog = Catalog::load_default().unwrap();
        for opcode in 0u16..256 {
            match catalog.get(opcode as u8, true) {
                CatalogSlot::Entry(_) => {}
                CatalogSlot::Illegal => panic!("CB opcode {opcode:#04X} unexpectedly illegal"),
            }
        }
    }

    #[test]
    fn malformed_catalog_is_refused() {
        let err = Catalog::load_str("{not json").unwrap_err();
        assert!(matches!(err, CatalogError::Malformed(_)));
    }

    #[test]
    fn catalog_missing_a_slot_is_refused() {
        let err = Catalog::load_str(r#"{"unprefixed": {}, "cbprefixed": {}}"#).unwrap_err();
        assert!(matches!(err, CatalogError::Missing { .. }));
    }
}
