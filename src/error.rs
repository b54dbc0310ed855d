//! Crate-wide error surface.
//!
//! The core never aborts its host process. Fatal conditions — an illegal
//! opcode, a malformed catalog — are reported as a single-variant result
//! from `step()` or from construction; everything else (reads from the
//! prohibited region, writes to ROM, disabled cart RAM) is silent at this
//! layer, per the hardware it models.

use crate::catalog::CatalogError;
use crate::decoder::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type CoreResult<T> = Result<T, CoreError>;
