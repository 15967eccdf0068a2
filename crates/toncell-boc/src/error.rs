//! Bag-of-Cells codec errors.

use thiserror::Error;
use toncell_core::CellError;

/// Errors that can occur while serializing or deserializing a bag of cells.
///
/// `UnknownMagic`, `Truncated`, `ChecksumMismatch`, and `Malformed` are all
/// format errors; `NotSupported` covers structural features the codec
/// detects but does not implement.
#[derive(Debug, Error)]
pub enum BocError {
    #[error("unknown magic prefix")]
    UnknownMagic,

    #[error("unexpected end of data while reading {0}")]
    Truncated(&'static str),

    #[error("checksum mismatch: stored {stored:08x}, computed {computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("malformed bag of cells: {0}")]
    Malformed(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error(transparent)]
    Cell(#[from] CellError),
}
