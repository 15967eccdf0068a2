//! Errors for the cell data model.

use thiserror::Error;

/// Errors that can occur while building or decoding cells and bit buffers.
#[derive(Debug, Error)]
pub enum CellError {
    #[error("capacity exceeded: {needed} bits over the {limit}-bit limit")]
    Overflow { needed: usize, limit: usize },

    #[error("too many references: {count}, limit {limit}")]
    TooManyRefs { count: usize, limit: usize },

    #[error("cannot encode {value} in {bits} bit(s)")]
    Encoding { value: i128, bits: usize },

    #[error("malformed cell data: {0}")]
    Format(String),

    #[error("not supported: {0}")]
    NotSupported(String),
}
