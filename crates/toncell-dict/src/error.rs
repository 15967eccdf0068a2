//! Hashmap decoding errors.

use thiserror::Error;
use toncell_core::CellError;

#[derive(Debug, Error)]
pub enum DictError {
    #[error("malformed hashmap: {0}")]
    Format(String),

    #[error(transparent)]
    Cell(#[from] CellError),
}
