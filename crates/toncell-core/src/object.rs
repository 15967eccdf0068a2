//! Structural object form of a cell graph.
//!
//! The shape is `{data: {b64, len}, refs: [...], special}`: the payload as
//! base64 of its zero-padded bytes plus the exact bit length, and nested
//! objects for the references. This is the contract consumed by JSON
//! adapters; no other semantics are attached.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::bits::BitString;
use crate::cell::Cell;
use crate::error::CellError;

/// Payload field of the object form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellDataObject {
    /// Base64 of the zero-padded payload bytes (not top-upped).
    pub b64: String,
    /// Exact payload length in bits.
    pub len: usize,
}

/// One cell of the object form, with nested references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellObject {
    pub data: CellDataObject,
    pub refs: Vec<CellObject>,
    #[serde(default)]
    pub special: bool,
}

impl Cell {
    /// Render this cell graph in the structural object form.
    pub fn to_object(&self) -> CellObject {
        CellObject {
            data: CellDataObject {
                b64: STANDARD.encode(self.data().as_bytes()),
                len: self.data().len(),
            },
            refs: self.refs().iter().map(|r| r.to_object()).collect(),
            special: self.is_special(),
        }
    }

    /// Rebuild a cell graph from the structural object form.
    pub fn from_object(obj: &CellObject) -> Result<Cell, CellError> {
        let bytes = STANDARD
            .decode(&obj.data.b64)
            .map_err(|e| CellError::Format(format!("invalid base64 payload: {e}")))?;
        let mut cell = Cell::new();
        *cell.data_mut() = BitString::from_bytes_with_len(&bytes, obj.data.len)?;
        cell.set_special(obj.special);
        for child in &obj.refs {
            cell.push_ref(Arc::new(Cell::from_object(child)?))?;
        }
        Ok(cell)
    }

    /// JSON rendering of [`Cell::to_object`].
    pub fn to_json(&self) -> Result<String, CellError> {
        serde_json::to_string(&self.to_object())
            .map_err(|e| CellError::Format(format!("cell json encoding: {e}")))
    }

    /// Parse the JSON rendering back into a cell graph.
    pub fn from_json(json: &str) -> Result<Cell, CellError> {
        let obj: CellObject = serde_json::from_str(json)
            .map_err(|e| CellError::Format(format!("invalid cell json: {e}")))?;
        Cell::from_object(&obj)
    }
}
