//! Core cell data model for the TON-style virtual machine state.
//!
//! Cells are fixed-capacity nodes (at most 1023 payload bits and 4 child
//! references) forming content-addressed DAGs. This crate provides the
//! bit-level payload builder, the cell entity with its recursive SHA-256
//! hash / depth / level computation, and the structural object form used
//! by JSON adapters.
//!
//! The wire codec for whole graphs lives in `toncell-boc`; hashmap
//! decoding over cell graphs lives in `toncell-dict`.

pub mod bits;
pub mod cell;
pub mod error;
pub mod object;

pub use bits::{BitReader, BitString, MAX_DATA_BITS};
pub use cell::{Cell, CellHash, MAX_REFS};
pub use error::CellError;
pub use object::{CellDataObject, CellObject};
