//! Decoding of hashmaps stored as Patricia tries over cell graphs.
//!
//! A hashmap with `n`-bit keys is a binary trie: every cell is an edge
//! carrying a compressed label, followed by either a leaf value (when the
//! label exhausts the key) or a fork into `refs[0]` (key bit `0`) and
//! `refs[1]` (key bit `1`). [`parse_hashmap`] walks the trie and returns
//! the entries in traversal order.

mod error;
mod label;

use std::sync::Arc;

use toncell_core::{BitReader, BitString, Cell};

use crate::label::read_label;

pub use error::DictError;

/// Default cap on the number of entries recorded by a walk.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Decode every entry of a hashmap with `key_bits`-bit keys, capped at
/// [`DEFAULT_MAX_ENTRIES`].
pub fn parse_hashmap(
    root: &Arc<Cell>,
    key_bits: usize,
) -> Result<Vec<(BitString, Arc<Cell>)>, DictError> {
    parse_hashmap_ext(root, key_bits, DEFAULT_MAX_ENTRIES)
}

/// Decode the entries of a hashmap with `key_bits`-bit keys.
///
/// Entries come back in traversal order: within a fork, every key under
/// edge `0` precedes every key under edge `1`. Each value is a cell
/// holding the payload bits that follow the leaf's label, together with
/// the leaf's references. Once `max_entries` entries have been recorded
/// the walk still visits the rest of the trie, so malformed trailing
/// nodes are reported, but records nothing more.
pub fn parse_hashmap_ext(
    root: &Arc<Cell>,
    key_bits: usize,
    max_entries: usize,
) -> Result<Vec<(BitString, Arc<Cell>)>, DictError> {
    let mut entries = Vec::new();
    walk(root, key_bits, BitString::new(), max_entries, &mut entries)?;
    Ok(entries)
}

fn walk(
    cell: &Arc<Cell>,
    m: usize,
    prefix: BitString,
    max_entries: usize,
    entries: &mut Vec<(BitString, Arc<Cell>)>,
) -> Result<(), DictError> {
    let mut reader = BitReader::new(cell.data());
    let label = read_label(&mut reader, m)?;
    let mut key = prefix;
    key.concat(&label)?;
    let remaining = m - label.len();

    if remaining == 0 {
        if entries.len() < max_entries {
            let mut value = Cell::new();
            *value.data_mut() = reader.rest();
            for child in cell.refs() {
                value.push_ref(Arc::clone(child))?;
            }
            value.set_special(cell.is_special());
            entries.push((key, Arc::new(value)));
        }
        return Ok(());
    }

    if cell.refs().len() < 2 {
        return Err(DictError::Format(format!(
            "fork with {} children at key width {remaining}",
            cell.refs().len()
        )));
    }
    let mut left_key = key.clone();
    left_key.put_bit(false)?;
    walk(&cell.refs()[0], remaining - 1, left_key, max_entries, entries)?;
    let mut right_key = key;
    right_key.put_bit(true)?;
    walk(&cell.refs()[1], remaining - 1, right_key, max_entries, entries)
}
