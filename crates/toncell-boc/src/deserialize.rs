//! Deserialization of a Bag-of-Cells container back into a cell graph.

use std::sync::Arc;

use toncell_core::{BitString, Cell, MAX_REFS};

use crate::error::BocError;
use crate::{FULL_BOC_MAGIC, LEAN_BOC_MAGIC, LEAN_BOC_MAGIC_CRC};

/// A byte cursor with typed truncation errors.
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn take(&mut self, count: usize, what: &'static str) -> Result<&'a [u8], BocError> {
        if count > self.data.len() - self.pos {
            return Err(BocError::Truncated(what));
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    fn byte(&mut self, what: &'static str) -> Result<u8, BocError> {
        Ok(self.take(1, what)?[0])
    }

    fn uint_be(&mut self, width: usize, what: &'static str) -> Result<u64, BocError> {
        let bytes = self.take(width, what)?;
        let mut value = 0u64;
        for &b in bytes {
            value = value << 8 | u64::from(b);
        }
        Ok(value)
    }
}

/// Deserialize a bag of cells, returning its root.
///
/// Accepts the full-header form and both lean forms. Declared checksums
/// are verified; multi-root and absent-cell containers, exotic cells,
/// explicitly stored hashes, and more than four references per cell are
/// rejected as unsupported.
pub fn deserialize(data: &[u8]) -> Result<Arc<Cell>, BocError> {
    let mut reader = ByteReader::new(data);
    let magic = reader.take(4, "magic prefix")?;

    let has_index;
    let has_crc32;
    let ref_size;
    let full_header;
    if magic == FULL_BOC_MAGIC {
        let flags = reader.byte("flags")?;
        has_index = flags & 0x80 != 0;
        has_crc32 = flags & 0x40 != 0;
        ref_size = (flags & 0x07) as usize;
        full_header = true;
    } else if magic == LEAN_BOC_MAGIC || magic == LEAN_BOC_MAGIC_CRC {
        // lean headers always carry the offset table and fix the root at 0
        has_index = true;
        has_crc32 = magic == LEAN_BOC_MAGIC_CRC;
        ref_size = reader.byte("reference size")? as usize;
        full_header = false;
    } else {
        return Err(BocError::UnknownMagic);
    }
    if ref_size == 0 || ref_size > 8 {
        return Err(BocError::Malformed(format!(
            "invalid reference size {ref_size}"
        )));
    }

    let offset_size = reader.byte("offset size")? as usize;
    if offset_size == 0 || offset_size > 8 {
        return Err(BocError::Malformed(format!(
            "invalid offset size {offset_size}"
        )));
    }

    let cell_count = reader.uint_be(ref_size, "cell count")? as usize;
    let root_count = reader.uint_be(ref_size, "root count")? as usize;
    let absent_count = reader.uint_be(ref_size, "absent count")?;
    let _total_size = reader.uint_be(offset_size, "total size")?;
    if root_count != 1 {
        return Err(BocError::NotSupported(format!(
            "bag of cells with {root_count} roots"
        )));
    }
    if absent_count != 0 {
        return Err(BocError::NotSupported("absent cells".into()));
    }

    let root_index = if full_header {
        reader.uint_be(ref_size, "root index")? as usize
    } else {
        0
    };
    if root_index >= cell_count {
        return Err(BocError::Malformed(format!(
            "root index {root_index} out of range for {cell_count} cells"
        )));
    }

    if has_index {
        let table = cell_count
            .checked_mul(offset_size)
            .ok_or_else(|| BocError::Malformed("offset table too large".into()))?;
        // present for random access; a linear pass has no use for it
        reader.take(table, "offset table")?;
    }

    let mut parsed = Vec::new();
    for position in 0..cell_count {
        let d1 = reader.byte("refs descriptor")?;
        let d2 = reader.byte("bits descriptor")?;
        if d1 & 0x10 != 0 {
            return Err(BocError::NotSupported("explicitly stored hashes".into()));
        }
        if d1 & 0x08 != 0 {
            return Err(BocError::NotSupported("exotic cells".into()));
        }
        let refs_count = (d1 & 0x07) as usize;
        if refs_count > MAX_REFS {
            return Err(BocError::NotSupported(format!(
                "cell with {refs_count} references"
            )));
        }
        let data_size = (d2 as usize + 1) / 2;
        let not_full = d2 % 2 == 1;
        let payload = reader.take(data_size, "cell payload")?;

        let mut cell = Cell::new();
        *cell.data_mut() = BitString::from_bytes(payload, not_full)?;

        let mut ref_indices = Vec::with_capacity(refs_count);
        for _ in 0..refs_count {
            let index = reader.uint_be(ref_size, "reference index")? as usize;
            if index <= position || index >= cell_count {
                return Err(BocError::Malformed(format!(
                    "reference from cell {position} to {index} breaks the \
                     forward-reference invariant"
                )));
            }
            ref_indices.push(index);
        }
        parsed.push((cell, ref_indices));
    }

    if has_crc32 {
        let body_len = reader.pos();
        let stored_bytes = reader.take(4, "checksum")?;
        let stored = u32::from_le_bytes([
            stored_bytes[0],
            stored_bytes[1],
            stored_bytes[2],
            stored_bytes[3],
        ]);
        let computed = crc32c::crc32c(&data[..body_len]);
        if stored != computed {
            return Err(BocError::ChecksumMismatch { stored, computed });
        }
    }

    // References point strictly forward, so resolving from the highest
    // index down always substitutes into already-built cells.
    let mut cells: Vec<Option<Arc<Cell>>> = vec![None; parsed.len()];
    while let Some((mut cell, ref_indices)) = parsed.pop() {
        for index in ref_indices {
            let child = cells[index]
                .as_ref()
                .ok_or_else(|| BocError::Malformed("unresolved reference".into()))?;
            cell.push_ref(Arc::clone(child))?;
        }
        cells[parsed.len()] = Some(Arc::new(cell));
    }

    cells[root_index]
        .take()
        .ok_or_else(|| BocError::Malformed("missing root cell".into()))
}
