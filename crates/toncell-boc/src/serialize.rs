//! Serialization of a cell graph into the Bag-of-Cells container.

use std::sync::Arc;

use toncell_core::Cell;

use crate::error::BocError;
use crate::order::topological_order;
use crate::FULL_BOC_MAGIC;

/// Container options for the full-header form.
#[derive(Debug, Clone, Copy)]
pub struct BocOptions {
    /// Emit the per-cell cumulative offset table after the header.
    pub has_index: bool,
    /// Append a little-endian CRC-32C over the whole container.
    pub has_crc32: bool,
    /// Flags-byte bit 5; no cache bits are ever emitted.
    pub has_cache_bits: bool,
    /// Free-form flag bits (bits 4-3 of the flags byte).
    pub flags: u8,
}

impl Default for BocOptions {
    /// No offset table, checksum on.
    fn default() -> Self {
        BocOptions {
            has_index: false,
            has_crc32: true,
            has_cache_bits: false,
            flags: 0,
        }
    }
}

/// Serialize the graph reachable from `root` with default options.
pub fn serialize(root: &Arc<Cell>) -> Result<Vec<u8>, BocError> {
    serialize_ext(root, BocOptions::default())
}

/// Serialize the graph reachable from `root`.
///
/// The root lands at index 0 and shared subtrees are emitted once; see
/// the crate docs for the byte layout.
pub fn serialize_ext(root: &Arc<Cell>, options: BocOptions) -> Result<Vec<u8>, BocError> {
    let order = topological_order(root)?;
    let cell_count = order.cells.len();
    let ref_size = byte_width(cell_count);

    let mut sizes = Vec::with_capacity(cell_count);
    let mut total_size = 0usize;
    for (_, cell) in &order.cells {
        let size = 2 + (cell.data().len() + 7) / 8 + ref_size * cell.refs().len();
        sizes.push(size);
        total_size += size;
    }
    let offset_size = byte_width(total_size);

    let flags_byte = u8::from(options.has_index) << 7
        | u8::from(options.has_crc32) << 6
        | u8::from(options.has_cache_bits) << 5
        | (options.flags & 0x3) << 3
        | ref_size as u8;

    let mut out = Vec::new();
    out.extend_from_slice(&FULL_BOC_MAGIC);
    out.push(flags_byte);
    out.push(offset_size as u8);
    put_be(&mut out, cell_count as u64, ref_size);
    put_be(&mut out, 1, ref_size); // root count
    put_be(&mut out, 0, ref_size); // absent count
    put_be(&mut out, total_size as u64, offset_size);
    put_be(&mut out, 0, ref_size); // root index

    if options.has_index {
        let mut offset = 0u64;
        for size in &sizes {
            offset += *size as u64;
            put_be(&mut out, offset, offset_size);
        }
    }

    for (_, cell) in &order.cells {
        out.push(cell.refs_descriptor()?);
        out.push(cell.bits_descriptor());
        out.extend_from_slice(&cell.data().to_padded_bytes());
        for child in cell.refs() {
            let child_index = order.index[&order.hash_of(child)?];
            put_be(&mut out, child_index as u64, ref_size);
        }
    }

    if options.has_crc32 {
        out.extend_from_slice(&crc32c::crc32c(&out).to_le_bytes());
    }
    Ok(out)
}

/// Bytes needed for an unsigned value, at least one.
fn byte_width(value: usize) -> usize {
    let bits = usize::BITS - value.leading_zeros();
    ((bits as usize + 7) / 8).max(1)
}

fn put_be(out: &mut Vec<u8>, value: u64, width: usize) {
    for i in (0..width).rev() {
        out.push((value >> (8 * i)) as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize_hex(root: Cell) -> String {
        hex::encode_upper(serialize(&Arc::new(root)).unwrap())
    }

    #[test]
    fn empty_cell_vector() {
        assert_eq!(
            serialize_hex(Cell::new()),
            "B5EE9C724101010100020000004CACB9CD"
        );
    }

    #[test]
    fn single_byte_vector() {
        let mut cell = Cell::new();
        cell.data_mut().put_u8(0).unwrap();
        assert_eq!(
            serialize_hex(cell),
            "B5EE9C7241010101000300000200D367DC41"
        );
    }

    #[test]
    fn parent_child_vector() {
        let mut child = Cell::new();
        child.data_mut().put_u8(73).unwrap();
        let mut root = Cell::new();
        root.data_mut().put_u8(0).unwrap();
        root.push_ref(Arc::new(child)).unwrap();
        assert_eq!(
            serialize_hex(root),
            "B5EE9C72410102010007000102000100024995C5FE15"
        );
    }

    #[test]
    fn offset_table_vector() {
        let mut cell = Cell::new();
        cell.data_mut().put_u8(0).unwrap();
        let bytes = serialize_ext(
            &Arc::new(cell),
            BocOptions {
                has_index: true,
                ..BocOptions::default()
            },
        )
        .unwrap();
        assert_eq!(
            hex::encode_upper(bytes),
            "B5EE9C72C1010101000300030002001970EA7F"
        );
    }

    #[test]
    fn nested_graph_vector() {
        let mut a = Cell::new();
        let mut b = Cell::new();
        let mut c = Cell::new();
        let mut d = Cell::new();
        a.data_mut().put_uint(1 << 25, 26).unwrap();
        b.data_mut().put_uint(1 << 37, 38).unwrap();
        c.data_mut().put_uint(1 << 41, 42).unwrap();
        d.data_mut().put_uint((1 << 44) - 2, 44).unwrap();
        b.push_ref(Arc::new(c)).unwrap();
        a.push_ref(Arc::new(b)).unwrap();
        a.push_ref(Arc::new(d)).unwrap();
        assert_eq!(
            serialize_hex(a),
            "B5EE9C724101040100200002078000002001030109800000000202000B800000000020000BFFFFFFFFFFE8229D06A2"
        );
    }

    #[test]
    fn shared_subtree_serialized_once() {
        let mut shared = Cell::new();
        shared.data_mut().put_u8(7).unwrap();
        let shared = Arc::new(shared);
        let mut left = Cell::new();
        left.data_mut().put_u8(1).unwrap();
        left.push_ref(Arc::clone(&shared)).unwrap();
        let mut right = Cell::new();
        right.data_mut().put_u8(2).unwrap();
        right.push_ref(Arc::clone(&shared)).unwrap();
        let mut root = Cell::new();
        root.push_ref(Arc::new(left)).unwrap();
        root.push_ref(Arc::new(right)).unwrap();

        let bytes = serialize_ext(
            &Arc::new(root),
            BocOptions {
                has_crc32: false,
                ..BocOptions::default()
            },
        )
        .unwrap();
        // four cells, not five: the shared leaf appears once
        assert_eq!(
            hex::encode_upper(bytes),
            "B5EE9C7201010401000F00020001020102010301020203000207"
        );
    }

    #[test]
    fn backward_reference_vector() {
        let mut y = Cell::new();
        y.data_mut().put_u8(0xAA).unwrap();
        let y = Arc::new(y);
        let mut x = Cell::new();
        x.data_mut().put_u8(0xBB).unwrap();
        x.push_ref(Arc::clone(&y)).unwrap();
        let mut root = Cell::new();
        root.push_ref(Arc::clone(&y)).unwrap();
        root.push_ref(Arc::new(x)).unwrap();
        assert_eq!(
            serialize_hex(root),
            "B5EE9C7241010301000B00020002010102BB020002AA3B7CB243"
        );
    }

    #[test]
    fn special_cell_rejected() {
        let mut cell = Cell::new();
        cell.set_special(true);
        assert!(matches!(
            serialize(&Arc::new(cell)),
            Err(BocError::Cell(_))
        ));
    }
}
