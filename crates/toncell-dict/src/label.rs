//! Edge-label decoding.
//!
//! Each trie edge starts with one of three label encodings, discriminated
//! by the leading bits:
//!
//! ```text
//! 0        short: unary length (n ones, a zero), then n literal bits
//! 10       long:  length in bit_width(m) bits, then that many literal bits
//! 11       same:  one value bit, length in bit_width(m) bits
//! ```
//!
//! where `m` is the remaining key width at this edge.

use toncell_core::{BitReader, BitString};

use crate::error::DictError;

/// Bits needed for a length field covering `0..=m`.
fn bit_width(m: usize) -> usize {
    (usize::BITS - m.leading_zeros()) as usize
}

/// Decode one edge label against a remaining key width of `m` bits.
pub(crate) fn read_label(reader: &mut BitReader<'_>, m: usize) -> Result<BitString, DictError> {
    let mut label = BitString::new();
    let len;
    if !reader.read_bit()? {
        // short: unary length
        let mut n = 0;
        while reader.read_bit()? {
            n += 1;
        }
        len = n;
        for _ in 0..len {
            let bit = reader.read_bit()?;
            label.put_bit(bit)?;
        }
    } else if !reader.read_bit()? {
        // long
        len = reader.read_uint(bit_width(m))? as usize;
        for _ in 0..len {
            let bit = reader.read_bit()?;
            label.put_bit(bit)?;
        }
    } else {
        // same
        let bit = reader.read_bit()?;
        len = reader.read_uint(bit_width(m))? as usize;
        for _ in 0..len {
            label.put_bit(bit)?;
        }
    }
    if len > m {
        return Err(DictError::Format(format!(
            "label of {len} bits exceeds remaining key width {m}"
        )));
    }
    Ok(label)
}
