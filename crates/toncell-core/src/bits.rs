//! Append-only bit buffers with arbitrary-width integer packing.
//!
//! A [`BitString`] stores bits most-significant-first in a packed byte
//! vector, with an explicit bit length and an optional capacity limit.
//! Cell payloads are capped at [`MAX_DATA_BITS`]; assembly-style buffers
//! created with [`BitString::unbounded`] have no cap.
//!
//! Every fallible operation validates up front and leaves the buffer
//! unmodified on error.

use std::hash::{Hash, Hasher};

use crate::error::CellError;

/// Maximum payload length of a cell, in bits.
pub const MAX_DATA_BITS: usize = 1023;

/// An append-only sequence of bits.
///
/// Invariant: the backing vector holds exactly `ceil(len / 8)` bytes and
/// every bit past `len` is zero, so equality and hashing can work on the
/// raw bytes.
#[derive(Debug, Clone)]
pub struct BitString {
    bytes: Vec<u8>,
    len: usize,
    limit: Option<usize>,
}

impl BitString {
    /// An empty buffer capped at the cell-payload limit of 1023 bits.
    pub fn new() -> Self {
        BitString {
            bytes: Vec::new(),
            len: 0,
            limit: Some(MAX_DATA_BITS),
        }
    }

    /// An empty buffer with no capacity limit.
    pub fn unbounded() -> Self {
        BitString {
            bytes: Vec::new(),
            len: 0,
            limit: None,
        }
    }

    /// Reconstruct a buffer from raw bytes.
    ///
    /// With `top_upped` the alignment padding is stripped: trailing zero
    /// bits are removed back to, and including, the last `1` bit.
    pub fn from_bytes(data: &[u8], top_upped: bool) -> Result<Self, CellError> {
        let mut len = data.len() * 8;
        if top_upped {
            loop {
                if len == 0 {
                    return Err(CellError::Format("top-up marker not found".into()));
                }
                len -= 1;
                if data[len / 8] >> (7 - len % 8) & 1 == 1 {
                    break;
                }
            }
        }
        Self::from_parts(data.to_vec(), len, Some(MAX_DATA_BITS))
    }

    /// Reconstruct a buffer from zero-padded bytes and an exact bit length.
    pub fn from_bytes_with_len(data: &[u8], len: usize) -> Result<Self, CellError> {
        if len > data.len() * 8 {
            return Err(CellError::Format(format!(
                "declared length {len} exceeds {} available bits",
                data.len() * 8
            )));
        }
        Self::from_parts(data.to_vec(), len, Some(MAX_DATA_BITS))
    }

    fn from_parts(mut bytes: Vec<u8>, len: usize, limit: Option<usize>) -> Result<Self, CellError> {
        if let Some(limit) = limit {
            if len > limit {
                return Err(CellError::Overflow { needed: len, limit });
            }
        }
        bytes.truncate((len + 7) / 8);
        if len % 8 != 0 {
            let last = bytes.len() - 1;
            bytes[last] &= 0xFFu8 << (8 - len % 8);
        }
        Ok(BitString { bytes, len, limit })
    }

    /// Number of bits in the buffer.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bit at position `i`, or `None` past the end.
    pub fn bit(&self, i: usize) -> Option<bool> {
        if i < self.len {
            Some(self.bytes[i / 8] >> (7 - i % 8) & 1 == 1)
        } else {
            None
        }
    }

    /// Iterate over the bits in order.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.bytes[i / 8] >> (7 - i % 8) & 1 == 1)
    }

    /// The packed bytes, zero-padded to the byte boundary.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn ensure_fits(&self, extra: usize) -> Result<(), CellError> {
        if let Some(limit) = self.limit {
            if self.len + extra > limit {
                return Err(CellError::Overflow {
                    needed: self.len + extra,
                    limit,
                });
            }
        }
        Ok(())
    }

    fn push_unchecked(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            self.bytes[self.len / 8] |= 1 << (7 - self.len % 8);
        }
        self.len += 1;
    }

    /// Append a single bit.
    pub fn put_bit(&mut self, bit: bool) -> Result<(), CellError> {
        self.ensure_fits(1)?;
        self.push_unchecked(bit);
        Ok(())
    }

    /// Append `value` as an unsigned big-endian integer in exactly `bits` bits.
    pub fn put_uint(&mut self, value: u64, bits: usize) -> Result<(), CellError> {
        if bits == 0 || (bits < 64 && value >> bits != 0) {
            return Err(CellError::Encoding {
                value: value as i128,
                bits,
            });
        }
        self.ensure_fits(bits)?;
        for i in (0..bits).rev() {
            let bit = i < 64 && value >> i & 1 == 1;
            self.push_unchecked(bit);
        }
        Ok(())
    }

    /// Append a single byte.
    pub fn put_u8(&mut self, value: u8) -> Result<(), CellError> {
        self.put_uint(u64::from(value), 8)
    }

    /// Append `value` as a signed two's-complement integer in exactly `bits`
    /// bits: an explicit sign bit followed by `bits - 1` magnitude bits.
    ///
    /// One bit carries the sign alone, so only `0` and `-1` are
    /// representable at `bits == 1`.
    pub fn put_int(&mut self, value: i64, bits: usize) -> Result<(), CellError> {
        let fits = match bits {
            0 => false,
            b if b >= 64 => true,
            b => matches!(value >> (b - 1), 0 | -1),
        };
        if !fits {
            return Err(CellError::Encoding {
                value: value as i128,
                bits,
            });
        }
        self.ensure_fits(bits)?;
        for i in (0..bits).rev() {
            // sign extension covers widths past the native 64 bits
            let bit = value >> i.min(63) & 1 == 1;
            self.push_unchecked(bit);
        }
        Ok(())
    }

    /// Append every bit of `other`. Fails when the combined length exceeds
    /// this buffer's own limit.
    pub fn concat(&mut self, other: &BitString) -> Result<(), CellError> {
        self.ensure_fits(other.len)?;
        for bit in other.bits() {
            self.push_unchecked(bit);
        }
        Ok(())
    }

    /// Pad to the next byte boundary: one `1` bit, then `0`s.
    ///
    /// No-op when already aligned. A padded length of exactly 1024 bits is
    /// shortened by one bit, because the bits descriptor cannot represent a
    /// fully packed 128-byte payload.
    pub fn top_up(&mut self) {
        let padded = (self.len + 7) / 8 * 8;
        let mut add = padded - self.len;
        if padded == 1024 {
            add -= 1;
        }
        if add == 0 {
            return;
        }
        self.push_unchecked(true);
        for _ in 1..add {
            self.push_unchecked(false);
        }
    }

    /// The packed bytes after top-up padding; the buffer itself is
    /// unmodified.
    pub fn to_padded_bytes(&self) -> Vec<u8> {
        let mut copy = self.clone();
        copy.top_up();
        copy.bytes
    }
}

impl Default for BitString {
    fn default() -> Self {
        BitString::new()
    }
}

// Equality is bit length plus canonical content; the capacity limit is a
// construction policy, not part of the value.
impl PartialEq for BitString {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.bytes == other.bytes
    }
}

impl Eq for BitString {}

impl Hash for BitString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len.hash(state);
        self.bytes.hash(state);
    }
}

/// A non-destructive read cursor over a [`BitString`].
#[derive(Debug)]
pub struct BitReader<'a> {
    bits: &'a BitString,
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bits: &'a BitString) -> Self {
        BitReader { bits, pos: 0 }
    }

    /// Bits left to read.
    pub fn remaining(&self) -> usize {
        self.bits.len() - self.pos
    }

    /// Consume one bit.
    pub fn read_bit(&mut self) -> Result<bool, CellError> {
        match self.bits.bit(self.pos) {
            Some(bit) => {
                self.pos += 1;
                Ok(bit)
            }
            None => Err(CellError::Format("read past end of bit string".into())),
        }
    }

    /// Consume `bits` bits as a big-endian unsigned integer.
    pub fn read_uint(&mut self, bits: usize) -> Result<u64, CellError> {
        if bits > 64 {
            return Err(CellError::Format(format!(
                "cannot read {bits}-bit integer into 64 bits"
            )));
        }
        if bits > self.remaining() {
            return Err(CellError::Format("read past end of bit string".into()));
        }
        let mut value = 0u64;
        for _ in 0..bits {
            value <<= 1;
            if self.bits.bit(self.pos) == Some(true) {
                value |= 1;
            }
            self.pos += 1;
        }
        Ok(value)
    }

    /// The unread suffix as a new payload buffer.
    pub fn rest(&self) -> BitString {
        let mut out = BitString::new();
        for i in self.pos..self.bits.len() {
            out.push_unchecked(self.bits.bit(i) == Some(true));
        }
        out
    }
}
