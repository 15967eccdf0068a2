//! Bag-of-Cells: the wire container for cell graphs.
//!
//! A bag of cells flattens the graph reachable from a root into a list of
//! cell records where every reference points strictly forward, then frames
//! the list with a small header and an optional CRC-32C trailer:
//!
//! ```text
//! magic            4 bytes
//! flags            1 byte   (full form: index/crc/cache bits, ref size)
//! ref size         1 byte   (lean forms only)
//! offset size      1 byte
//! cell count       ref-size bytes, big-endian
//! root count       ref-size bytes
//! absent count     ref-size bytes
//! total size       offset-size bytes
//! root index       ref-size bytes (full form only)
//! offset table     cell count x offset size (when indexed)
//! cell records     d1, d2, padded payload, child indices
//! crc32c           4 bytes, little-endian (when checksummed)
//! ```
//!
//! Three magic prefixes are understood; [`serialize_ext`] always emits the
//! full-header form, [`deserialize`] accepts all three.

mod deserialize;
mod error;
mod order;
mod serialize;

pub use deserialize::deserialize;
pub use error::BocError;
pub use serialize::{serialize, serialize_ext, BocOptions};

/// Magic prefix of the full-header form.
pub const FULL_BOC_MAGIC: [u8; 4] = [0xB5, 0xEE, 0x9C, 0x72];

/// Magic prefix of the lean form without a checksum.
pub const LEAN_BOC_MAGIC: [u8; 4] = [0x68, 0xFF, 0x65, 0xF3];

/// Magic prefix of the lean form with a CRC-32C trailer.
pub const LEAN_BOC_MAGIC_CRC: [u8; 4] = [0xAC, 0xC3, 0xA7, 0x28];
