//! Cells: content-addressed nodes of the persistent-state DAG.
//!
//! A cell carries up to 1023 payload bits and up to four references to
//! child cells. Shared subtrees are referenced through `Arc`, so a cell
//! graph is a DAG, not necessarily a tree. Identity for deduplication is
//! the recursive SHA-256 content hash, never pointer identity.
//!
//! Cells are append-then-freeze: once a cell is referenced by a parent or
//! hashed, mutating its payload or reference list is undefined behavior as
//! far as deduplication is concerned.

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::bits::BitString;
use crate::error::CellError;

/// Maximum number of child references per cell.
pub const MAX_REFS: usize = 4;

/// A 32-byte SHA-256 content hash identifying a cell.
pub type CellHash = [u8; 32];

/// One node of a cell graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    data: BitString,
    refs: Vec<Arc<Cell>>,
    special: bool,
}

/// Depth, level, and digest of one node, computed in a single pass.
#[derive(Clone)]
struct NodeInfo {
    depth: u16,
    level: u8,
    digest: CellHash,
}

impl Cell {
    pub fn new() -> Self {
        Cell::default()
    }

    /// The payload bits.
    pub fn data(&self) -> &BitString {
        &self.data
    }

    /// Mutable payload access, for cells still under construction.
    pub fn data_mut(&mut self) -> &mut BitString {
        &mut self.data
    }

    /// The child references, in order.
    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Append a child reference.
    pub fn push_ref(&mut self, child: Arc<Cell>) -> Result<(), CellError> {
        if self.refs.len() >= MAX_REFS {
            return Err(CellError::TooManyRefs {
                count: self.refs.len() + 1,
                limit: MAX_REFS,
            });
        }
        self.refs.push(child);
        Ok(())
    }

    /// The exotic-cell marker. Exotic cell bodies are not implemented;
    /// hashing or serializing a special cell is rejected.
    pub fn is_special(&self) -> bool {
        self.special
    }

    pub fn set_special(&mut self, special: bool) {
        self.special = special;
    }

    /// Append another cell's payload and references to this one.
    pub fn concat(&mut self, other: &Cell) -> Result<(), CellError> {
        if self.refs.len() + other.refs.len() > MAX_REFS {
            return Err(CellError::TooManyRefs {
                count: self.refs.len() + other.refs.len(),
                limit: MAX_REFS,
            });
        }
        self.data.concat(&other.data)?;
        self.refs.extend_from_slice(&other.refs);
        Ok(())
    }

    /// The maximum level among children, 0 at a leaf.
    pub fn level(&self) -> Result<u8, CellError> {
        if self.special {
            return Err(CellError::NotSupported(
                "level of an exotic cell".into(),
            ));
        }
        let mut max_level = 0;
        for child in &self.refs {
            max_level = max_level.max(child.level()?);
        }
        Ok(max_level)
    }

    /// Length of the longest reference chain below this cell.
    pub fn depth(&self) -> u16 {
        self.refs
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// First descriptor byte: reference count, special flag, level.
    pub fn refs_descriptor(&self) -> Result<u8, CellError> {
        Ok(self.refs.len() as u8 + 8 * u8::from(self.special) + 32 * self.level()?)
    }

    /// Second descriptor byte: full-byte count plus rounded-up byte count,
    /// so the low bit flags a partial trailing byte.
    pub fn bits_descriptor(&self) -> u8 {
        (self.data.len() / 8 + (self.data.len() + 7) / 8) as u8
    }

    /// The recursive SHA-256 content hash.
    ///
    /// Computed together with depth and level in one depth-first pass,
    /// memoized by node address so shared subtrees are hashed once.
    pub fn hash(&self) -> Result<CellHash, CellError> {
        let mut memo = HashMap::new();
        Ok(self.node_info(&mut memo)?.digest)
    }

    fn node_info(
        &self,
        memo: &mut HashMap<*const Cell, NodeInfo>,
    ) -> Result<NodeInfo, CellError> {
        let key = self as *const Cell;
        if let Some(info) = memo.get(&key) {
            return Ok(info.clone());
        }
        if self.special {
            return Err(CellError::NotSupported(
                "hashing an exotic cell".into(),
            ));
        }
        let mut children = Vec::with_capacity(self.refs.len());
        for child in &self.refs {
            children.push(child.node_info(memo)?);
        }
        let level = children.iter().map(|c| c.level).max().unwrap_or(0);
        let depth = children.iter().map(|c| c.depth + 1).max().unwrap_or(0);

        let mut preimage = Vec::new();
        preimage.push(self.refs.len() as u8 + 32 * level);
        preimage.push(self.bits_descriptor());
        preimage.extend_from_slice(&self.data.to_padded_bytes());
        for child in &children {
            preimage.extend_from_slice(&child.depth.to_be_bytes());
        }
        for child in &children {
            preimage.extend_from_slice(&child.digest);
        }

        let info = NodeInfo {
            depth,
            level,
            digest: Sha256::digest(&preimage).into(),
        };
        memo.insert(key, info.clone());
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(byte: u8) -> Arc<Cell> {
        let mut cell = Cell::new();
        cell.data_mut().put_u8(byte).unwrap();
        Arc::new(cell)
    }

    #[test]
    fn empty_cell_hash_matches_reference() {
        let cell = Cell::new();
        assert_eq!(
            hex::encode(cell.hash().unwrap()),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
    }

    #[test]
    fn parent_hash_covers_children() {
        let mut parent = Cell::new();
        parent.data_mut().put_u8(0).unwrap();
        parent.push_ref(leaf(73)).unwrap();
        assert_eq!(
            hex::encode(parent.hash().unwrap()),
            "d17bb3dceeedf9ed4f5141dea678adfefbd1ebbdb071c32ceaa69df930b4cba3"
        );
    }

    #[test]
    fn hash_is_deterministic_and_structural() {
        let mut a = Cell::new();
        a.data_mut().put_u8(5).unwrap();
        a.push_ref(leaf(1)).unwrap();
        let mut b = Cell::new();
        b.data_mut().put_u8(5).unwrap();
        b.push_ref(leaf(1)).unwrap();
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn hash_differs_under_structural_difference() {
        let cells = [leaf(0), leaf(1), leaf(2)];
        let mut digests: Vec<_> = cells.iter().map(|c| c.hash().unwrap()).collect();

        let mut parent = Cell::new();
        parent.push_ref(Arc::clone(&cells[0])).unwrap();
        digests.push(parent.hash().unwrap());

        let mut other = Cell::new();
        other.push_ref(Arc::clone(&cells[1])).unwrap();
        digests.push(other.hash().unwrap());

        for i in 0..digests.len() {
            for j in i + 1..digests.len() {
                assert_ne!(digests[i], digests[j]);
            }
        }
    }

    #[test]
    fn shared_subtree_hashes_once() {
        // diamond: both parents share the same child allocation
        let shared = leaf(7);
        let mut left = Cell::new();
        left.data_mut().put_u8(1).unwrap();
        left.push_ref(Arc::clone(&shared)).unwrap();
        let mut right = Cell::new();
        right.data_mut().put_u8(2).unwrap();
        right.push_ref(Arc::clone(&shared)).unwrap();
        let mut root = Cell::new();
        root.push_ref(Arc::new(left)).unwrap();
        root.push_ref(Arc::new(right)).unwrap();
        assert_eq!(root.depth(), 2);
        root.hash().unwrap();
    }

    #[test]
    fn depth_and_level() {
        let mut chain = Cell::new();
        chain.push_ref(leaf(0)).unwrap();
        let mut root = Cell::new();
        root.push_ref(Arc::new(chain)).unwrap();
        assert_eq!(root.depth(), 2);
        assert_eq!(root.level().unwrap(), 0);
        assert_eq!(leaf(0).depth(), 0);
    }

    #[test]
    fn descriptors() {
        let mut cell = Cell::new();
        cell.data_mut().put_u8(0).unwrap();
        cell.push_ref(leaf(73)).unwrap();
        assert_eq!(cell.refs_descriptor().unwrap(), 1);
        assert_eq!(cell.bits_descriptor(), 2);

        let mut unaligned = Cell::new();
        unaligned.data_mut().put_uint(0, 12).unwrap();
        assert_eq!(unaligned.bits_descriptor(), 1 + 2);
    }

    #[test]
    fn ref_cap_enforced() {
        let mut cell = Cell::new();
        for i in 0..4 {
            cell.push_ref(leaf(i)).unwrap();
        }
        assert!(matches!(
            cell.push_ref(leaf(9)),
            Err(CellError::TooManyRefs { .. })
        ));
    }

    #[test]
    fn special_cells_reject_hash_and_level() {
        let mut cell = Cell::new();
        cell.set_special(true);
        assert!(matches!(cell.hash(), Err(CellError::NotSupported(_))));
        assert!(matches!(cell.level(), Err(CellError::NotSupported(_))));
    }

    #[test]
    fn concat_merges_payload_and_refs() {
        let mut a = Cell::new();
        a.data_mut().put_uint(0b101, 3).unwrap();
        a.push_ref(leaf(1)).unwrap();
        let mut b = Cell::new();
        b.data_mut().put_uint(0b01, 2).unwrap();
        b.push_ref(leaf(2)).unwrap();
        a.concat(&b).unwrap();
        assert_eq!(a.data().len(), 5);
        assert_eq!(a.refs().len(), 2);

        let mut crowded = Cell::new();
        for i in 0..3 {
            crowded.push_ref(leaf(i)).unwrap();
        }
        assert!(matches!(
            crowded.concat(&a),
            Err(CellError::TooManyRefs { .. })
        ));
    }

    #[test]
    fn structural_inequality() {
        let mut a = Cell::new();
        a.data_mut().put_u8(1).unwrap();
        let mut b = Cell::new();
        b.data_mut().put_u8(2).unwrap();
        assert_ne!(a, b);

        let mut with_child = Cell::new();
        with_child.push_ref(leaf(1)).unwrap();
        assert_ne!(with_child, Cell::new());
    }
}
