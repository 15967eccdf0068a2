//! Topological ordering of a cell graph for serialization.
//!
//! The wire format requires every reference to point strictly forward:
//! each cell's index must be less than the index of every cell it
//! references, with the root at index 0. Cells are deduplicated by
//! content hash, so a subtree shared by several parents is ordered (and
//! later serialized) exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use toncell_core::{Cell, CellHash};

use crate::error::BocError;

/// Cells in serialization order, with hash lookups for reference emission.
pub(crate) struct CellOrder {
    /// `(hash, cell)` pairs, root first.
    pub cells: Vec<(CellHash, Arc<Cell>)>,
    /// Content hash to position in `cells`.
    pub index: HashMap<CellHash, usize>,
    /// Node address to content hash, filled during the walk so child
    /// hashes are never recomputed.
    hashes: HashMap<*const Cell, CellHash>,
}

impl CellOrder {
    /// The content hash of a cell already visited by the walk.
    pub fn hash_of(&self, cell: &Arc<Cell>) -> Result<CellHash, BocError> {
        match self.hashes.get(&Arc::as_ptr(cell)) {
            Some(hash) => Ok(*hash),
            None => Ok(cell.hash()?),
        }
    }
}

/// Order every cell reachable from `root`, deduplicated by content hash,
/// such that the forward-reference invariant holds.
pub(crate) fn topological_order(root: &Arc<Cell>) -> Result<CellOrder, BocError> {
    let mut order = CellOrder {
        cells: Vec::new(),
        index: HashMap::new(),
        hashes: HashMap::new(),
    };
    walk(root, None, &mut order)?;
    Ok(order)
}

fn walk(
    cell: &Arc<Cell>,
    parent: Option<CellHash>,
    order: &mut CellOrder,
) -> Result<(), BocError> {
    let hash = order.hash_of(cell)?;
    order.hashes.insert(Arc::as_ptr(cell), hash);

    if let Some(&seen_at) = order.index.get(&hash) {
        // Revisit through a later parent: a parent ordered after the child
        // would reference backward, so the child's subtree moves to the end.
        if let Some(parent) = parent {
            if order.index[&parent] > seen_at {
                relocate_to_end(order, hash)?;
            }
        }
        return Ok(());
    }

    order.index.insert(hash, order.cells.len());
    order.cells.push((hash, Arc::clone(cell)));
    for child in cell.refs() {
        walk(child, Some(hash), order)?;
    }
    Ok(())
}

/// Move `target` and, transitively, the cells it references to the end of
/// the ordering, compacting the indices left behind. The worklist yields
/// the subtree in pre-order, so each cell lands after the parent that
/// dragged it along.
fn relocate_to_end(order: &mut CellOrder, target: CellHash) -> Result<(), BocError> {
    let mut worklist = vec![target];
    while let Some(hash) = worklist.pop() {
        let from = order.index[&hash];
        let (hash, cell) = order.cells.remove(from);
        for index in order.index.values_mut() {
            if *index > from {
                *index -= 1;
            }
        }
        order.index.insert(hash, order.cells.len());
        let children = Arc::clone(&cell);
        order.cells.push((hash, cell));
        for child in children.refs().iter().rev() {
            worklist.push(order.hash_of(child)?);
        }
    }
    Ok(())
}
