/// Cells temporarily reserved as impassable while a crate delivery plays out.
///
/// Multiset semantics: reserving the same cell twice needs two releases.
/// Releasing a cell that was never reserved is a no-op.

use super::geometry::GridPos;

#[derive(Clone, Debug, Default)]
pub struct BlockedSet {
    cells: Vec<GridPos>,
}

impl BlockedSet {
    pub fn new() -> Self {
        BlockedSet::default()
    }

    pub fn reserve(&mut self, cell: GridPos) {
        self.cells.push(cell);
    }

    /// Remove one reservation of `cell`. Returns false if none matched.
    pub fn release(&mut self, cell: GridPos) -> bool {
        match self.cells.iter().position(|c| *c == cell) {
            Some(idx) => {
                self.cells.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, cell: GridPos) -> bool {
        self.cells.contains(&cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
