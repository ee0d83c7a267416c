/// Board: static terrain plus the crates and goals living on it.
///
/// Terrain never changes after construction. Crates move and are despawned,
/// goals are removed when a crate is pushed onto them. Cells outside the
/// board read as walls.

use super::entity::{Crate, CrateId, Goal, GoalId};
use super::geometry::{GridPos, Vec2};
use super::occupancy::{EntityRef, LayerMask, Occupancy};
use super::tile::Tile;

#[derive(Clone, Debug)]
pub struct Board {
    tiles: Vec<Vec<Tile>>,
    pub width: usize,
    pub height: usize,
    pub step_size: f32,
    pub crates: Vec<Crate>,
    pub goals: Vec<Goal>,
}

impl Board {
    pub fn new(tiles: Vec<Vec<Tile>>, step_size: f32) -> Self {
        let height = tiles.len();
        let width = tiles.iter().map(|r| r.len()).max().unwrap_or(0);
        Board { tiles, width, height, step_size, crates: vec![], goals: vec![] }
    }

    /// Open floor of the given size, no walls.
    #[cfg(test)]
    pub fn empty(width: usize, height: usize, step_size: f32) -> Self {
        Board::new(vec![vec![Tile::Floor; width]; height], step_size)
    }

    pub fn add_crate(&mut self, cell: GridPos) -> CrateId {
        let id = self.crates.iter().map(|c| c.id + 1).max().unwrap_or(0);
        self.crates.push(Crate::new(id, cell.to_world(self.step_size)));
        id
    }

    pub fn add_goal(&mut self, cell: GridPos) -> GoalId {
        let id = self.goals.iter().map(|g| g.id + 1).max().unwrap_or(0);
        self.goals.push(Goal { id, cell });
        id
    }

    /// Terrain at `cell`. Out of bounds = wall.
    #[inline]
    pub fn terrain_at(&self, cell: GridPos) -> Tile {
        if cell.x < 0 || cell.y < 0 {
            return Tile::Wall;
        }
        self.tiles
            .get(cell.y as usize)
            .and_then(|row| row.get(cell.x as usize))
            .copied()
            .unwrap_or(Tile::Wall)
    }

    pub fn crate_by_id(&self, id: CrateId) -> Option<&Crate> {
        self.crates.iter().find(|c| c.id == id)
    }

    pub fn crate_mut(&mut self, id: CrateId) -> Option<&mut Crate> {
        self.crates.iter_mut().find(|c| c.id == id)
    }

    pub fn remove_goal(&mut self, id: GoalId) -> Option<Goal> {
        let idx = self.goals.iter().position(|g| g.id == id)?;
        Some(self.goals.remove(idx))
    }

    pub fn despawn_crate(&mut self, id: CrateId) -> Option<Crate> {
        let idx = self.crates.iter().position(|c| c.id == id)?;
        Some(self.crates.remove(idx))
    }

    /// World-space centre of the board; where the completion banner settles.
    pub fn centre(&self) -> Vec2 {
        let w = self.width.saturating_sub(1) as f32;
        let h = self.height.saturating_sub(1) as f32;
        Vec2::new(w * self.step_size / 2.0, h * self.step_size / 2.0)
    }
}

impl Occupancy for Board {
    fn query_at(&self, cell: GridPos, mask: LayerMask) -> Option<EntityRef> {
        if mask.contains(LayerMask::OBSTACLE) && self.terrain_at(cell).is_obstacle() {
            return Some(EntityRef::Obstacle(cell));
        }
        if mask.contains(LayerMask::CRATE) {
            if let Some(c) = self.crates.iter().find(|c| c.cell(self.step_size) == cell) {
                return Some(EntityRef::Crate(c.id));
            }
        }
        if mask.contains(LayerMask::GOAL) {
            if let Some(g) = self.goals.iter().find(|g| g.cell == cell) {
                return Some(EntityRef::Goal(g.id));
            }
        }
        None
    }

    fn crate_locked(&self, id: CrateId) -> bool {
        self.crate_by_id(id).map_or(false, |c| c.delivering)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Board {
        let mut tiles = vec![vec![Tile::Floor; 4]; 2];
        tiles[0][3] = Tile::Wall;
        let mut b = Board::new(tiles, 1.0);
        b.add_crate(GridPos::new(1, 0));
        b.add_goal(GridPos::new(2, 0));
        b
    }

    #[test]
    fn layer_filtered_queries() {
        let b = sample();
        assert_eq!(b.query_at(GridPos::new(3, 0), LayerMask::OBSTACLE), Some(EntityRef::Obstacle(GridPos::new(3, 0))));
        assert_eq!(b.query_at(GridPos::new(1, 0), LayerMask::OBSTACLE), None);
        assert_eq!(b.query_at(GridPos::new(1, 0), LayerMask::CRATE), Some(EntityRef::Crate(0)));
        assert_eq!(b.query_at(GridPos::new(2, 0), LayerMask::CRATE), None);
        assert_eq!(b.query_at(GridPos::new(2, 0), LayerMask::ANY), Some(EntityRef::Goal(0)));
        assert_eq!(b.query_at(GridPos::new(0, 1), LayerMask::ANY), None);
    }

    #[test]
    fn out_of_bounds_is_obstacle() {
        let b = sample();
        assert!(b.terrain_at(GridPos::new(-1, 0)).is_obstacle());
        assert!(b.terrain_at(GridPos::new(0, 2)).is_obstacle());
        assert!(b.query_at(GridPos::new(4, 1), LayerMask::OBSTACLE).is_some());
    }

    #[test]
    fn remove_and_despawn() {
        let mut b = sample();
        assert!(b.remove_goal(0).is_some());
        assert!(b.remove_goal(0).is_none());
        assert!(b.despawn_crate(0).is_some());
        assert!(b.crates.is_empty());
        // Ids stay unique after removals
        let a = b.add_crate(GridPos::new(0, 0));
        let c = b.add_crate(GridPos::new(0, 1));
        assert_ne!(a, c);
    }

    #[test]
    fn centre_of_five_by_five() {
        let b = Board::empty(5, 5, 1.0);
        assert_eq!(b.centre(), Vec2::new(2.0, 2.0));
    }
}
