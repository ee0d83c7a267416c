/// Occupancy queries: "what occupies cell X on layer L".
///
/// The controller never looks at entity storage directly when deciding a
/// move; it goes through this trait. `Board` is the in-game implementation,
/// tests can supply their own.

use std::ops::BitOr;

use super::entity::{CrateId, GoalId};
use super::geometry::GridPos;

/// Bit set of occupancy layers a query can see.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LayerMask(u8);

impl LayerMask {
    pub const OBSTACLE: LayerMask = LayerMask(0b001);
    pub const CRATE: LayerMask = LayerMask(0b010);
    pub const GOAL: LayerMask = LayerMask(0b100);
    /// Unfiltered probe: every layer.
    pub const ANY: LayerMask = LayerMask(0b111);

    pub fn contains(self, other: LayerMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;
    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

/// What a query hit.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EntityRef {
    Obstacle(GridPos),
    Crate(CrateId),
    Goal(GoalId),
}

pub trait Occupancy {
    /// First entity at `cell` visible through `mask`.
    ///
    /// When several layers match, implementations report them in the order
    /// obstacle, crate, goal.
    fn query_at(&self, cell: GridPos, mask: LayerMask) -> Option<EntityRef>;

    /// A locked crate is owned by a running sequence and cannot be pushed.
    fn crate_locked(&self, _id: CrateId) -> bool {
        false
    }
}
