/// Entities: Player, Crate, Goal.
/// Positions are explicit fields; the step function is the only writer,
/// the renderer only reads them.

use super::geometry::{Direction, GridPos, Vec2};

pub type CrateId = usize;
pub type GoalId = usize;

/// Frame input, sampled once per tick from keyboard + gamepad.
/// All fields are edge-triggered (fresh presses this tick).
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    /// Any key or button at all was pressed this tick.
    pub any_key: bool,
    /// First matched direction in `Direction::PRIORITY` order.
    pub direction: Option<Direction>,
    pub restart: bool,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub position: Vec2,
    pub target: Vec2,
    /// True while a move animation is in flight. Gates new directional input.
    pub moving: bool,
}

impl Player {
    pub fn new(position: Vec2) -> Self {
        Player { position, target: position, moving: false }
    }

    /// Lattice cell the player stands on (exact when at rest).
    pub fn cell(&self, step_size: f32) -> GridPos {
        GridPos::nearest(self.position, step_size)
    }
}

#[derive(Clone, Debug)]
pub struct Crate {
    pub id: CrateId,
    pub position: Vec2,
    /// 1.0 = fully opaque, 0.0 = invisible. Only changes while fading out.
    pub opacity: f32,
    /// Set once a delivery sequence owns this crate.
    pub delivering: bool,
}

impl Crate {
    pub fn new(id: CrateId, position: Vec2) -> Self {
        Crate { id, position, opacity: 1.0, delivering: false }
    }

    pub fn cell(&self, step_size: f32) -> GridPos {
        GridPos::nearest(self.position, step_size)
    }
}

/// Goal marker. No state beyond existence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Goal {
    pub id: GoalId,
    pub cell: GridPos,
}

/// The level-complete banner spawned by the completion sequence.
#[derive(Clone, Debug)]
pub struct Banner {
    pub position: Vec2,
    pub scale: Vec2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_starts_at_rest_on_target() {
        let p = Player::new(Vec2::new(2.0, 3.0));
        assert!(!p.moving);
        assert_eq!(p.target, p.position);
        assert_eq!(p.cell(1.0), GridPos::new(2, 3));
    }

    #[test]
    fn crate_cell_snaps_to_nearest_while_sliding() {
        let mut c = Crate::new(0, Vec2::new(1.0, 0.0));
        assert_eq!(c.opacity, 1.0);
        c.position = Vec2::new(1.4, 0.0);
        assert_eq!(c.cell(1.0), GridPos::new(1, 0));
        c.position = Vec2::new(1.6, 0.0);
        assert_eq!(c.cell(1.0), GridPos::new(2, 0));
    }
}
