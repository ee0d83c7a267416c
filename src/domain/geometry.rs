/// Lattice and world coordinates.
///
/// Game logic works on `GridPos` (integer lattice cells). Animation works on
/// `Vec2` (world units, `cell * step_size`). Conversions only happen when an
/// entity is at rest, so they are exact.

use std::ops::{Add, Mul, Sub};

/// A cell on the step lattice. Y grows downward (terminal rows).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        GridPos { x, y }
    }

    /// Neighbouring cell one step in `dir`.
    pub fn step(self, dir: Direction) -> GridPos {
        let (dx, dy) = dir.offset();
        GridPos::new(self.x + dx, self.y + dy)
    }

    /// World position of this cell's centre.
    pub fn to_world(self, step_size: f32) -> Vec2 {
        Vec2::new(self.x as f32 * step_size, self.y as f32 * step_size)
    }

    /// Nearest lattice cell to a world position.
    pub fn nearest(pos: Vec2, step_size: f32) -> GridPos {
        GridPos::new(
            (pos.x / step_size).round() as i32,
            (pos.y / step_size).round() as i32,
        )
    }
}

/// Continuous 2D position / scale in world units.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ONE: Vec2 = Vec2 { x: 1.0, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Move toward `target` by at most `max_delta`.
    /// Lands exactly on `target` once within reach, never overshoots.
    pub fn move_towards(self, target: Vec2, max_delta: f32) -> Vec2 {
        let delta = target - self;
        let dist = delta.length();
        if dist <= max_delta || dist == 0.0 {
            target
        } else {
            self + delta * (max_delta / dist)
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// The four orthogonal move directions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Input priority order: the first pressed direction wins a tick.
    pub const PRIORITY: [Direction; 4] =
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}
