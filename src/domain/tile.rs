/// Static terrain tiles.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Floor,
    Wall,
    /// Outside the playable area (inside the level's bounding box but never
    /// reachable). Rendered blank, blocks like a wall.
    Void,
}

impl Tile {
    /// Does this tile sit on the obstacle layer?
    pub fn is_obstacle(self) -> bool {
        matches!(self, Tile::Wall | Tile::Void)
    }

    pub fn from_char(ch: char) -> Tile {
        match ch {
            '#' => Tile::Wall,
            '_' => Tile::Void,
            _ => Tile::Floor,
        }
    }
}
