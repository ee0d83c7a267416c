/// Built-in level and the row-diagram builder behind it.
///
/// Levels are compiled into the binary; there is no file loading.
///
/// ## Tile legend:
///   '#' = Wall          ' ' = Floor
///   '$' = Crate         '.' = Goal
///   '@' = Player spawn  '_' = Void (outside the room)

use std::fmt;

use crate::config::GameConfig;
use crate::domain::board::Board;
use crate::domain::geometry::GridPos;
use crate::domain::tile::Tile;
use super::world::{LevelLayout, WorldState};

pub const BUILTIN_NAME: &str = "Warehouse";

pub const BUILTIN_ROWS: &[&str] = &[
    "#########",
    "#       #",
    "# $ .$  #",
    "#   #   #",
    "# . @ . #",
    "#   $   #",
    "#       #",
    "#########",
];

#[derive(Debug, PartialEq, Eq)]
pub enum LevelError {
    NoPlayer,
    MultiplePlayers { first: GridPos, second: GridPos },
    /// More crates than goals can never be finished.
    TooFewGoals { crates: usize, goals: usize },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::NoPlayer => write!(f, "level has no player spawn '@'"),
            LevelError::MultiplePlayers { first, second } => write!(
                f,
                "level has more than one player spawn: ({}, {}) and ({}, {})",
                first.x, first.y, second.x, second.y
            ),
            LevelError::TooFewGoals { crates, goals } => {
                write!(f, "level has {crates} crates but only {goals} goals")
            }
        }
    }
}

impl std::error::Error for LevelError {}

/// Build a layout from row diagrams. `step_size` scales lattice to world.
pub fn parse_layout(name: &str, rows: &[&str], step_size: f32) -> Result<LevelLayout, LevelError> {
    let mut spawn: Option<GridPos> = None;
    let mut crates = vec![];
    let mut goals = vec![];
    let mut tiles = Vec::with_capacity(rows.len());

    for (y, row) in rows.iter().enumerate() {
        let mut line = Vec::with_capacity(row.len());
        for (x, ch) in row.chars().enumerate() {
            let cell = GridPos::new(x as i32, y as i32);
            match ch {
                '@' => {
                    if let Some(first) = spawn {
                        return Err(LevelError::MultiplePlayers { first, second: cell });
                    }
                    spawn = Some(cell);
                }
                '$' => crates.push(cell),
                '.' => goals.push(cell),
                _ => {}
            }
            line.push(Tile::from_char(ch));
        }
        tiles.push(line);
    }

    let spawn = spawn.ok_or(LevelError::NoPlayer)?;
    if goals.len() < crates.len() {
        return Err(LevelError::TooFewGoals { crates: crates.len(), goals: goals.len() });
    }

    let mut board = Board::new(tiles, step_size);
    for cell in crates { board.add_crate(cell); }
    for cell in goals { board.add_goal(cell); }

    Ok(LevelLayout { name: name.to_string(), board, spawn })
}

/// Build the playable world for the built-in level.
pub fn load_level(config: &GameConfig) -> Result<WorldState, LevelError> {
    let layout = parse_layout(BUILTIN_NAME, BUILTIN_ROWS, config.tuning.step_size)?;
    Ok(WorldState::new(layout, config))
}
