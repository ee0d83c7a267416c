/// WorldState: the complete state of a running level.
///
/// ## Ownership
///
/// The step function (and the sequences it drives) is the only writer.
/// The renderer reads `board`, `player`, `banner` and `game` but never
/// mutates them.
///
/// ## Restart
///
/// The initial board and spawn cell are kept in `layout`. A restart
/// rebuilds everything from it, so nothing from the previous attempt
/// (score, reservations, in-flight sequences) survives.

use log::{debug, info};

use crate::config::{GameConfig, ReservationPolicy, TuningConfig};
use crate::domain::blocked::BlockedSet;
use crate::domain::board::Board;
use crate::domain::entity::{Banner, Player};
use crate::domain::geometry::{GridPos, Vec2};
use super::event::GameEvent;
use super::sequence::{CompletionStage, Sequence};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Start screen is up; the first key press starts the game.
    WaitingToStart,
    Playing,
    /// Terminal until the completion sequence requests a restart.
    LevelComplete,
}

/// Score and completion bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct GameState {
    pub score: u32,
    /// Crates present at level start. Never changes afterwards.
    pub total_crates: u32,
    /// Set once, never cleared within a level instance.
    pub level_complete: bool,
    /// Set once by the first input event.
    pub game_started: bool,
}

/// The level as first built: what a restart goes back to.
#[derive(Clone, Debug)]
pub struct LevelLayout {
    pub name: String,
    pub board: Board,
    pub spawn: GridPos,
}

pub struct WorldState {
    // ── Level ──
    pub board: Board,
    pub player: Player,
    pub blocked: BlockedSet,
    layout: LevelLayout,

    // ── Game tracking ──
    pub game: GameState,
    pub phase: Phase,

    // ── Animation ──
    /// In-flight sequences. Anything pushed here during a step is started
    /// within that same step.
    pub sequences: Vec<Sequence>,
    pub banner: Option<Banner>,

    // ── Config (fixed for the level's lifetime) ──
    pub tuning: TuningConfig,
    pub reservation: ReservationPolicy,

    /// Set by a restart request; honoured at the end of the step.
    pub(crate) restart_pending: bool,
}

// ── Construction ──

impl WorldState {
    pub fn new(layout: LevelLayout, config: &GameConfig) -> Self {
        WorldState::build(layout, config.tuning.clone(), config.rules.reservation)
    }

    fn build(layout: LevelLayout, tuning: TuningConfig, reservation: ReservationPolicy) -> Self {
        let board = layout.board.clone();
        let player = Player::new(layout.spawn.to_world(board.step_size));
        let total_crates = board.crates.len() as u32;

        WorldState {
            board,
            player,
            blocked: BlockedSet::new(),
            layout,
            game: GameState { total_crates, ..GameState::default() },
            phase: Phase::WaitingToStart,
            sequences: vec![Sequence::blink()],
            banner: None,
            tuning,
            reservation,
            restart_pending: false,
        }
    }

    /// Discard all level state and rebuild from the initial layout.
    pub fn reset(&mut self) {
        let layout = self.layout.clone();
        let tuning = self.tuning.clone();
        *self = WorldState::build(layout, tuning, self.reservation);
    }

    pub fn level_name(&self) -> &str {
        &self.layout.name
    }

    #[inline]
    pub fn step_size(&self) -> f32 {
        self.board.step_size
    }

    /// True once the completion banner has settled and any key restarts.
    pub fn awaiting_restart_key(&self) -> bool {
        self.sequences.iter().any(|s| {
            matches!(s, Sequence::Completion(c) if c.stage == CompletionStage::AwaitingKey)
        })
    }
}

// ── One-shot transitions ──

impl WorldState {
    /// WaitingToStart → Playing.
    pub fn start_game(&mut self, events: &mut Vec<GameEvent>) {
        if self.game.game_started { return; }
        self.game.game_started = true;
        self.phase = Phase::Playing;
        info!("game started on level {:?}", self.layout.name);
        events.push(GameEvent::GameStarted);
    }

    /// Mark the level complete and start the completion sequence.
    /// Fires at most once per level instance.
    pub fn complete_level(&mut self, events: &mut Vec<GameEvent>) {
        if self.game.level_complete { return; }
        self.game.level_complete = true;
        self.phase = Phase::LevelComplete;
        info!("level complete: {}/{} crates delivered", self.game.score, self.game.total_crates);
        events.push(GameEvent::LevelCompleted);
        if !self.blocked.is_empty() {
            debug!("level complete with {} cells still reserved", self.blocked.len());
        }

        let animate = self.tuning.overlay_enabled;
        if animate {
            self.banner = Some(Banner { position: self.player.position, scale: Vec2::ONE });
        }
        let centre = self.board.centre();
        self.sequences.push(Sequence::completion(centre, self.tuning.overlay_final_size, animate));
    }

    /// Ask for a full restart at the end of this step.
    pub fn request_restart(&mut self, events: &mut Vec<GameEvent>) {
        if self.restart_pending { return; }
        self.restart_pending = true;
        events.push(GameEvent::RestartRequested);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rules::tests::board_from;

    fn world(rows: &[&str]) -> WorldState {
        let (board, spawn) = board_from(rows);
        let layout = LevelLayout { name: "test".into(), board, spawn };
        WorldState::new(layout, &GameConfig::default())
    }

    #[test]
    fn new_world_snapshots_crate_total() {
        let w = world(&["@$.$."]);
        assert_eq!(w.game.total_crates, 2);
        assert_eq!(w.game.score, 0);
        assert_eq!(w.phase, Phase::WaitingToStart);
        assert!(!w.game.game_started);
        assert_eq!(w.player.cell(w.step_size()), GridPos::new(0, 0));
        // Start-screen blink runs from the first tick
        assert_eq!(w.sequences.len(), 1);
    }

    #[test]
    fn complete_level_is_one_shot() {
        let mut w = world(&["@  "]);
        let mut events = vec![];
        w.complete_level(&mut events);
        w.complete_level(&mut events);
        assert!(w.game.level_complete);
        assert_eq!(events, vec![GameEvent::LevelCompleted]);
        // Banner still has to grow
        assert!(!w.awaiting_restart_key());
    }

    #[test]
    fn disabled_overlay_waits_for_key_immediately() {
        let mut w = world(&["@  "]);
        w.tuning.overlay_enabled = false;
        w.complete_level(&mut vec![]);
        assert!(w.banner.is_none());
        assert!(w.awaiting_restart_key());
    }

    #[test]
    fn reset_rebuilds_from_layout() {
        let mut w = world(&["@$."]);
        let mut events = vec![];
        w.start_game(&mut events);
        w.game.score = 1;
        w.board.crates.clear();
        w.blocked.reserve(GridPos::new(1, 0));
        w.reset();
        assert_eq!(w.game.score, 0);
        assert_eq!(w.board.crates.len(), 1);
        assert!(w.blocked.is_empty());
        assert_eq!(w.phase, Phase::WaitingToStart);
        assert!(!w.restart_pending);
    }
}
