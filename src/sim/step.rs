/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Input gate (start / restart / one directional intent)
///   2. Move & push resolution for that intent
///   3. Sequences (player move, crate slides, deliveries, blink, banner)
///   4. Deferred restart
///
/// Rules decide (`domain::rules::resolve_move`), this module applies:
/// it spawns sequences, consumes goals and keeps the score.

use log::{debug, info};

use crate::domain::entity::FrameInput;
use crate::domain::geometry::{Direction, GridPos};
use crate::domain::rules::{self, MoveOutcome};
use super::event::GameEvent;
use super::sequence::{self, Sequence};
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

/// Advance one tick of `dt` seconds.
pub fn step(world: &mut WorldState, input: FrameInput, dt: f32) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();

    match world.phase {
        Phase::WaitingToStart => {
            if input.any_key {
                world.start_game(&mut events);
            }
        }
        Phase::Playing => {
            if input.restart {
                restart_level(world, &mut events);
            } else if !world.player.moving && !world.game.level_complete {
                if let Some(dir) = input.direction {
                    try_move(world, dir, &mut events);
                }
            }
        }
        Phase::LevelComplete => {}
    }

    if !world.restart_pending {
        sequence::run(world, dt, &input, &mut events);
    }

    if world.restart_pending {
        world.reset();
    }

    events
}

/// Throw the level away and rebuild it. The rebuild happens at the end of
/// the current step.
pub fn restart_level(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    info!("restarting level {:?}", world.level_name());
    world.request_restart(events);
}

// ══════════════════════════════════════════════════════════════
// Move & push
// ══════════════════════════════════════════════════════════════

/// Resolve one directional intent and start whatever animations it implies.
pub fn try_move(world: &mut WorldState, dir: Direction, events: &mut Vec<GameEvent>) {
    let step = world.step_size();
    let here = world.player.cell(step);

    match rules::resolve_move(&world.board, &world.blocked, here, dir) {
        MoveOutcome::Rejected { target, reason } => {
            debug!("move {:?} from {:?} rejected: {:?} at {:?}", dir, here, reason, target);
            events.push(GameEvent::MoveRejected { target, reason });
        }
        MoveOutcome::Walk { to } => {
            begin_player_move(world, here, to, events);
        }
        MoveOutcome::Push { crate_id, crate_to, to } => {
            world.sequences.push(Sequence::crate_slide(crate_id, crate_to.to_world(step)));
            events.push(GameEvent::CratePushed { id: crate_id, to: crate_to });
            begin_player_move(world, here, to, events);
        }
        MoveOutcome::Deliver { crate_id, goal_id, crate_from, goal, to } => {
            world.board.remove_goal(goal_id);
            if let Some(c) = world.board.crate_mut(crate_id) {
                c.delivering = true;
            }
            world.sequences.push(Sequence::delivery(crate_id, goal.to_world(step)));
            begin_player_move(world, here, to, events);
            world.game.score = (world.game.score + 1).min(world.game.total_crates);
            info!(
                "crate {} delivered from {:?} to goal {:?} ({}/{})",
                crate_id, crate_from, goal, world.game.score, world.game.total_crates,
            );
            events.push(GameEvent::CrateDelivered { id: crate_id, goal });
        }
    }
}

fn begin_player_move(world: &mut WorldState, from: GridPos, to: GridPos, events: &mut Vec<GameEvent>) {
    world.player.target = to.to_world(world.step_size());
    world.player.moving = true;
    world.sequences.push(Sequence::PlayerMove);
    events.push(GameEvent::PlayerMoved { from, to });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::geometry::Vec2;
    use crate::domain::occupancy::{LayerMask, Occupancy};
    use crate::domain::rules::tests::board_from;
    use crate::domain::rules::Rejection;
    use crate::sim::world::LevelLayout;

    const DT: f32 = 0.05;

    fn key(dir: Direction) -> FrameInput {
        FrameInput { any_key: true, direction: Some(dir), restart: false }
    }

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    /// World past the start screen.
    fn started(rows: &[&str]) -> WorldState {
        let (board, spawn) = board_from(rows);
        let mut w = WorldState::new(LevelLayout { name: "t".into(), board, spawn }, &GameConfig::default());
        step(&mut w, FrameInput { any_key: true, ..idle() }, DT);
        w
    }

    /// Tick until the player is at rest and nothing but idle sequences remain.
    fn settle(w: &mut WorldState) -> Vec<GameEvent> {
        let mut events = vec![];
        for _ in 0..200 {
            events.extend(step(w, idle(), DT));
            let busy = w.sequences.iter().any(|s| {
                matches!(s, Sequence::PlayerMove | Sequence::CrateSlide { .. } | Sequence::Delivery(_))
            });
            if !busy { break; }
        }
        events
    }

    fn on_lattice(p: Vec2, step_size: f32) -> bool {
        let c = GridPos::nearest(p, step_size).to_world(step_size);
        c == p
    }

    // ── Input gate ──

    #[test]
    fn first_key_starts_game_without_moving() {
        let (board, spawn) = board_from(&["@  "]);
        let mut w = WorldState::new(LevelLayout { name: "t".into(), board, spawn }, &GameConfig::default());
        let events = step(&mut w, key(Direction::Right), DT);
        assert!(events.contains(&GameEvent::GameStarted));
        assert_eq!(w.phase, Phase::Playing);
        assert!(w.game.game_started);
        assert!(!w.player.moving);
        assert_eq!(w.player.cell(1.0), GridPos::new(0, 0));
    }

    #[test]
    fn directional_input_ignored_while_moving() {
        let mut w = started(&["@   "]);
        step(&mut w, key(Direction::Right), DT);
        assert!(w.player.moving);
        let events = step(&mut w, key(Direction::Right), DT);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::PlayerMoved { .. })));
        settle(&mut w);
        assert_eq!(w.player.position, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn restart_accepted_mid_animation() {
        let mut w = started(&["@$ ."]);
        step(&mut w, key(Direction::Right), DT);
        assert!(w.player.moving);
        let events = step(&mut w, FrameInput { any_key: true, direction: None, restart: true }, DT);
        assert!(events.contains(&GameEvent::RestartRequested));
        // Fresh level: back on the start screen, everything at spawn
        assert_eq!(w.phase, Phase::WaitingToStart);
        assert_eq!(w.player.position, Vec2::new(0.0, 0.0));
        assert!(!w.player.moving);
        assert_eq!(w.board.crates[0].position, Vec2::new(1.0, 0.0));
    }

    // ── Scenario A: empty 5x5 ──

    #[test]
    fn empty_grid_single_step() {
        let rows = ["@    ", "     ", "     ", "     ", "     "];
        let mut w = started(&rows);
        assert_eq!(w.game.score, 0);
        assert_eq!(w.game.total_crates, 0);

        step(&mut w, key(Direction::Down), DT);
        settle(&mut w);
        assert_eq!(w.player.position, Vec2::new(0.0, 1.0));

        for dir in [Direction::Right, Direction::Right, Direction::Up, Direction::Left] {
            step(&mut w, key(dir), DT);
            settle(&mut w);
            assert!(on_lattice(w.player.position, 1.0));
        }
        assert_eq!(w.player.position, Vec2::new(1.0, 0.0));
        assert!(!w.game.level_complete);
    }

    #[test]
    fn move_into_wall_changes_nothing() {
        let mut w = started(&["@#"]);
        let events = step(&mut w, key(Direction::Right), DT);
        assert!(events.contains(&GameEvent::MoveRejected {
            target: GridPos::new(1, 0),
            reason: Rejection::Obstacle,
        }));
        assert!(!w.player.moving);
        assert_eq!(w.player.position, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn plain_push_moves_crate_and_player() {
        let mut w = started(&["@$  "]);
        let events = step(&mut w, key(Direction::Right), DT);
        assert!(events.contains(&GameEvent::CratePushed { id: 0, to: GridPos::new(2, 0) }));
        settle(&mut w);
        assert_eq!(w.board.crates[0].position, Vec2::new(2.0, 0.0));
        assert_eq!(w.player.position, Vec2::new(1.0, 0.0));
        assert_eq!(w.game.score, 0);
    }

    // ── Scenario B: push onto goal ──

    #[test]
    fn push_onto_goal_delivers_crate() {
        let mut w = started(&["@$. ", "    "]);
        // Second crate keeps the level from completing
        w.game.total_crates = 2;

        let events = step(&mut w, key(Direction::Right), DT);
        assert!(events.contains(&GameEvent::CrateDelivered { id: 0, goal: GridPos::new(2, 0) }));
        assert!(w.board.goals.is_empty());
        assert_eq!(w.game.score, 1);
        assert!(w.board.crates[0].delivering);

        let events = settle(&mut w);
        assert!(events.contains(&GameEvent::CrateRemoved { id: 0 }));
        assert!(w.board.crates.is_empty());
        assert_eq!(w.player.position, Vec2::new(1.0, 0.0));
        assert_eq!(w.game.score, 1);
        assert!(!w.game.level_complete);
        assert!(w.blocked.is_empty());
    }

    #[test]
    fn goal_cell_reserved_during_delivery() {
        let mut w = started(&["@$.", "   "]);
        w.game.total_crates = 2;
        step(&mut w, key(Direction::Right), DT);
        // Let the player arrive but not the fade
        for _ in 0..8 { step(&mut w, idle(), DT); }
        assert!(!w.player.moving);
        assert!(w.blocked.contains(GridPos::new(2, 0)));
        let events = step(&mut w, key(Direction::Right), DT);
        assert!(events.contains(&GameEvent::MoveRejected {
            target: GridPos::new(2, 0),
            reason: Rejection::Reserved,
        }));
    }

    // ── Scenario C: push into obstacle ──

    #[test]
    fn push_into_obstacle_changes_nothing() {
        let mut w = started(&["@$#"]);
        let events = step(&mut w, key(Direction::Right), DT);
        assert!(events.iter().any(|e| matches!(e, GameEvent::MoveRejected { reason: Rejection::CrateBlocked, .. })));
        settle(&mut w);
        assert_eq!(w.board.crates[0].position, Vec2::new(1.0, 0.0));
        assert_eq!(w.player.position, Vec2::new(0.0, 0.0));
        assert_eq!(w.game.score, 0);
    }

    // ── Scenario D: sole crate completes the level ──

    #[test]
    fn sole_delivery_completes_level_when_sequence_ends() {
        let mut w = started(&["@$."]);
        assert_eq!(w.game.total_crates, 1);
        let events = step(&mut w, key(Direction::Right), DT);
        assert_eq!(w.game.score, 1);
        assert!(!w.game.level_complete);
        assert!(!events.contains(&GameEvent::LevelCompleted));

        let mut completed_on = None;
        for t in 0..100 {
            let events = step(&mut w, idle(), DT);
            let removed = events.contains(&GameEvent::CrateRemoved { id: 0 });
            let completed = events.contains(&GameEvent::LevelCompleted);
            assert_eq!(removed, completed, "removal and completion on tick {t}");
            if completed {
                completed_on = Some(t);
                break;
            }
            assert!(!w.game.level_complete);
        }
        assert!(completed_on.is_some());
        assert!(w.game.level_complete);
        assert_eq!(w.phase, Phase::LevelComplete);
        assert!(w.banner.is_some());

        // Directional input no longer does anything
        let events = step(&mut w, key(Direction::Left), DT);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::PlayerMoved { .. })));
    }

    #[test]
    fn any_key_after_banner_restarts() {
        let mut w = started(&["@$.  "]);
        step(&mut w, key(Direction::Right), DT);
        for _ in 0..400 { step(&mut w, idle(), DT); }
        assert!(w.game.level_complete);
        let events = step(&mut w, FrameInput { any_key: true, ..idle() }, DT);
        assert!(events.contains(&GameEvent::RestartRequested));
        assert_eq!(w.phase, Phase::WaitingToStart);
        assert!(!w.game.level_complete);
        assert_eq!(w.board.goals.len(), 1);
    }

    #[test]
    fn restart_ignored_while_banner_grows() {
        let mut w = started(&["@$."]);
        step(&mut w, key(Direction::Right), DT);
        settle(&mut w);
        assert_eq!(w.phase, Phase::LevelComplete);
        assert!(!w.awaiting_restart_key());

        let restart = FrameInput { any_key: false, direction: None, restart: true };
        let events = step(&mut w, restart, DT);
        assert!(!events.contains(&GameEvent::RestartRequested));
        assert_eq!(w.phase, Phase::LevelComplete);
        assert!(w.game.level_complete);

        for _ in 0..200 {
            if w.awaiting_restart_key() { break; }
            step(&mut w, idle(), DT);
        }
        assert!(w.awaiting_restart_key());
        let events = step(&mut w, FrameInput { any_key: true, ..idle() }, DT);
        assert!(events.contains(&GameEvent::RestartRequested));
        assert_eq!(w.phase, Phase::WaitingToStart);
    }

    // ── Properties ──

    #[test]
    fn score_monotone_and_bounded_over_a_walk() {
        let mut w = started(&[
            "#######",
            "#  .  #",
            "#  $  #",
            "#.$@$.#",
            "#     #",
            "#######",
        ]);
        let total = w.game.total_crates;
        assert_eq!(total, 3);
        // Up delivers the top crate, Left the west one, Right the east one
        let path = [
            Direction::Up, Direction::Down, Direction::Left, Direction::Right, Direction::Right,
            Direction::Left,
        ];
        let mut last_score = 0;
        let mut completions = 0;
        for dir in path {
            let mut events = step(&mut w, key(dir), DT);
            events.extend(settle(&mut w));
            completions += events.iter().filter(|e| **e == GameEvent::LevelCompleted).count();
            assert!(w.game.score >= last_score);
            assert!(w.game.score <= total);
            assert!(on_lattice(w.player.position, 1.0));
            last_score = w.game.score;
        }
        assert_eq!(w.game.score, total);
        assert_eq!(completions, 1);
        assert!(w.game.level_complete);
    }

    #[test]
    fn delivery_removes_exactly_one_goal_and_crate() {
        let mut w = started(&[".$@$."]);
        step(&mut w, key(Direction::Left), DT);
        settle(&mut w);
        assert_eq!(w.board.goals.len(), 1);
        assert_eq!(w.board.crates.len(), 1);
        assert_eq!(w.game.score, 1);
        let remaining = w.board.query_at(GridPos::new(3, 0), LayerMask::CRATE);
        assert!(remaining.is_some());
    }

    #[test]
    fn larger_step_size_stays_on_lattice() {
        let (board, spawn) = board_from(&["@ $ ."]);
        let mut board = board;
        board.step_size = 2.0;
        for c in &mut board.crates {
            c.position = c.position * 2.0;
        }
        let mut cfg = GameConfig::default();
        cfg.tuning.step_size = 2.0;
        let mut w = WorldState::new(LevelLayout { name: "t".into(), board, spawn }, &cfg);
        step(&mut w, FrameInput { any_key: true, ..idle() }, DT);
        step(&mut w, key(Direction::Right), DT);
        settle(&mut w);
        assert_eq!(w.player.position, Vec2::new(2.0, 0.0));
        step(&mut w, key(Direction::Right), DT);
        settle(&mut w);
        assert_eq!(w.player.position, Vec2::new(4.0, 0.0));
        assert_eq!(w.board.crates[0].position, Vec2::new(6.0, 0.0));
    }
}
