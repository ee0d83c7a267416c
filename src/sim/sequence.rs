/// Sequences: per-tick state machines for everything that animates.
///
/// Each sequence is advanced once per step by `run` and reports
/// `Progress::Running` or `Progress::Done`. They share the world with
/// each other and with input handling; the only coordination is the
/// player's `moving` flag (gates input) and the BlockedSet (gates cells).
///
/// Motion uses `Vec2::move_towards`, so a long frame lands exactly on the
/// target instead of overshooting. Nothing times out and nothing is
/// cancelled; a restart throws the whole world away instead.

use log::{debug, info};

use crate::config::ReservationPolicy;
use crate::domain::entity::{CrateId, FrameInput};
use crate::domain::geometry::{GridPos, Vec2};
use super::event::{GameEvent, Overlay};
use super::world::WorldState;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Progress {
    Running,
    Done,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Sequence {
    /// Player glides to `world.player.target`, then clears `moving`.
    PlayerMove,
    /// Plain push: crate glides one cell.
    CrateSlide { id: CrateId, target: Vec2 },
    Delivery(Delivery),
    Blink(Blink),
    Completion(Completion),
}

// ── Delivery ──

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeliveryStage {
    Reserving,
    Sliding,
    FadingOut { elapsed: f32 },
    Removed,
}

/// A crate sliding onto a goal, fading out and leaving the level.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub crate_id: CrateId,
    pub target: Vec2,
    pub stage: DeliveryStage,
    /// Cell put in the BlockedSet by `Reserving`.
    pub reserved: Option<GridPos>,
}

// ── Blink ──

/// Start-screen prompt toggling until the game starts.
#[derive(Clone, Debug, PartialEq)]
pub struct Blink {
    remaining: f32,
    visible: bool,
}

// ── Completion ──

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CompletionStage {
    Growing,
    AwaitingKey,
}

/// Banner grows toward the centre, then any key restarts the level.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub stage: CompletionStage,
    centre: Vec2,
    final_size: Vec2,
}

impl Sequence {
    pub fn crate_slide(id: CrateId, target: Vec2) -> Self {
        Sequence::CrateSlide { id, target }
    }

    pub fn delivery(crate_id: CrateId, target: Vec2) -> Self {
        Sequence::Delivery(Delivery {
            crate_id,
            target,
            stage: DeliveryStage::Reserving,
            reserved: None,
        })
    }

    pub fn blink() -> Self {
        Sequence::Blink(Blink { remaining: 0.0, visible: true })
    }

    /// Without a banner (`animate == false`) the sequence goes straight to
    /// waiting for a key.
    pub fn completion(centre: Vec2, final_size: Vec2, animate: bool) -> Self {
        let stage = if animate { CompletionStage::Growing } else { CompletionStage::AwaitingKey };
        Sequence::Completion(Completion { stage, centre, final_size })
    }

    pub fn advance(
        &mut self,
        world: &mut WorldState,
        dt: f32,
        input: &FrameInput,
        events: &mut Vec<GameEvent>,
    ) -> Progress {
        match self {
            Sequence::PlayerMove => advance_player_move(world, dt),
            Sequence::CrateSlide { id, target } => advance_crate_slide(world, *id, *target, dt),
            Sequence::Delivery(d) => d.advance(world, dt, events),
            Sequence::Blink(b) => b.advance(world, dt, events),
            Sequence::Completion(c) => c.advance(world, dt, input, events),
        }
    }
}

/// Advance every in-flight sequence once.
///
/// Sequences started while this runs (e.g. completion, started by the last
/// delivery) get their first advance in the same call.
pub fn run(world: &mut WorldState, dt: f32, input: &FrameInput, events: &mut Vec<GameEvent>) {
    let mut kept = Vec::with_capacity(world.sequences.len());
    let mut pending = std::mem::take(&mut world.sequences);

    while !pending.is_empty() {
        for mut seq in pending.drain(..) {
            if seq.advance(world, dt, input, events) == Progress::Running {
                kept.push(seq);
            }
        }
        pending = std::mem::take(&mut world.sequences);
    }

    world.sequences = kept;
}

// ══════════════════════════════════════════════════════════════
// Motion
// ══════════════════════════════════════════════════════════════

fn advance_player_move(world: &mut WorldState, dt: f32) -> Progress {
    let p = &mut world.player;
    if p.position == p.target {
        p.moving = false;
        return Progress::Done;
    }
    p.position = p.position.move_towards(p.target, world.tuning.move_speed * dt);
    Progress::Running
}

fn advance_crate_slide(world: &mut WorldState, id: CrateId, target: Vec2, dt: f32) -> Progress {
    let speed = world.tuning.move_speed;
    let c = match world.board.crate_mut(id) {
        Some(c) => c,
        None => return Progress::Done,
    };
    if c.position == target {
        return Progress::Done;
    }
    c.position = c.position.move_towards(target, speed * dt);
    Progress::Running
}

// ══════════════════════════════════════════════════════════════
// Delivery: Reserving → Sliding → FadingOut → Removed
// ══════════════════════════════════════════════════════════════

impl Delivery {
    fn advance(&mut self, world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) -> Progress {
        let step = world.step_size();
        loop {
            match self.stage {
                DeliveryStage::Reserving => {
                    let cell = match world.reservation {
                        ReservationPolicy::Destination => GridPos::nearest(self.target, step),
                        ReservationPolicy::Legacy => match world.board.crate_by_id(self.crate_id) {
                            Some(c) => c.cell(step),
                            None => GridPos::nearest(self.target, step),
                        },
                    };
                    world.blocked.reserve(cell);
                    self.reserved = Some(cell);
                    self.stage = DeliveryStage::Sliding;
                }
                DeliveryStage::Sliding => {
                    let speed = world.tuning.move_speed;
                    let c = match world.board.crate_mut(self.crate_id) {
                        Some(c) => c,
                        None => {
                            self.stage = DeliveryStage::Removed;
                            continue;
                        }
                    };
                    if c.position != self.target {
                        c.position = c.position.move_towards(self.target, speed * dt);
                        return Progress::Running;
                    }
                    self.stage = DeliveryStage::FadingOut { elapsed: 0.0 };
                }
                DeliveryStage::FadingOut { elapsed } => {
                    let duration = world.tuning.fade_duration;
                    if elapsed < duration {
                        let elapsed = elapsed + dt;
                        if let Some(c) = world.board.crate_mut(self.crate_id) {
                            c.opacity = (1.0 - elapsed / duration).clamp(0.0, 1.0);
                        }
                        self.stage = DeliveryStage::FadingOut { elapsed };
                        return Progress::Running;
                    }
                    self.stage = DeliveryStage::Removed;
                }
                DeliveryStage::Removed => {
                    self.release(world);
                    if world.board.despawn_crate(self.crate_id).is_some() {
                        events.push(GameEvent::CrateRemoved { id: self.crate_id });
                    }
                    if world.game.score >= world.game.total_crates {
                        world.complete_level(events);
                    }
                    return Progress::Done;
                }
            }
        }
    }

    /// Give back the BlockedSet entry. Under the legacy policy the release
    /// is keyed on where the crate is now, which only matches the
    /// reservation if the crate never moved.
    fn release(&self, world: &mut WorldState) {
        let step = world.step_size();
        let cell = match world.reservation {
            ReservationPolicy::Destination => self.reserved,
            ReservationPolicy::Legacy => world
                .board
                .crate_by_id(self.crate_id)
                .map(|c| c.cell(step))
                .or(self.reserved),
        };
        if let Some(cell) = cell {
            if !world.blocked.release(cell) {
                debug!("delivery of crate {} released unreserved cell {:?}", self.crate_id, cell);
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Start-screen blink
// ══════════════════════════════════════════════════════════════

impl Blink {
    fn advance(&mut self, world: &mut WorldState, dt: f32, events: &mut Vec<GameEvent>) -> Progress {
        self.remaining -= dt;
        if self.remaining > 0.0 {
            return Progress::Running;
        }
        if world.game.game_started {
            return Progress::Done;
        }
        self.visible = !self.visible;
        events.push(GameEvent::OverlayVisibility { overlay: Overlay::Prompt, visible: self.visible });
        self.remaining = world.tuning.blink_interval;
        Progress::Running
    }
}

// ══════════════════════════════════════════════════════════════
// Completion banner
// ══════════════════════════════════════════════════════════════

impl Completion {
    fn advance(
        &mut self,
        world: &mut WorldState,
        dt: f32,
        input: &FrameInput,
        events: &mut Vec<GameEvent>,
    ) -> Progress {
        if self.stage == CompletionStage::Growing {
            let speed = world.tuning.overlay_grow_speed;
            let banner = match world.banner.as_mut() {
                Some(b) => b,
                None => {
                    self.stage = CompletionStage::AwaitingKey;
                    return Progress::Running;
                }
            };
            if banner.scale.x < self.final_size.x || banner.position != self.centre {
                banner.scale = banner.scale.move_towards(self.final_size, speed * dt);
                banner.position = banner.position.move_towards(self.centre, speed * dt);
                return Progress::Running;
            }
            info!("completion banner settled, waiting for a key");
            self.stage = CompletionStage::AwaitingKey;
        }

        if input.any_key {
            world.request_restart(events);
            return Progress::Done;
        }
        Progress::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::rules::tests::board_from;
    use crate::sim::world::LevelLayout;

    const DT: f32 = 0.05;

    fn world(rows: &[&str]) -> WorldState {
        let (board, spawn) = board_from(rows);
        let mut w = WorldState::new(LevelLayout { name: "t".into(), board, spawn }, &GameConfig::default());
        w.sequences.clear();
        w.game.game_started = true;
        w
    }

    fn drive_dt(w: &mut WorldState, ticks: usize, dt: f32, input: FrameInput) -> Vec<GameEvent> {
        let mut events = vec![];
        for _ in 0..ticks {
            run(w, dt, &input, &mut events);
        }
        events
    }

    fn drive(w: &mut WorldState, ticks: usize, input: FrameInput) -> Vec<GameEvent> {
        drive_dt(w, ticks, DT, input)
    }

    #[test]
    fn player_move_clears_flag_after_arrival() {
        let mut w = world(&["@  "]);
        w.player.target = Vec2::new(1.0, 0.0);
        w.player.moving = true;
        w.sequences.push(Sequence::PlayerMove);
        // 1 unit at 5 u/s with 0.05s ticks: about 4 ticks to arrive
        let mut ticks = 0;
        while w.player.position != w.player.target {
            drive(&mut w, 1, FrameInput::default());
            ticks += 1;
            assert!(ticks <= 6);
        }
        // Arrival is noticed on the following tick
        assert!(w.player.moving);
        drive(&mut w, 1, FrameInput::default());
        assert!(!w.player.moving);
        assert!(w.sequences.is_empty());
    }

    #[test]
    fn long_frame_clamps_to_target() {
        let mut w = world(&["@  "]);
        w.player.target = Vec2::new(1.0, 0.0);
        w.player.moving = true;
        w.sequences.push(Sequence::PlayerMove);
        let mut events = vec![];
        run(&mut w, 10.0, &FrameInput::default(), &mut events);
        assert_eq!(w.player.position, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn delivery_runs_all_stages_and_releases_reservation() {
        let mut w = world(&["@$."]);
        w.board.crate_mut(0).unwrap().delivering = true;
        w.sequences.push(Sequence::delivery(0, Vec2::new(2.0, 0.0)));

        drive(&mut w, 1, FrameInput::default());
        assert!(w.blocked.contains(GridPos::new(2, 0)));

        // slide (4 ticks + arrival check) then fade (1.0s = 20 ticks) then removal
        let events = drive(&mut w, 40, FrameInput::default());
        assert!(w.board.crates.is_empty());
        assert!(w.blocked.is_empty());
        assert!(events.contains(&GameEvent::CrateRemoved { id: 0 }));
    }

    #[test]
    fn delivery_fades_opacity_linearly() {
        let mut w = world(&["@$."]);
        w.board.crate_mut(0).unwrap().position = Vec2::new(2.0, 0.0);
        w.sequences.push(Sequence::delivery(0, Vec2::new(2.0, 0.0)));
        // Reserving + arrival check + first fade tick happen together
        drive(&mut w, 10, FrameInput::default());
        let opacity = w.board.crate_by_id(0).unwrap().opacity;
        assert!((opacity - 0.5).abs() < 1e-4, "opacity {opacity}");
    }

    #[test]
    fn legacy_policy_leaves_start_cell_blocked() {
        let mut w = world(&["@$."]);
        w.reservation = ReservationPolicy::Legacy;
        w.sequences.push(Sequence::delivery(0, Vec2::new(2.0, 0.0)));
        drive(&mut w, 60, FrameInput::default());
        assert!(w.board.crates.is_empty());
        assert!(w.blocked.contains(GridPos::new(1, 0)));
        assert_eq!(w.blocked.len(), 1);
    }

    #[test]
    fn last_delivery_completes_level_when_removed() {
        let mut w = world(&["@$."]);
        w.game.score = 1;
        w.sequences.push(Sequence::delivery(0, Vec2::new(2.0, 0.0)));
        let mut events = vec![];
        while !w.board.crates.is_empty() {
            assert!(!w.game.level_complete);
            run(&mut w, DT, &FrameInput::default(), &mut events);
        }
        assert!(w.game.level_complete);
        assert!(events.contains(&GameEvent::LevelCompleted));
        // Completion was started and already advanced in the same run
        assert!(matches!(w.sequences.as_slice(), [Sequence::Completion(_)]));
    }

    #[test]
    fn blink_toggles_on_interval_until_started() {
        let mut w = world(&["@"]);
        w.game.game_started = false;
        w.sequences.push(Sequence::blink());
        // First toggle immediately, then every 0.5s (4 ticks of 0.125s)
        let events = drive_dt(&mut w, 9, 0.125, FrameInput::default());
        let toggles: Vec<bool> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::OverlayVisibility { overlay: Overlay::Prompt, visible } => Some(*visible),
                _ => None,
            })
            .collect();
        assert_eq!(toggles, vec![false, true, false]);

        w.game.game_started = true;
        drive_dt(&mut w, 4, 0.125, FrameInput::default());
        assert!(w.sequences.is_empty());
    }

    #[test]
    fn banner_grows_to_centre_then_waits_for_key() {
        let mut w = world(&["@    ", "     ", "     ", "     ", "     "]);
        w.complete_level(&mut vec![]);
        let events = drive(&mut w, 200, FrameInput::default());
        let banner = w.banner.as_ref().unwrap();
        assert_eq!(banner.position, w.board.centre());
        assert!(banner.scale.x >= 5.0);
        assert!(!events.contains(&GameEvent::RestartRequested));

        let any = FrameInput { any_key: true, ..FrameInput::default() };
        let events = drive(&mut w, 1, any);
        assert_eq!(events, vec![GameEvent::RestartRequested]);
        assert!(w.restart_pending);
    }

    #[test]
    fn disabled_banner_skips_straight_to_key_wait() {
        let mut w = world(&["@  "]);
        w.tuning.overlay_enabled = false;
        w.complete_level(&mut vec![]);
        assert!(w.banner.is_none());
        let any = FrameInput { any_key: true, ..FrameInput::default() };
        let events = drive(&mut w, 1, any);
        assert_eq!(events, vec![GameEvent::RestartRequested]);
    }
}
