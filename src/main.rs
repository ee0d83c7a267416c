/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::time::{Duration, Instant};

use log::{info, warn, LevelFilter};

use config::GameConfig;
use domain::entity::FrameInput;
use sim::event::Overlay;
use sim::feedback::{dispatch, FeedbackSink, SoundCue};
use sim::level::load_level;
use sim::step;
use sim::world::WorldState;
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::{play_cue, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Longest frame the simulation will integrate in one go. Keeps motion
/// sane after the process was suspended.
const MAX_DT: f32 = 0.1;

fn main() {
    let config = GameConfig::load();
    init_logging(&config);
    for w in &config.warnings {
        warn!("config: {w}");
    }

    let mut world = match load_level(&config) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Level error: {e}");
            return;
        }
    };
    info!("level {:?} loaded, {} crates", world.level_name(), world.game.total_crates);

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    if sound.is_none() {
        info!("audio unavailable, running silent");
    }

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Pushbox!");
    println!("Crates delivered: {}/{}", world.game.score, world.game.total_crates);
}

/// Log to a file: the terminal is in raw mode on the alternate screen.
/// `RUST_LOG` overrides the default `info` level.
fn init_logging(config: &GameConfig) {
    let file = match File::create(&config.log_file) {
        Ok(f) => f,
        Err(_) => return,
    };
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init();
}

/// Feedback sink wired to the real speaker and screen.
struct Feedback<'a> {
    sound: Option<&'a SoundEngine>,
    renderer: &'a mut Renderer,
}

impl FeedbackSink for Feedback<'_> {
    fn play_sound(&mut self, cue: SoundCue) {
        play_cue(self.sound, cue);
    }

    fn set_overlay_visible(&mut self, overlay: Overlay, visible: bool) {
        self.renderer.set_overlay_visible(overlay, visible);
    }

    fn restart_level(&mut self) {
        info!("restarting level");
        self.renderer.reset_overlays();
    }
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.keyboard_enhanced;
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    if gp.connected {
        info!("gamepad connected");
    }

    let tick_rate = Duration::from_millis(world.tuning.tick_rate_ms);
    let mut last_tick = Instant::now();
    let mut pending = FrameInput::default();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() || kb.quit_pressed() || gp.quit_pressed() {
            break;
        }

        // Presses between ticks are latched until the next tick consumes them
        let frame = read_frame_input(&kb, &gp);
        pending.any_key |= frame.any_key;
        pending.restart |= frame.restart;
        if pending.direction.is_none() {
            pending.direction = frame.direction;
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            let dt = elapsed.as_secs_f32().min(MAX_DT);
            last_tick = Instant::now();

            let events = step::step(world, std::mem::take(&mut pending), dt);
            let mut feedback = Feedback { sound, renderer: &mut *renderer };
            dispatch(&events, &mut feedback);
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Merge keyboard and gamepad into one frame's input.
fn read_frame_input(kb: &InputState, gp: &GamepadState) -> FrameInput {
    FrameInput {
        any_key: kb.any_key() || gp.any_pressed(),
        direction: kb.direction().or_else(|| gp.direction()),
        restart: kb.restart_pressed() || gp.restart_pressed(),
    }
}
