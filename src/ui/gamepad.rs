/// Gamepad input tracker using gilrs.
///
/// Button mapping for restart and quit comes from `[gamepad]` in config.toml
/// via `load_button_config()`. Default mapping:
///   D-pad / Left Stick    →  Move (one step per press)
///   Select                →  Restart
///   any button            →  Start game / dismiss completion banner

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::geometry::Direction;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers, one per physical face/shoulder button.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,
    B,
    X,
    Y,
    L1,
    R1,
    L2,
    R2,
    Start,
    Select,
}

/// Config spellings accepted for each button (matched case-insensitively).
const BTN_NAMES: &[(&str, Btn)] = &[
    ("a", Btn::A), ("south", Btn::A),
    ("b", Btn::B), ("east", Btn::B),
    ("x", Btn::X), ("west", Btn::X),
    ("y", Btn::Y), ("north", Btn::Y),
    ("l1", Btn::L1), ("lb", Btn::L1),
    ("r1", Btn::R1), ("rb", Btn::R1),
    ("l2", Btn::L2), ("lt", Btn::L2),
    ("r2", Btn::R2), ("rt", Btn::R2),
    ("start", Btn::Start),
    ("select", Btn::Select), ("back", Btn::Select),
];

#[cfg(feature = "gamepad")]
const GILRS_BUTTONS: &[(Button, Btn)] = &[
    (Button::South, Btn::A),
    (Button::East, Btn::B),
    (Button::West, Btn::X),
    (Button::North, Btn::Y),
    (Button::LeftTrigger, Btn::L1),
    (Button::RightTrigger, Btn::R1),
    (Button::LeftTrigger2, Btn::L2),
    (Button::RightTrigger2, Btn::R2),
    (Button::Start, Btn::Start),
    (Button::Select, Btn::Select),
];

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        let s = s.trim();
        BTN_NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|&(_, b)| b)
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        GILRS_BUTTONS.iter().find(|(g, _)| *g == btn).map(|&(_, b)| b)
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    /// Update from a digital level, flagging the rising edge.
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn set_level(&mut self, held: bool) {
        if held && !self.held { self.just_pressed = true; }
        self.held = held;
    }
}

/// Action-to-button mapping (loaded from config).
#[derive(Debug, PartialEq)]
struct ActionMap {
    restart: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            restart: vec![Btn::Select],
            quit: vec![],
        }
    }
}

/// Direction pads, indexed in `Direction::PRIORITY` order.
#[derive(Clone, Copy, Debug, Default)]
struct Pad {
    dirs: [BtnState; 4],
}

impl Pad {
    fn slot(dir: Direction) -> usize {
        match dir {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    fn get_mut(&mut self, dir: Direction) -> &mut BtnState {
        &mut self.dirs[Pad::slot(dir)]
    }

    fn just_pressed(&self, dir: Direction) -> bool {
        self.dirs[Pad::slot(dir)].just_pressed
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    // All tracked buttons (indexed by Btn)
    buttons: [BtnState; 10],
    dpad: Pad,
    stick: Pad,
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(_) => (None, false),
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); 10],
            dpad: Pad::default(),
            stick: Pad::default(),
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. Unknown names are skipped; an empty
    /// restart list keeps the default.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let rs = parse_list(&cfg.restart);
        if !rs.is_empty() { self.action_map.restart = rs; }
        self.action_map.quit = parse_list(&cfg.quit);
    }

    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => { self.connected = true; }
                EventType::Disconnected => {
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        // Derive stick digital states
        let (sx, sy) = (self.stick_x, self.stick_y);
        self.stick.get_mut(Direction::Left).set_level(sx < -STICK_DEADZONE);
        self.stick.get_mut(Direction::Right).set_level(sx > STICK_DEADZONE);
        self.stick.get_mut(Direction::Up).set_level(sy > STICK_DEADZONE);
        self.stick.get_mut(Direction::Down).set_level(sy < -STICK_DEADZONE);
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        // D-pad handled separately (not in Btn enum)
        let dir = match gilrs_btn {
            Button::DPadUp    => Some(Direction::Up),
            Button::DPadDown  => Some(Direction::Down),
            Button::DPadLeft  => Some(Direction::Left),
            Button::DPadRight => Some(Direction::Right),
            _ => None,
        };
        if let Some(dir) = dir {
            self.dpad.get_mut(dir).set_level(held);
            return;
        }

        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.buttons[btn_index(btn)].set_level(held);
        }
    }

    // ── Action queries ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].just_pressed)
    }

    pub fn restart_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.restart)
    }

    pub fn quit_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.quit)
    }

    /// First direction newly pressed on the D-pad or stick this frame.
    pub fn direction(&self) -> Option<Direction> {
        Direction::PRIORITY
            .into_iter()
            .find(|&d| self.dpad.just_pressed(d) || self.stick.just_pressed(d))
    }

    /// Any button, pad direction or stick flick went down this frame.
    pub fn any_pressed(&self) -> bool {
        self.buttons.iter().any(|b| b.just_pressed) || self.direction().is_some()
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in self.buttons.iter_mut()
            .chain(self.dpad.dirs.iter_mut())
            .chain(self.stick.dirs.iter_mut())
        {
            b.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); 10];
        self.dpad = Pad::default();
        self.stick = Pad::default();
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_names_parse_case_insensitively() {
        assert_eq!(Btn::from_name("select"), Some(Btn::Select));
        assert_eq!(Btn::from_name("Back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("rb"), Some(Btn::R1));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn config_overrides_restart_and_quit() {
        let mut gp = GamepadState::new();
        gp.load_button_config(&GamepadConfig {
            restart: vec!["Start".into(), "bogus".into()],
            quit: vec!["B".into()],
        });
        assert_eq!(gp.action_map, ActionMap { restart: vec![Btn::Start], quit: vec![Btn::B] });

        gp.load_button_config(&GamepadConfig { restart: vec![], quit: vec![] });
        assert_eq!(gp.action_map.restart, vec![Btn::Start]);
        assert!(gp.action_map.quit.is_empty());
    }

    #[test]
    fn edges_fire_once_per_press() {
        let mut gp = GamepadState::new();
        gp.dpad.get_mut(Direction::Left).set_level(true);
        gp.buttons[btn_index(Btn::Select)].set_level(true);
        assert_eq!(gp.direction(), Some(Direction::Left));
        assert!(gp.restart_pressed());
        assert!(gp.any_pressed());

        gp.clear_just_pressed();
        gp.dpad.get_mut(Direction::Left).set_level(true);
        assert_eq!(gp.direction(), None);
        assert!(!gp.any_pressed());
    }
}
