/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// All values are fixed once the level is built; nothing is re-read at runtime.

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::geometry::Vec2;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tuning: TuningConfig,
    pub rules: RulesConfig,
    pub gamepad: GamepadConfig,
    pub log_file: PathBuf,
    /// Problems found while loading. Logged by `main` once the logger is up.
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct TuningConfig {
    pub tick_rate_ms: u64,
    pub step_size: f32,          // world units per move
    pub move_speed: f32,         // world units per second, player and crates
    pub fade_duration: f32,      // seconds for a delivered crate to vanish
    pub overlay_grow_speed: f32, // units per second, banner scale and position
    pub overlay_final_size: Vec2,
    pub overlay_enabled: bool,
    pub blink_interval: f32,     // seconds between start prompt toggles
}

#[derive(Clone, Debug)]
pub struct RulesConfig {
    pub reservation: ReservationPolicy,
}

/// Which cell a crate delivery reserves in the BlockedSet.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationPolicy {
    /// Reserve the goal cell and release that same cell.
    #[default]
    Destination,
    /// Reserve the crate's start cell, release wherever the crate ends up.
    /// The start cell stays blocked for the rest of the level.
    Legacy,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub restart: Vec<String>,
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    tuning: TomlTuning,
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTuning {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_step_size")]
    step_size: f32,
    #[serde(default = "default_move_speed")]
    move_speed: f32,
    #[serde(default = "default_fade_duration")]
    fade_duration: f32,
    #[serde(default = "default_grow_speed")]
    overlay_grow_speed: f32,
    #[serde(default = "default_final_size")]
    overlay_final_size: [f32; 2],
    #[serde(default = "default_true")]
    overlay_enabled: bool,
    #[serde(default = "default_blink_interval")]
    blink_interval: f32,
}

#[derive(Deserialize, Debug, Default)]
struct TomlRules {
    #[serde(default)]
    reservation: ReservationPolicy,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_log_file")]
    log_file: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_step_size() -> f32 { 1.0 }
fn default_move_speed() -> f32 { 5.0 }
fn default_fade_duration() -> f32 { 1.0 }
fn default_grow_speed() -> f32 { 2.0 }
fn default_final_size() -> [f32; 2] { [5.0, 5.0] }
fn default_true() -> bool { true }
fn default_blink_interval() -> f32 { 0.5 }

fn default_restart() -> Vec<String> { vec!["Select".into()] }
fn default_quit() -> Vec<String> { vec![] }
fn default_log_file() -> String { "pushbox.log".into() }

impl Default for TomlTuning {
    fn default() -> Self {
        TomlTuning {
            tick_rate_ms: default_tick_rate(),
            step_size: default_step_size(),
            move_speed: default_move_speed(),
            fade_duration: default_fade_duration(),
            overlay_grow_speed: default_grow_speed(),
            overlay_final_size: default_final_size(),
            overlay_enabled: default_true(),
            blink_interval: default_blink_interval(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            restart: default_restart(),
            quit: default_quit(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            log_file: default_log_file(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default())
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        let mut cfg = GameConfig::from_toml(toml_cfg);
        cfg.warnings.extend(warnings);
        cfg
    }

    /// Parse a config document. Missing keys take their defaults.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<TomlConfig>(text).map(GameConfig::from_toml)
    }

    fn from_toml(toml_cfg: TomlConfig) -> Self {
        let t = toml_cfg.tuning;
        let mut warnings = vec![];

        // Non-positive rates would stall every sequence forever.
        let positive = |name: &str, v: f32, dflt: f32, warnings: &mut Vec<String>| {
            if v > 0.0 && v.is_finite() {
                v
            } else {
                warnings.push(format!("tuning.{name} must be > 0 (got {v}), using {dflt}"));
                dflt
            }
        };

        let tuning = TuningConfig {
            tick_rate_ms: t.tick_rate_ms.max(1),
            step_size: positive("step_size", t.step_size, default_step_size(), &mut warnings),
            move_speed: positive("move_speed", t.move_speed, default_move_speed(), &mut warnings),
            fade_duration: t.fade_duration.max(0.0),
            overlay_grow_speed: positive("overlay_grow_speed", t.overlay_grow_speed, default_grow_speed(), &mut warnings),
            overlay_final_size: Vec2::new(t.overlay_final_size[0], t.overlay_final_size[1]),
            overlay_enabled: t.overlay_enabled,
            blink_interval: positive("blink_interval", t.blink_interval, default_blink_interval(), &mut warnings),
        };

        GameConfig {
            tuning,
            rules: RulesConfig {
                reservation: toml_cfg.rules.reservation,
            },
            gamepad: GamepadConfig {
                restart: toml_cfg.gamepad.restart,
                quit: toml_cfg.gamepad.quit,
            },
            log_file: PathBuf::from(toml_cfg.general.log_file),
            warnings,
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warnings.push(format!("config.toml parse error: {e}; using default settings"));
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warnings.push(format!("could not read {}: {e}", path.display()));
                }
            }
        }
    }
    TomlConfig::default()
}
