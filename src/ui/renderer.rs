/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// This eliminates flicker caused by full-screen redraws.
///
/// Layering, bottom to top: board, crates, player, HUD, completion banner,
/// then the start-screen overlays (background, title, prompt) whose
/// visibility the game toggles through `set_overlay_visible`.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::Banner;
use crate::domain::geometry::GridPos;
use crate::domain::tile::Tile;
use crate::sim::event::Overlay;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// inter-row gap colour matches every cell on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        let len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.ch_len = len;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("?")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    /// Write a string horizontally centred on row `y`.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let x = self.width.saturating_sub(s.chars().count()) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    fn fill_rect(&mut self, x0: usize, y0: usize, w: usize, h: usize, bg: Color) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                self.set(x, y, Cell::from_char(' ', Color::White, bg));
            }
        }
    }
}

// ── Palette ──

const FLOOR_BG: (u8, u8, u8) = (34, 34, 48);
const CRATE_FG: (u8, u8, u8) = (230, 170, 80);
const CRATE_BG: (u8, u8, u8) = (120, 80, 30);
const WALL_FG: Color = Color::Rgb { r: 120, g: 120, b: 120 };
const WALL_BG: Color = Color::Rgb { r: 70, g: 70, b: 70 };
const GOAL_FG: Color = Color::Rgb { r: 255, g: 220, b: 50 };
const PLAYER_FG: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const BANNER_BG: Color = Color::Rgb { r: 30, g: 60, b: 30 };
const START_BG: Color = Color::Rgb { r: 16, g: 24, b: 48 };
const FLOOR: Color = rgb(FLOOR_BG);

const fn rgb(c: (u8, u8, u8)) -> Color {
    Color::Rgb { r: c.0, g: c.1, b: c.2 }
}

/// Blend `from` toward `to` by `opacity` (1.0 = fully `from`).
fn fade(from: (u8, u8, u8), to: (u8, u8, u8), opacity: f32) -> Color {
    let a = opacity.clamp(0.0, 1.0);
    let mix = |f: u8, t: u8| (t as f32 + (f as f32 - t as f32) * a).round() as u8;
    Color::Rgb { r: mix(from.0, to.0), g: mix(from.1, to.1), b: mix(from.2, to.2) }
}

// ── Renderer ──

/// Each board cell is 2 terminal columns wide.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    /// Visibility of each start-screen overlay, in `Overlay::START_SCREEN` order.
    overlays: [bool; 3],
    /// The terminal reports key Release events.
    pub keyboard_enhanced: bool,
}

fn overlay_slot(overlay: Overlay) -> usize {
    match overlay {
        Overlay::Title => 0,
        Overlay::Prompt => 1,
        Overlay::Background => 2,
    }
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            overlays: [true; 3],
            keyboard_enhanced: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame
        self.back.cells.fill(Cell::INVALID);

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            self.keyboard_enhanced = execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .is_ok();
        }

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
            self.keyboard_enhanced = false;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn set_overlay_visible(&mut self, overlay: Overlay, visible: bool) {
        self.overlays[overlay_slot(overlay)] = visible;
    }

    pub fn overlay_visible(&self, overlay: Overlay) -> bool {
        self.overlays[overlay_slot(overlay)]
    }

    /// Back to the start screen as a freshly built level shows it.
    pub fn reset_overlays(&mut self) {
        self.overlays = [true; 3];
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change → clear for clean transition
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        self.compose_frame(world);
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    fn compose_frame(&mut self, world: &WorldState) {
        let origin = self.board_origin(world);
        self.compose_board(world, origin);
        self.compose_hud(world);
        if let Some(banner) = &world.banner {
            self.compose_banner(world, banner, origin);
        }
        self.compose_start_screen();
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal
        // default and leave line artifacts.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    /// Terminal (col, row) of board cell (0, 0), centring the board.
    fn board_origin(&self, world: &WorldState) -> (usize, usize) {
        let board_w = world.board.width * CELL_W;
        (self.front.width.saturating_sub(board_w) / 2, MAP_ROW)
    }

    fn put_board_cell(&mut self, origin: (usize, usize), cell: GridPos, glyph: [char; 2], fg: Color, bg: Color) {
        if cell.x < 0 || cell.y < 0 { return; }
        let col = origin.0 + cell.x as usize * CELL_W;
        let row = origin.1 + cell.y as usize;
        self.front.set(col, row, Cell::from_char(glyph[0], fg, bg));
        self.front.set(col + 1, row, Cell::from_char(glyph[1], fg, bg));
    }

    fn compose_board(&mut self, w: &WorldState, origin: (usize, usize)) {
        let board = &w.board;
        let step = board.step_size;

        for gy in 0..board.height as i32 {
            for gx in 0..board.width as i32 {
                let cell = GridPos::new(gx, gy);
                let (glyph, fg, bg) = match board.terrain_at(cell) {
                    Tile::Wall => (['█', '█'], WALL_FG, WALL_BG),
                    Tile::Floor => ([' ', ' '], Color::White, FLOOR),
                    Tile::Void => continue,
                };
                self.put_board_cell(origin, cell, glyph, fg, bg);
            }
        }

        for goal in &board.goals {
            self.put_board_cell(origin, goal.cell, ['(', ')'], GOAL_FG, FLOOR);
        }

        // Crates fade toward the floor colour while being delivered
        for c in &board.crates {
            let fg = fade(CRATE_FG, FLOOR_BG, c.opacity);
            let bg = fade(CRATE_BG, FLOOR_BG, c.opacity);
            self.put_board_cell(origin, c.cell(step), ['[', ']'], fg, bg);
        }

        self.put_board_cell(origin, w.player.cell(step), ['<', '>'], PLAYER_FG, FLOOR);
    }

    fn compose_hud(&mut self, w: &WorldState) {
        let hud = format!(
            " {}   Crates {}/{} ",
            w.level_name(), w.game.score, w.game.total_crates,
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::Black, Color::Rgb { r: 200, g: 180, b: 50 });

        let help_row = MAP_ROW + w.board.height + 1;
        let help = match w.phase {
            Phase::LevelComplete if w.awaiting_restart_key() => "LEVEL COMPLETE  press any key to play again",
            Phase::LevelComplete => "LEVEL COMPLETE",
            _ => "WASD / arrows move   R restart   Esc quit",
        };
        self.front.put_centered(help_row, help, Color::White, Color::Reset);
    }

    fn compose_banner(&mut self, w: &WorldState, banner: &Banner, origin: (usize, usize)) {
        let (x0, y0, bw, bh) = banner_rect(banner, w.step_size(), origin);
        self.front.fill_rect(x0, y0, bw, bh, BANNER_BG);

        let label = "CLEAR!";
        if bw >= label.len() {
            let row = y0 + bh / 2;
            let col = x0 + (bw - label.len()) / 2;
            self.front.put_str(col, row, label, GOAL_FG, BANNER_BG);
        }
    }

    fn compose_start_screen(&mut self) {
        let (fw, fh) = (self.front.width, self.front.height);
        if self.overlay_visible(Overlay::Background) {
            self.front.fill_rect(0, 0, fw, fh, START_BG);
        }
        let mid = fh / 2;
        if self.overlay_visible(Overlay::Title) {
            let title = [
                "┌──────────────────────────┐",
                "│      P U S H B O X       │",
                "└──────────────────────────┘",
            ];
            for (i, line) in title.iter().enumerate() {
                self.front.put_centered(mid.saturating_sub(4) + i, line, GOAL_FG, START_BG);
            }
        }
        if self.overlay_visible(Overlay::Prompt) {
            self.front.put_centered(mid + 1, "press any key", Color::White, START_BG);
        }
    }
}

/// Banner rectangle in terminal cells: (col, row, width, height).
/// The banner is centred on its world position and spans `scale` world
/// units, converted to board cells.
fn banner_rect(banner: &Banner, step_size: f32, origin: (usize, usize)) -> (usize, usize, usize, usize) {
    let cells_w = (banner.scale.x / step_size).round().max(1.0);
    let cells_h = (banner.scale.y / step_size).round().max(1.0);
    let cx = banner.position.x / step_size;
    let cy = banner.position.y / step_size;

    // Left/top edge in board cells, measured from the centre of cell (0, 0)
    let left = cx - (cells_w - 1.0) / 2.0;
    let top = cy - (cells_h - 1.0) / 2.0;

    let col = origin.0 as f32 + (left * CELL_W as f32).round();
    let row = origin.1 as f32 + top.round();
    (
        col.max(0.0) as usize,
        row.max(0.0) as usize,
        cells_w as usize * CELL_W,
        cells_h as usize,
    )
}
