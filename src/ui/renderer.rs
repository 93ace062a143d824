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

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::games::Tone;
use crate::grid::PHYS_SIZE;
use crate::host::Host;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every cell, matching the Clear color so
    /// VTE-based terminals show no inter-row gap lines.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: ' ',
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel used to invalidate the back buffer: differs from any real
    /// cell, so every position gets diff'd on the next frame.
    const INVALID: Cell = Cell {
        ch: '?',
        fg: Color::Magenta,
        bg: Color::Magenta,
    };
}

/// Terminal color for an abstract tone.
fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Dim => Color::DarkGrey,
        Tone::Neutral => Color::Grey,
        Tone::Player => Color::Green,
        Tone::Cpu => Color::Red,
        Tone::Accent => Color::Yellow,
        Tone::Danger => Color::Red,
        Tone::Palette(v) => PALETTE[v as usize % PALETTE.len()],
    }
}

/// Cascade gem colors, indexed by cell value.
const PALETTE: [Color; 6] = [
    Color::Red,
    Color::Green,
    Color::Blue,
    Color::Yellow,
    Color::Magenta,
    Color::Cyan,
];

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

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width {
                break;
            }
            self.set(cx, y, Cell { ch, fg, bg });
            cx += 1;
        }
    }
}

// ── Renderer ──

/// Each grid cell spans 2 terminal columns for a near-square look.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const GRID_ROW: usize = 2;
const STATUS_ROW: usize = GRID_ROW + PHYS_SIZE + 1;
const MESSAGE_ROW: usize = STATUS_ROW + 1;

/// Everything the HUD shows besides the grid itself.
pub struct Hud<'a> {
    pub total_score: i32,
    pub elapsed_seconds: u64,
    pub time_limit_seconds: u64,
    pub help_visible: bool,
    /// Transient status message (save confirmations etc.).
    pub message: Option<&'a str>,
    /// Active text-entry prompt, shown instead of the message.
    pub prompt: Option<&'a str>,
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
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
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, host: &Host, hud: &Hud) -> io::Result<()> {
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

        self.front.clear();
        self.compose_hud(host, hud);
        self.compose_grid(host);
        self.front.put_str(
            0,
            STATUS_ROW,
            &host.status_line(),
            Color::Grey,
            Cell::BASE_BG,
        );
        if let Some(prompt) = hud.prompt {
            let line = format!("Save as: {}_", prompt);
            self.front.put_str(0, MESSAGE_ROW, &line, Color::Yellow, Cell::BASE_BG);
        } else if let Some(msg) = hud.message {
            self.front.put_str(0, MESSAGE_ROW, msg, Color::Cyan, Cell::BASE_BG);
        }
        if hud.help_visible {
            self.compose_help();
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn compose_hud(&mut self, host: &Host, hud: &Hud) {
        let clock = if hud.time_limit_seconds > 0 {
            let left = hud.time_limit_seconds.saturating_sub(hud.elapsed_seconds);
            format!("{}:{:02} left", left / 60, left % 60)
        } else {
            format!("{}:{:02}", hud.elapsed_seconds / 60, hud.elapsed_seconds % 60)
        };
        let line = format!("{}  score {}  {}", host.title(), hud.total_score, clock);
        self.front.put_str(0, HUD_ROW, &line, Color::White, Cell::BASE_BG);
    }

    fn compose_grid(&mut self, host: &Host) {
        for r in 0..PHYS_SIZE {
            for c in 0..PHYS_SIZE {
                let view = host.view(r, c);
                let (fg, bg) = if view.highlighted {
                    (Color::Black, tone_highlight(view.tone))
                } else {
                    (tone_color(view.tone), Cell::BASE_BG)
                };
                let x = c * CELL_W;
                let y = GRID_ROW + r;
                self.front.set(x, y, Cell { ch: view.glyph, fg, bg });
                self.front.set(x + 1, y, Cell { ch: ' ', fg, bg });
            }
        }
    }

    fn compose_help(&mut self) {
        let lines = [
            "┌─ Keys ──────────────────────┐",
            "│ arrows/wasd  move / turn    │",
            "│ enter/space  place / pick   │",
            "│ p            pause (snake)  │",
            "│ r            restart round  │",
            "│ esc          back to select │",
            "│ F2           save as name   │",
            "│ F5..F8 save  F9..F12 load   │",
            "│ h            close this     │",
            "└─────────────────────────────┘",
        ];
        let y0 = GRID_ROW + 2;
        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(2, y0 + i, line, Color::White, Color::DarkBlue);
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors at frame start; ResetColor would fall back to
        // the terminal default and reintroduce gap-line artifacts.
        queue!(
            self.writer,
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
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }
}

/// Background used for the highlighted (cursor) cell.
fn tone_highlight(tone: Tone) -> Color {
    match tone {
        Tone::Dim | Tone::Neutral => Color::White,
        other => tone_color(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_tones_cycle_within_bounds() {
        for v in 0..12u8 {
            // must never panic, even past the palette length
            let _ = tone_color(Tone::Palette(v));
        }
        assert_eq!(tone_color(Tone::Palette(0)), tone_color(Tone::Palette(6)));
    }

    #[test]
    fn put_str_clips_at_the_right_edge() {
        let mut fb = FrameBuffer::new(4, 1);
        fb.put_str(2, 0, "abcdef", Color::White, Cell::BASE_BG);
        assert_eq!(fb.get(2, 0).ch, 'a');
        assert_eq!(fb.get(3, 0).ch, 'b');
        // out-of-range reads come back blank
        assert_eq!(fb.get(4, 0).ch, ' ');
    }

    #[test]
    fn resize_drops_stale_content() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.set(1, 1, Cell { ch: 'x', fg: Color::Red, bg: Cell::BASE_BG });
        fb.resize(3, 3);
        assert_eq!(fb.get(1, 1).ch, ' ');
        fb.resize(3, 3); // same size: no-op, content kept
        fb.set(1, 1, Cell { ch: 'y', fg: Color::Red, bg: Cell::BASE_BG });
        fb.resize(3, 3);
        assert_eq!(fb.get(1, 1).ch, 'y');
    }
}
