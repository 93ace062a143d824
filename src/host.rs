/// The host multiplexes the engine registry behind one physical grid.
///
/// Two modes: `Select` shows a row of launch cells, one per game, centered
/// in the grid; `Activate` on a launch cell enters `Play` for that engine.
/// In `Play` every action is forwarded to the active engine with its
/// coordinates translated, so engines only ever see their own logical
/// board. Leaving a game resets the round but keeps its session score.

use rand::RngCore;

use crate::games::{Action, CellView, Engine, GameSnapshot, SnapshotMismatch, Tone};
use crate::grid::{self, PHYS_SIZE};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Select,
    Play,
}

pub struct Host {
    engines: Vec<Box<dyn Engine>>,
    mode: Mode,
    active: usize,
    /// Selection cursor in physical coordinates; roams the whole grid.
    sel: (usize, usize),
}

impl Host {
    pub fn new(engines: Vec<Box<dyn Engine>>) -> Host {
        Host {
            engines,
            mode: Mode::Select,
            active: 0,
            sel: (PHYS_SIZE / 2, PHYS_SIZE / 2),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn active(&self) -> &dyn Engine {
        self.engines[self.active].as_ref()
    }

    /// Physical position of launch cell `i`: the middle row, with the whole
    /// run of cells centered horizontally.
    fn launch_cell(&self, i: usize) -> (usize, usize) {
        let row = PHYS_SIZE / 2;
        let col = grid::center_offset(PHYS_SIZE, self.engines.len()) + i;
        (row, col)
    }

    fn launch_at(&self, pos: (usize, usize)) -> Option<usize> {
        (0..self.engines.len()).find(|&i| self.launch_cell(i) == pos)
    }

    pub fn handle(&mut self, action: Action, rng: &mut dyn RngCore) {
        match self.mode {
            Mode::Select => match action {
                Action::Move(dir) => {
                    let (r, c) = self.sel;
                    self.sel = grid::step_wrapped(PHYS_SIZE, r, c, dir);
                }
                Action::Activate => {
                    // Empty cells are inert; only a launch cell starts a game.
                    if let Some(i) = self.launch_at(self.sel) {
                        self.active = i;
                        self.mode = Mode::Play;
                    }
                }
                Action::Tick | Action::TogglePause | Action::Reset => {}
            },
            Mode::Play => self.engines[self.active].apply(action, rng),
        }
    }

    /// Leave the active game: the round is reset (session score survives,
    /// engines keep it across `Reset`) and the grid returns to selection.
    pub fn back(&mut self, rng: &mut dyn RngCore) {
        if self.mode == Mode::Play {
            self.engines[self.active].apply(Action::Reset, rng);
            self.mode = Mode::Select;
        }
    }

    /// Timer cadence wanted right now. Selection mode never ticks, so
    /// entering it implicitly cancels any pending game timer.
    pub fn tick_interval(&self) -> Option<std::time::Duration> {
        match self.mode {
            Mode::Select => None,
            Mode::Play => self.active().tick_interval(),
        }
    }

    /// Project one physical cell. Pure: reads engine state and cursors only.
    pub fn view(&self, r: usize, c: usize) -> CellView {
        match self.mode {
            Mode::Select => {
                let view = match self.launch_at((r, c)) {
                    Some(i) => CellView {
                        glyph: self.engines[i].id().launch_glyph(),
                        tone: Tone::Accent,
                        highlighted: false,
                    },
                    None => CellView::EMPTY,
                };
                CellView {
                    highlighted: (r, c) == self.sel,
                    ..view
                }
            }
            Mode::Play => {
                let e = self.active();
                let off = grid::center_offset(PHYS_SIZE, e.size());
                let (lr, lc) = (r.wrapping_sub(off), c.wrapping_sub(off));
                if lr < e.size() && lc < e.size() {
                    e.view(lr, lc)
                } else {
                    // Margin around a smaller logical board.
                    CellView { glyph: ' ', tone: Tone::Dim, highlighted: false }
                }
            }
        }
    }

    pub fn title(&self) -> &str {
        match self.mode {
            Mode::Select => "Select a game",
            Mode::Play => self.active().title(),
        }
    }

    pub fn status_line(&self) -> String {
        match self.mode {
            Mode::Select => "[←↑↓→] move  [Enter] launch  [q] quit".into(),
            Mode::Play => self.active().status_line(),
        }
    }

    /// Sum of every engine's running session score.
    pub fn total_score(&self) -> i32 {
        self.engines.iter().map(|e| e.score()).sum()
    }

    pub fn snapshot_active(&self) -> Option<GameSnapshot> {
        match self.mode {
            Mode::Select => None,
            Mode::Play => Some(self.active().snapshot()),
        }
    }

    /// Route a snapshot to the engine it belongs to and make that engine
    /// active. Works from either mode; the grid switches to `Play`.
    pub fn restore(&mut self, snap: GameSnapshot) -> Result<(), SnapshotMismatch> {
        let game = snap.game();
        match self.engines.iter().position(|e| e.id() == game) {
            Some(i) => {
                self.engines[i].restore(snap)?;
                self.active = i;
                self.mode = Mode::Play;
                Ok(())
            }
            None => Err(SnapshotMismatch { expected: game, found: game }),
        }
    }
}
