/// Match-Cascade: swap two adjacent tiles to line up runs of 3+, which
/// clear, collapse, refill, and may chain. No terminal state — the board
/// runs until the player leaves.
///
/// A freshly created board may already contain matches; they are accepted
/// as-is and only resolve once the player makes their first swap.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::games::{
    Action, CellView, Engine, GameId, GameSnapshot, Outcome, SnapshotMismatch, Tone,
};
use crate::grid::{self, Dir};

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CascadeState {
    pub size: usize,
    pub colors: u8,
    pub board: Vec<u8>,
    pub cursor: usize,
    /// First cell of a two-step pick, if any.
    pub selected: Option<usize>,
    pub score: i32,
    pub per_cell: i32,
}

pub fn create<R: Rng + ?Sized>(size: usize, colors: u8, per_cell: i32, rng: &mut R) -> CascadeState {
    let board = (0..size * size).map(|_| rng.gen_range(0..colors)).collect();
    CascadeState {
        size,
        colors,
        board,
        cursor: grid::idx(size, size / 2, size / 2),
        selected: None,
        score: 0,
        per_cell,
    }
}

/// Pure transition. A non-adjacent second pick or a swap that produces no
/// run leaves the board untouched (the latter by reverting the swap).
pub fn transition<R: Rng + ?Sized>(s: &CascadeState, action: Action, rng: &mut R) -> CascadeState {
    match action {
        Action::Move(dir) => moved(s, dir),
        Action::Activate => activate(s, rng),
        Action::Reset => CascadeState {
            score: s.score,
            ..create(s.size, s.colors, s.per_cell, rng)
        },
        Action::Tick | Action::TogglePause => s.clone(),
    }
}

fn moved(s: &CascadeState, dir: Dir) -> CascadeState {
    let (r, c) = (s.cursor / s.size, s.cursor % s.size);
    let (nr, nc) = grid::step_wrapped(s.size, r, c, dir);
    CascadeState {
        cursor: grid::idx(s.size, nr, nc),
        ..s.clone()
    }
}

fn activate<R: Rng + ?Sized>(s: &CascadeState, rng: &mut R) -> CascadeState {
    let i = s.cursor;
    let first = match s.selected {
        None => {
            return CascadeState { selected: Some(i), ..s.clone() };
        }
        Some(f) => f,
    };

    // Picking the same cell again just clears the selection.
    if first == i {
        return CascadeState { selected: None, ..s.clone() };
    }
    if !adjacent(s.size, first, i) {
        return CascadeState { selected: None, ..s.clone() };
    }

    let mut next = s.clone();
    next.selected = None;
    next.board.swap(first, i);

    if !find_runs(&next.board, next.size).iter().any(|&m| m) {
        // No run produced: revert. This doubles as the invalid-move guard.
        next.board.swap(first, i);
        return next;
    }

    let cleared = resolve(&mut next.board, next.size, next.colors, rng);
    next.score += next.per_cell * cleared as i32;
    next
}

fn adjacent(size: usize, a: usize, b: usize) -> bool {
    let (ar, ac) = (a / size, a % size);
    let (br, bc) = (b / size, b % size);
    ar.abs_diff(br) + ac.abs_diff(bc) == 1
}

/// Mark every cell participating in a horizontal or vertical run of 3+.
/// Rows and columns are scanned independently with a linear pass each.
pub fn find_runs(board: &[u8], size: usize) -> Vec<bool> {
    let mut mask = vec![false; board.len()];
    for r in 0..size {
        mark_line(board, &mut mask, (0..size).map(|c| grid::idx(size, r, c)));
    }
    for c in 0..size {
        mark_line(board, &mut mask, (0..size).map(|r| grid::idx(size, r, c)));
    }
    mask
}

fn mark_line(board: &[u8], mask: &mut [bool], line: impl Iterator<Item = usize>) {
    let cells: Vec<usize> = line.collect();
    let mut run_start = 0;
    for k in 1..=cells.len() {
        let run_over = k == cells.len() || board[cells[k]] != board[cells[run_start]];
        if run_over {
            if k - run_start >= 3 {
                for &i in &cells[run_start..k] {
                    mask[i] = true;
                }
            }
            run_start = k;
        }
    }
}

/// Clear-collapse-rescan until no runs remain. Returns total cells cleared.
/// Terminates: every iteration clears at least 3 cells, and refills only
/// continue the loop while they themselves form runs.
fn resolve<R: Rng + ?Sized>(board: &mut Vec<u8>, size: usize, colors: u8, rng: &mut R) -> usize {
    let mut total = 0;
    loop {
        let mask = find_runs(board, size);
        let cleared = mask.iter().filter(|&&m| m).count();
        if cleared == 0 {
            return total;
        }
        total += cleared;

        let holes: Vec<Option<u8>> = board
            .iter()
            .zip(&mask)
            .map(|(&v, &m)| if m { None } else { Some(v) })
            .collect();
        for c in 0..size {
            let column: Vec<Option<u8>> = (0..size).map(|r| holes[grid::idx(size, r, c)]).collect();
            let filled = grid::collapse_column(&column, rng, colors);
            for (r, v) in filled.into_iter().enumerate() {
                board[grid::idx(size, r, c)] = v;
            }
        }
    }
}

// ── Engine wrapper ──

pub struct Cascade {
    state: CascadeState,
}

impl Cascade {
    pub fn create(cfg: &GameConfig, rng: &mut dyn rand::RngCore) -> Self {
        Cascade {
            state: create(
                cfg.boards.cascade_size,
                cfg.boards.cascade_colors,
                cfg.scoring.cascade_per_cell,
                rng,
            ),
        }
    }
}

impl Engine for Cascade {
    fn id(&self) -> GameId {
        GameId::Cascade
    }

    fn title(&self) -> &'static str {
        "Match Cascade"
    }

    fn size(&self) -> usize {
        self.state.size
    }

    fn cursor(&self) -> Option<(usize, usize)> {
        Some((self.state.cursor / self.state.size, self.state.cursor % self.state.size))
    }

    fn apply(&mut self, action: Action, rng: &mut dyn rand::RngCore) {
        self.state = transition(&self.state, action, rng);
    }

    fn view(&self, r: usize, c: usize) -> CellView {
        let i = grid::idx(self.state.size, r, c);
        let glyph = if self.state.selected == Some(i) { '◉' } else { '●' };
        CellView {
            glyph,
            tone: Tone::Palette(self.state.board[i]),
            highlighted: i == self.state.cursor,
        }
    }

    fn outcome(&self) -> Outcome {
        Outcome::Ongoing // no terminal condition by design
    }

    fn score(&self) -> i32 {
        self.state.score
    }

    fn status_line(&self) -> String {
        match self.state.selected {
            Some(_) => "Pick an adjacent tile to swap".into(),
            None => "Pick a tile".into(),
        }
    }

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::Cascade(self.state.clone())
    }

    fn restore(&mut self, snap: GameSnapshot) -> Result<(), SnapshotMismatch> {
        match snap {
            GameSnapshot::Cascade(s) => {
                self.state = s;
                Ok(())
            }
            other => Err(SnapshotMismatch {
                expected: GameId::Cascade,
                found: other.game(),
            }),
        }
    }
}
