/// Caro: N-in-a-row on an N×N board, parameterized by board size and
/// win-length. One engine serves both presets (10×10 win-4, 15×15 win-5);
/// the scoring table is injected at creation so the presets can never
/// silently diverge.
///
/// Win scan: for every occupied cell and each of 4 directions (→, ↓, ↘, ↙)
/// count `win_len` consecutive identical marks, bounds-checked. O(N²) per
/// check, run only after a move — fine for N ≤ 15.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::games::tictactoe::{Mark, Turn};
use crate::games::{
    Action, CellView, Engine, GameId, GameSnapshot, Outcome, Scoring, SnapshotMismatch, Tone,
};
use crate::grid::{self, Dir};

/// Scan directions: right, down, down-right, down-left. Together with the
/// "start at every occupied cell" rule these cover all 4 line orientations.
const SCAN_DIRS: [(i32, i32); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CaroState {
    pub size: usize,
    pub win_len: usize,
    pub board: Vec<Option<Mark>>,
    pub cursor: usize,
    pub turn: Turn,
    pub winner: Outcome,
    pub score: i32,
    pub moves: u32,
    pub scoring: Scoring,
}

pub fn create(size: usize, win_len: usize, scoring: Scoring) -> CaroState {
    CaroState {
        size,
        win_len,
        board: vec![None; size * size],
        cursor: grid::idx(size, size / 2, size / 2),
        turn: Turn::Human,
        winner: Outcome::Ongoing,
        score: 0,
        moves: 0,
        scoring,
    }
}

/// Pure transition. Illegal moves return the input state unchanged.
pub fn transition<R: Rng + ?Sized>(s: &CaroState, action: Action, rng: &mut R) -> CaroState {
    match action {
        Action::Move(dir) => moved(s, dir),
        Action::Activate => activate(s, rng),
        Action::Reset => CaroState {
            score: s.score,
            ..create(s.size, s.win_len, s.scoring)
        },
        Action::Tick | Action::TogglePause => s.clone(),
    }
}

fn moved(s: &CaroState, dir: Dir) -> CaroState {
    let (r, c) = (s.cursor / s.size, s.cursor % s.size);
    let (nr, nc) = grid::step_wrapped(s.size, r, c, dir);
    CaroState {
        cursor: grid::idx(s.size, nr, nc),
        ..s.clone()
    }
}

fn activate<R: Rng + ?Sized>(s: &CaroState, rng: &mut R) -> CaroState {
    if s.winner.is_terminal() || s.turn != Turn::Human || s.board[s.cursor].is_some() {
        return s.clone();
    }

    let mut next = s.clone();
    next.board[next.cursor] = Some(Mark::X);
    next.moves += 1;

    if has_run(&next, Mark::X) {
        next.winner = Outcome::Win;
        next.score += next.scoring.win;
        return next;
    }
    if next.board.iter().all(|m| m.is_some()) {
        next.winner = Outcome::Draw;
        next.score += next.scoring.draw;
        return next;
    }

    let empties: Vec<usize> = next
        .board
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_none())
        .map(|(i, _)| i)
        .collect();
    let pick = empties[grid::rand_index(rng, empties.len())];
    next.board[pick] = Some(Mark::O);

    if has_run(&next, Mark::O) {
        next.winner = Outcome::Loss;
        next.score += next.scoring.loss;
    } else if next.board.iter().all(|m| m.is_some()) {
        next.winner = Outcome::Draw;
        next.score += next.scoring.draw;
    }
    next
}

/// Does `mark` own a run of `win_len` anywhere on the board?
fn has_run(s: &CaroState, mark: Mark) -> bool {
    let n = s.size as i32;
    for r in 0..n {
        for c in 0..n {
            if s.board[grid::idx(s.size, r as usize, c as usize)] != Some(mark) {
                continue;
            }
            for &(dr, dc) in &SCAN_DIRS {
                let mut count = 1;
                let (mut rr, mut cc) = (r + dr, c + dc);
                while count < s.win_len
                    && grid::in_bounds(s.size, rr, cc)
                    && s.board[grid::idx(s.size, rr as usize, cc as usize)] == Some(mark)
                {
                    count += 1;
                    rr += dr;
                    cc += dc;
                }
                if count >= s.win_len {
                    return true;
                }
            }
        }
    }
    false
}

// ── Engine wrapper ──

pub struct Caro {
    id: GameId,
    title: &'static str,
    state: CaroState,
}

impl Caro {
    pub fn create_mini(cfg: &GameConfig) -> Self {
        Caro {
            id: GameId::CaroMini,
            title: "Caro 10×10",
            state: create(cfg.boards.caro_mini_size, cfg.boards.caro_mini_win, cfg.scoring.caro),
        }
    }

    pub fn create_classic(cfg: &GameConfig) -> Self {
        Caro {
            id: GameId::Caro,
            title: "Caro 15×15",
            state: create(cfg.boards.caro_size, cfg.boards.caro_win, cfg.scoring.caro),
        }
    }
}

impl Engine for Caro {
    fn id(&self) -> GameId {
        self.id
    }

    fn title(&self) -> &'static str {
        self.title
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
        let (glyph, tone) = match self.state.board[i] {
            Some(Mark::X) => ('X', Tone::Player),
            Some(Mark::O) => ('O', Tone::Cpu),
            None => ('·', Tone::Dim),
        };
        CellView {
            glyph,
            tone,
            highlighted: i == self.state.cursor,
        }
    }

    fn outcome(&self) -> Outcome {
        self.state.winner
    }

    fn score(&self) -> i32 {
        self.state.score
    }

    fn status_line(&self) -> String {
        match self.state.winner {
            Outcome::Win => format!("{} in a row — you win!", self.state.win_len),
            Outcome::Loss => "CPU lined up first.".into(),
            Outcome::Draw => "Board full — draw.".into(),
            Outcome::Ongoing => format!("Line up {} to win", self.state.win_len),
        }
    }

    fn snapshot(&self) -> GameSnapshot {
        match self.id {
            GameId::CaroMini => GameSnapshot::CaroMini(self.state.clone()),
            _ => GameSnapshot::Caro(self.state.clone()),
        }
    }

    fn restore(&mut self, snap: GameSnapshot) -> Result<(), SnapshotMismatch> {
        match (self.id, snap) {
            (GameId::CaroMini, GameSnapshot::CaroMini(s)) | (GameId::Caro, GameSnapshot::Caro(s)) => {
                self.state = s;
                Ok(())
            }
            (_, other) => Err(SnapshotMismatch {
                expected: self.id,
                found: other.game(),
            }),
        }
    }
}
