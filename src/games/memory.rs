/// Memory pairs on a small logical board centered in the physical grid.
///
/// The engine has no sense of wall-clock time: after a mismatch it sets
/// `lock` and leaves both cards face-up until the shell's timer delivers a
/// `Tick` (the configurable flip-back delay), which re-hides them. While
/// locked, every `Activate` is ignored.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::games::{
    Action, CellView, Engine, GameId, GameSnapshot, Outcome, SnapshotMismatch, Tone,
};
use crate::grid::{self, Dir};

/// Sentinel id that matches any card; dealt once when the deck would
/// otherwise need half a pair (odd cell count).
pub const JOKER: u8 = u8::MAX;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Card {
    pub id: u8,
    pub revealed: bool,
    pub matched: bool,
}

impl Card {
    fn hidden(id: u8) -> Card {
        Card { id, revealed: false, matched: false }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MemoryState {
    pub size: usize,
    pub deck: Vec<Card>,
    pub cursor: usize,
    /// Indices of revealed-but-unresolved cards; never more than 2.
    pub opened: Vec<usize>,
    /// True while two mismatched cards await the flip-back tick.
    pub lock: bool,
    pub score: i32,
    pub done: bool,
    pub match_reward: i32,
    pub complete_bonus: i32,
    pub flip_back_ms: u64,
}

pub fn create<R: Rng + ?Sized>(
    size: usize,
    match_reward: i32,
    complete_bonus: i32,
    flip_back_ms: u64,
    rng: &mut R,
) -> MemoryState {
    let cells = size * size;
    let mut deck: Vec<Card> = (0..cells as u8 / 2)
        .flat_map(|id| [Card::hidden(id), Card::hidden(id)])
        .collect();
    if deck.len() < cells {
        deck.push(Card::hidden(JOKER));
    }
    deck.shuffle(rng);
    MemoryState {
        size,
        deck,
        cursor: 0,
        opened: vec![],
        lock: false,
        score: 0,
        done: false,
        match_reward,
        complete_bonus,
        flip_back_ms,
    }
}

/// Pure transition. Flip order is irrelevant: revealing A then B resolves
/// exactly as B then A.
pub fn transition<R: Rng + ?Sized>(s: &MemoryState, action: Action, rng: &mut R) -> MemoryState {
    match action {
        Action::Move(dir) => moved(s, dir),
        Action::Activate => activate(s),
        Action::Tick => tick(s),
        Action::Reset => MemoryState {
            score: s.score,
            ..create(s.size, s.match_reward, s.complete_bonus, s.flip_back_ms, rng)
        },
        Action::TogglePause => s.clone(),
    }
}

fn moved(s: &MemoryState, dir: Dir) -> MemoryState {
    let (r, c) = (s.cursor / s.size, s.cursor % s.size);
    let (nr, nc) = grid::step_wrapped(s.size, r, c, dir);
    MemoryState {
        cursor: grid::idx(s.size, nr, nc),
        ..s.clone()
    }
}

fn pair_matches(a: u8, b: u8) -> bool {
    a == b || a == JOKER || b == JOKER
}

fn activate(s: &MemoryState) -> MemoryState {
    if s.lock || s.done {
        return s.clone();
    }
    let card = s.deck[s.cursor];
    if card.matched || card.revealed {
        return s.clone();
    }

    let mut next = s.clone();
    next.deck[next.cursor].revealed = true;
    next.opened.push(next.cursor);
    if next.opened.len() < 2 {
        return next;
    }

    let (a, b) = (next.opened[0], next.opened[1]);
    if pair_matches(next.deck[a].id, next.deck[b].id) {
        next.deck[a].matched = true;
        next.deck[b].matched = true;
        next.opened.clear();
        next.score += next.match_reward;
        if next.deck.iter().all(|c| c.matched) {
            next.done = true;
            next.score += next.complete_bonus;
        }
    } else {
        // Both stay face-up until the flip-back timer ticks.
        next.lock = true;
    }
    next
}

fn tick(s: &MemoryState) -> MemoryState {
    if !s.lock {
        return s.clone();
    }
    let mut next = s.clone();
    for &i in &s.opened {
        next.deck[i].revealed = false;
    }
    next.opened.clear();
    next.lock = false;
    next
}

// ── Engine wrapper ──

pub struct Memory {
    state: MemoryState,
}

impl Memory {
    pub fn create(cfg: &GameConfig, rng: &mut dyn rand::RngCore) -> Self {
        Memory {
            state: create(
                cfg.boards.memory_size,
                cfg.scoring.memory_match,
                cfg.scoring.memory_complete,
                cfg.timing.flip_back_ms,
                rng,
            ),
        }
    }
}

impl Engine for Memory {
    fn id(&self) -> GameId {
        GameId::Memory
    }

    fn title(&self) -> &'static str {
        "Memory Pairs"
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
        let card = self.state.deck[i];
        let face = if card.id == JOKER { '★' } else { (b'A' + card.id) as char };
        let (glyph, tone) = if card.matched {
            (face, Tone::Accent)
        } else if card.revealed {
            (face, Tone::Player)
        } else {
            ('▢', Tone::Neutral)
        };
        CellView {
            glyph,
            tone,
            highlighted: i == self.state.cursor,
        }
    }

    fn outcome(&self) -> Outcome {
        if self.state.done {
            Outcome::Win
        } else {
            Outcome::Ongoing
        }
    }

    fn score(&self) -> i32 {
        self.state.score
    }

    fn tick_interval(&self) -> Option<std::time::Duration> {
        if self.state.lock {
            Some(std::time::Duration::from_millis(self.state.flip_back_ms))
        } else {
            None
        }
    }

    fn status_line(&self) -> String {
        if self.state.done {
            "All pairs found! [Enter] new deal".into()
        } else if self.state.lock {
            "No match...".into()
        } else {
            let left = self.state.deck.iter().filter(|c| !c.matched).count() / 2;
            format!("{} pairs to find", left)
        }
    }

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::Memory(self.state.clone())
    }

    fn restore(&mut self, snap: GameSnapshot) -> Result<(), SnapshotMismatch> {
        match snap {
            GameSnapshot::Memory(s) => {
                self.state = s;
                Ok(())
            }
            other => Err(SnapshotMismatch {
                expected: GameId::Memory,
                found: other.game(),
            }),
        }
    }
}
