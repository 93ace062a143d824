/// The engine contract: every game is a pure `{create, transition, view}`
/// triple behind the object-safe `Engine` trait.
///
/// Engines store an immutable state struct and replace it wholesale on each
/// transition (`self.state = transition(&self.state, ...)`), so "transition
/// returns a new state" is enforced structurally, not by convention. The
/// registry is a plain `Vec<Box<dyn Engine>>`: adding a game is one
/// registration, never an id-switch edit across files.

pub mod caro;
pub mod cascade;
pub mod memory;
pub mod snake;
pub mod tictactoe;

use std::time::Duration;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GameConfig;
use crate::grid::Dir;

// ── Action vocabulary ──

/// Abstract actions delivered to an engine. `Back` and `Help` never reach
/// engines; the shell consumes them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    /// Cursor movement. Snake reinterprets this as a relative turn.
    Move(Dir),
    /// Place / pick / flip at the cursor.
    Activate,
    /// Timer-driven advance (Snake movement, Memory flip-back).
    Tick,
    /// Snake only; ignored elsewhere.
    TogglePause,
    /// Return to a fresh `create`. The only action a terminal state accepts.
    Reset,
}

// ── Outcome ──

/// Terminal marker. Once a state reports anything but `Ongoing`, every
/// action except `Reset` must leave it unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Outcome {
    Ongoing,
    Win,
    Loss,
    Draw,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        self != Outcome::Ongoing
    }
}

// ── Render projection ──

/// Abstract color token; only the renderer knows actual terminal colors.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tone {
    Dim,
    Neutral,
    Player,
    Cpu,
    Accent,
    Danger,
    /// Cascade palette index, 0..5.
    Palette(u8),
}

/// What one grid cell looks like. Derived solely from engine state plus the
/// cursor — computing a view never mutates anything.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CellView {
    pub glyph: char,
    pub tone: Tone,
    pub highlighted: bool,
}

impl CellView {
    pub const EMPTY: CellView = CellView {
        glyph: '·',
        tone: Tone::Dim,
        highlighted: false,
    };
}

// ── Game identity ──

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameId {
    TicTacToe,
    CaroMini,
    Caro,
    Snake,
    Cascade,
    Memory,
}

impl GameId {
    /// Stable name used in save filenames and session records.
    pub fn slug(self) -> &'static str {
        match self {
            GameId::TicTacToe => "tictactoe",
            GameId::CaroMini => "caro_mini",
            GameId::Caro => "caro",
            GameId::Snake => "snake",
            GameId::Cascade => "cascade",
            GameId::Memory => "memory",
        }
    }

    /// Glyph shown on the launch cell in selection mode.
    pub fn launch_glyph(self) -> char {
        match self {
            GameId::TicTacToe => 'T',
            GameId::CaroMini => 'c',
            GameId::Caro => 'C',
            GameId::Snake => 'S',
            GameId::Cascade => 'M',
            GameId::Memory => 'P',
        }
    }
}

// ── Scoring ──

/// One canonical win/loss/draw table per game, injected at creation from
/// config. Kept inside the state so snapshots restore with the table they
/// were playing under.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Scoring {
    pub win: i32,
    pub loss: i32,
    pub draw: i32,
}

// ── Snapshots ──

/// Serialized engine state, tagged by game. The payload is the engine's
/// state struct verbatim; `Engine::restore` rejects a mismatched variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameSnapshot {
    TicTacToe(tictactoe::TttState),
    CaroMini(caro::CaroState),
    Caro(caro::CaroState),
    Snake(snake::SnakeState),
    Cascade(cascade::CascadeState),
    Memory(memory::MemoryState),
}

impl GameSnapshot {
    pub fn game(&self) -> GameId {
        match self {
            GameSnapshot::TicTacToe(_) => GameId::TicTacToe,
            GameSnapshot::CaroMini(_) => GameId::CaroMini,
            GameSnapshot::Caro(_) => GameId::Caro,
            GameSnapshot::Snake(_) => GameId::Snake,
            GameSnapshot::Cascade(_) => GameId::Cascade,
            GameSnapshot::Memory(_) => GameId::Memory,
        }
    }
}

#[derive(Debug, Error)]
#[error("snapshot for {found:?} does not belong to {expected:?}")]
pub struct SnapshotMismatch {
    pub expected: GameId,
    pub found: GameId,
}

// ── Engine trait ──

/// Object-safe capability set of one game. The shell and host only ever see
/// this interface.
pub trait Engine {
    fn id(&self) -> GameId;
    fn title(&self) -> &'static str;
    /// Side length of the logical board (centered in the physical grid).
    fn size(&self) -> usize;
    /// Cursor in logical coordinates; None for games without one (Snake).
    fn cursor(&self) -> Option<(usize, usize)>;
    fn apply(&mut self, action: Action, rng: &mut dyn RngCore);
    fn view(&self, r: usize, c: usize) -> CellView;
    fn outcome(&self) -> Outcome;
    fn score(&self) -> i32;
    /// Desired timer cadence, if the engine currently wants `Tick`s.
    /// Snake: movement cadence while alive and unpaused. Memory: the
    /// flip-back delay while two mismatched cards are locked open.
    fn tick_interval(&self) -> Option<Duration> {
        None
    }
    /// One-line hint for the HUD.
    fn status_line(&self) -> String;
    fn snapshot(&self) -> GameSnapshot;
    fn restore(&mut self, snap: GameSnapshot) -> Result<(), SnapshotMismatch>;
}

/// Build the full registry, one engine per `GameId`, in launch-row order.
pub fn build_registry(cfg: &GameConfig, rng: &mut dyn RngCore) -> Vec<Box<dyn Engine>> {
    vec![
        Box::new(tictactoe::TicTacToe::create(cfg)),
        Box::new(caro::Caro::create_mini(cfg)),
        Box::new(caro::Caro::create_classic(cfg)),
        Box::new(snake::Snake::create(cfg, rng)),
        Box::new(cascade::Cascade::create(cfg, rng)),
        Box::new(memory::Memory::create(cfg, rng)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn registry_covers_every_game_once() {
        let cfg = GameConfig::default();
        let mut rng = SmallRng::seed_from_u64(0);
        let engines = build_registry(&cfg, &mut rng);
        let ids: Vec<GameId> = engines.iter().map(|e| e.id()).collect();
        assert_eq!(
            ids,
            vec![
                GameId::TicTacToe,
                GameId::CaroMini,
                GameId::Caro,
                GameId::Snake,
                GameId::Cascade,
                GameId::Memory,
            ]
        );
    }

    #[test]
    fn snapshots_round_trip_through_their_engine() {
        let cfg = GameConfig::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut engines = build_registry(&cfg, &mut rng);
        for e in engines.iter_mut() {
            let snap = e.snapshot();
            assert_eq!(snap.game(), e.id());
            e.restore(snap).unwrap();
        }
    }

    #[test]
    fn restore_rejects_foreign_snapshot() {
        let cfg = GameConfig::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut engines = build_registry(&cfg, &mut rng);
        let ttt_snap = engines[0].snapshot();
        let err = engines[3].restore(ttt_snap).unwrap_err();
        assert_eq!(err.expected, GameId::Snake);
        assert_eq!(err.found, GameId::TicTacToe);
    }
}
