/// Grid Snake. Single-agent, timer-driven: the shell delivers `Tick` at the
/// configured cadence and the snake advances one cell per tick.
///
/// Movement is deliberately wrap-free — hitting a wall is lethal, unlike the
/// cyclic cursor convention every other game uses.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::games::{
    Action, CellView, Engine, GameId, GameSnapshot, Outcome, SnapshotMismatch, Tone,
};
use crate::grid::Dir;

/// Bounded attempts for food placement before the documented fallback to
/// the origin. A rare, harmless visual artifact — never an infinite loop.
const FOOD_ATTEMPTS: usize = 64;

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SnakeState {
    pub rows: usize,
    pub cols: usize,
    /// Occupied cells, head first.
    pub snake: Vec<(usize, usize)>,
    pub dir: Dir,
    pub food: (usize, usize),
    pub score: i32,
    pub dead: bool,
    pub paused: bool,
    pub tick_ms: u64,
    pub food_reward: i32,
}

pub fn create<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    tick_ms: u64,
    food_reward: i32,
    rng: &mut R,
) -> SnakeState {
    let (r, c) = (rows / 2, cols / 2);
    let snake = vec![(r, c + 1), (r, c), (r, c - 1)];
    let food = spawn_food(rows, cols, &snake, rng);
    SnakeState {
        rows,
        cols,
        snake,
        dir: Dir::Right,
        food,
        score: 0,
        dead: false,
        paused: false,
        tick_ms,
        food_reward,
    }
}

fn spawn_food<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    snake: &[(usize, usize)],
    rng: &mut R,
) -> (usize, usize) {
    for _ in 0..FOOD_ATTEMPTS {
        let cell = (rng.gen_range(0..rows), rng.gen_range(0..cols));
        if !snake.contains(&cell) {
            return cell;
        }
    }
    (0, 0)
}

/// Pure transition. `Move` is a relative turn: the requested absolute
/// direction rotates the heading ±90°; same or opposite direction is a
/// no-op. Reversal into the body is not forbidden here — only the next
/// `Tick`'s collision check kills.
pub fn transition<R: Rng + ?Sized>(s: &SnakeState, action: Action, rng: &mut R) -> SnakeState {
    match action {
        Action::Move(d) => turned(s, d),
        Action::TogglePause => {
            if s.dead {
                s.clone()
            } else {
                SnakeState { paused: !s.paused, ..s.clone() }
            }
        }
        Action::Tick => tick(s, rng),
        Action::Reset => SnakeState {
            score: s.score,
            ..create(s.rows, s.cols, s.tick_ms, s.food_reward, rng)
        },
        Action::Activate => s.clone(),
    }
}

fn turned(s: &SnakeState, want: Dir) -> SnakeState {
    if s.dead || s.paused {
        return s.clone();
    }
    let dir = if want == s.dir.turn_left() {
        s.dir.turn_left()
    } else if want == s.dir.turn_right() {
        s.dir.turn_right()
    } else {
        s.dir // same or opposite heading: ignored
    };
    SnakeState { dir, ..s.clone() }
}

fn tick<R: Rng + ?Sized>(s: &SnakeState, rng: &mut R) -> SnakeState {
    if s.dead || s.paused {
        return s.clone();
    }

    let (hr, hc) = s.snake[0];
    let (dr, dc) = s.dir.delta();
    let (nr, nc) = (hr as i32 + dr, hc as i32 + dc);

    // Wall hit is lethal: no wrap here.
    if nr < 0 || nc < 0 || nr as usize >= s.rows || nc as usize >= s.cols {
        return SnakeState { dead: true, ..s.clone() };
    }
    let head = (nr as usize, nc as usize);
    if s.snake.contains(&head) {
        return SnakeState { dead: true, ..s.clone() };
    }

    let mut next = s.clone();
    next.snake.insert(0, head);
    if head == s.food {
        next.score += next.food_reward;
        next.food = spawn_food(next.rows, next.cols, &next.snake, rng);
    } else {
        next.snake.pop(); // constant-length movement
    }
    next
}

// ── Engine wrapper ──

pub struct Snake {
    state: SnakeState,
}

impl Snake {
    pub fn create(cfg: &GameConfig, rng: &mut dyn rand::RngCore) -> Self {
        Snake {
            state: create(
                cfg.boards.snake_size,
                cfg.boards.snake_size,
                cfg.timing.snake_tick_ms,
                cfg.scoring.snake_food,
                rng,
            ),
        }
    }
}

impl Engine for Snake {
    fn id(&self) -> GameId {
        GameId::Snake
    }

    fn title(&self) -> &'static str {
        "Snake"
    }

    fn size(&self) -> usize {
        self.state.rows
    }

    fn cursor(&self) -> Option<(usize, usize)> {
        None
    }

    fn apply(&mut self, action: Action, rng: &mut dyn rand::RngCore) {
        self.state = transition(&self.state, action, rng);
    }

    fn view(&self, r: usize, c: usize) -> CellView {
        let cell = (r, c);
        if self.state.snake.first() == Some(&cell) {
            let tone = if self.state.dead { Tone::Danger } else { Tone::Player };
            CellView { glyph: '@', tone, highlighted: false }
        } else if self.state.snake.contains(&cell) {
            CellView { glyph: 'o', tone: Tone::Player, highlighted: false }
        } else if cell == self.state.food {
            CellView { glyph: '*', tone: Tone::Accent, highlighted: false }
        } else {
            CellView::EMPTY
        }
    }

    fn outcome(&self) -> Outcome {
        if self.state.dead {
            Outcome::Loss
        } else {
            Outcome::Ongoing
        }
    }

    fn score(&self) -> i32 {
        self.state.score
    }

    fn tick_interval(&self) -> Option<std::time::Duration> {
        if self.state.dead || self.state.paused {
            None
        } else {
            Some(std::time::Duration::from_millis(self.state.tick_ms))
        }
    }

    fn status_line(&self) -> String {
        if self.state.dead {
            "Crashed! [Enter] new run".into()
        } else if self.state.paused {
            "Paused — [p] resume".into()
        } else {
            format!("Length {} — [p] pause", self.state.snake.len())
        }
    }

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::Snake(self.state.clone())
    }

    fn restore(&mut self, snap: GameSnapshot) -> Result<(), SnapshotMismatch> {
        match snap {
            GameSnapshot::Snake(s) => {
                self.state = s;
                Ok(())
            }
            other => Err(SnapshotMismatch {
                expected: GameId::Snake,
                found: other.game(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn state_5x5() -> SnakeState {
        // Head at (2,3) moving right, body trailing left.
        SnakeState {
            rows: 5,
            cols: 5,
            snake: vec![(2, 3), (2, 2), (2, 1)],
            dir: Dir::Right,
            food: (0, 0),
            score: 0,
            dead: false,
            paused: false,
            tick_ms: 140,
            food_reward: 10,
        }
    }

    #[test]
    fn eating_food_grows_and_rescores() {
        let mut s = state_5x5();
        s.food = (2, 4); // directly ahead
        let mut rng = SmallRng::seed_from_u64(9);
        let next = tick(&s, &mut rng);
        assert_eq!(next.snake.len(), 4);
        assert_eq!(next.score, 10);
        assert!(!next.snake.contains(&next.food));
    }

    #[test]
    fn plain_tick_keeps_length() {
        let s = state_5x5();
        let mut rng = SmallRng::seed_from_u64(9);
        let next = tick(&s, &mut rng);
        assert_eq!(next.snake.len(), 3);
        assert_eq!(next.snake[0], (2, 4));
        assert_eq!(next.score, 0);
    }

    #[test]
    fn wall_is_lethal_no_wrap() {
        let mut s = state_5x5();
        s.snake = vec![(2, 4), (2, 3), (2, 2)];
        let mut rng = SmallRng::seed_from_u64(9);
        let next = tick(&s, &mut rng);
        assert!(next.dead);
        // board untouched by death
        assert_eq!(next.snake, s.snake);
    }

    #[test]
    fn self_collision_is_lethal() {
        let mut s = state_5x5();
        // A hook: heading up into our own body.
        s.snake = vec![(2, 2), (3, 2), (3, 3), (2, 3), (1, 3)];
        s.dir = Dir::Right;
        let mut rng = SmallRng::seed_from_u64(9);
        let next = tick(&s, &mut rng);
        assert!(next.dead);
    }

    #[test]
    fn move_is_a_relative_turn() {
        let s = state_5x5(); // heading Right
        let mut rng = SmallRng::seed_from_u64(9);
        assert_eq!(transition(&s, Action::Move(Dir::Up), &mut rng).dir, Dir::Up);
        assert_eq!(transition(&s, Action::Move(Dir::Down), &mut rng).dir, Dir::Down);
        // same and opposite heading are ignored
        assert_eq!(transition(&s, Action::Move(Dir::Right), &mut rng).dir, Dir::Right);
        assert_eq!(transition(&s, Action::Move(Dir::Left), &mut rng).dir, Dir::Right);
    }

    #[test]
    fn pause_blocks_ticks_but_not_death_state() {
        let mut s = state_5x5();
        s.paused = true;
        let mut rng = SmallRng::seed_from_u64(9);
        let next = tick(&s, &mut rng);
        assert_eq!(next, s);

        let mut dead = state_5x5();
        dead.dead = true;
        let after = transition(&dead, Action::TogglePause, &mut rng);
        assert_eq!(after, dead); // a dead snake stays exactly as it died
    }

    #[test]
    fn dead_snake_is_frozen_until_reset() {
        let mut s = state_5x5();
        s.dead = true;
        s.score = 30;
        let mut rng = SmallRng::seed_from_u64(9);
        assert_eq!(tick(&s, &mut rng), s);
        assert_eq!(transition(&s, Action::Move(Dir::Up), &mut rng), s);

        let fresh = transition(&s, Action::Reset, &mut rng);
        assert!(!fresh.dead);
        assert_eq!(fresh.snake.len(), 3);
        assert_eq!(fresh.score, 30); // session score carries over
    }

    #[test]
    fn dead_head_is_shown_as_danger() {
        let mut s = state_5x5();
        let e = Snake { state: s.clone() };
        assert_eq!(e.view(2, 3).tone, Tone::Player);

        s.dead = true;
        let e = Snake { state: s };
        assert_eq!(e.view(2, 3).tone, Tone::Danger);
        assert_eq!(e.view(2, 2).tone, Tone::Player); // body keeps its tone
    }

    #[test]
    fn created_snake_is_centered_heading_right() {
        let mut rng = SmallRng::seed_from_u64(1);
        let s = create(15, 15, 140, 10, &mut rng);
        assert_eq!(s.snake, vec![(7, 8), (7, 7), (7, 6)]);
        assert_eq!(s.dir, Dir::Right);
        assert!(!s.snake.contains(&s.food));
    }

    #[test]
    fn food_fallback_when_board_is_full() {
        // Snake covering the whole 2x2 board: rejection sampling must give
        // up and fall back to the origin instead of looping.
        let snake = vec![(0, 0), (0, 1), (1, 0), (1, 1)];
        let mut rng = SmallRng::seed_from_u64(5);
        assert_eq!(spawn_food(2, 2, &snake, &mut rng), (0, 0));
    }

    #[test]
    fn tick_is_pure_under_fixed_seed() {
        let mut s = state_5x5();
        s.food = (2, 4);
        let a = tick(&s, &mut SmallRng::seed_from_u64(77));
        let b = tick(&s, &mut SmallRng::seed_from_u64(77));
        assert_eq!(a, b);
    }
}
