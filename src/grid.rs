/// Grid and coordinate utilities shared by every engine.
///
/// All boards are square and addressed either as (row, col) pairs or as a
/// flat index `i = row * size + col`. Cursor arithmetic is cyclic: moving
/// off one edge reappears on the opposite edge, so a cursor is always in
/// bounds by construction. Smaller logical boards (Memory, the selection
/// row) are centered inside the shared physical grid via `center_offset`.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Side length of the shared physical grid. Large enough to host the
/// biggest logical board (Caro 15×15); everything smaller is centered.
pub const PHYS_SIZE: usize = 15;

// ── Index / bounds ──

#[inline]
pub fn idx(size: usize, r: usize, c: usize) -> usize {
    r * size + c
}

#[inline]
pub fn in_bounds(size: usize, r: i32, c: i32) -> bool {
    r >= 0 && c >= 0 && (r as usize) < size && (c as usize) < size
}

/// Wrap `n` into `[0, size)`. Total for any `n`, including negatives.
#[inline]
pub fn wrap(n: i32, size: usize) -> usize {
    let s = size as i32;
    (((n % s) + s) % s) as usize
}

/// Offset that centers a board of side `inner` inside one of side `outer`.
#[inline]
pub fn center_offset(outer: usize, inner: usize) -> usize {
    outer.saturating_sub(inner) / 2
}

// ── Directions ──

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    /// (row delta, col delta)
    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (-1, 0),
            Dir::Down => (1, 0),
            Dir::Left => (0, -1),
            Dir::Right => (0, 1),
        }
    }

    /// 90° counter-clockwise.
    pub fn turn_left(self) -> Dir {
        match self {
            Dir::Up => Dir::Left,
            Dir::Left => Dir::Down,
            Dir::Down => Dir::Right,
            Dir::Right => Dir::Up,
        }
    }

    /// 90° clockwise.
    pub fn turn_right(self) -> Dir {
        match self {
            Dir::Up => Dir::Right,
            Dir::Right => Dir::Down,
            Dir::Down => Dir::Left,
            Dir::Left => Dir::Up,
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// Move (r, c) one step in `dir`, wrapping around the board edges.
#[inline]
pub fn step_wrapped(size: usize, r: usize, c: usize, dir: Dir) -> (usize, usize) {
    let (dr, dc) = dir.delta();
    (wrap(r as i32 + dr, size), wrap(c as i32 + dc, size))
}

// ── Randomness ──
//
// Engines never own an RNG. Every transition that needs randomness takes
// `&mut R where R: Rng + ?Sized`, so the shell passes its SmallRng and
// tests pass a seeded one for reproducible outcomes.

/// Uniform draw in `[0, n)`. `n` must be > 0.
#[inline]
pub fn rand_index<R: Rng + ?Sized>(rng: &mut R, n: usize) -> usize {
    rng.gen_range(0..n)
}

/// Collapse one column after a match clear: surviving values drop to the
/// bottom, the vacated top is refilled with fresh random values drawn from
/// `[0, palette)`. `cells` is ordered top-to-bottom; `None` = cleared.
pub fn collapse_column<R: Rng + ?Sized>(
    cells: &[Option<u8>],
    rng: &mut R,
    palette: u8,
) -> Vec<u8> {
    let survivors: Vec<u8> = cells.iter().filter_map(|&v| v).collect();
    let missing = cells.len() - survivors.len();
    let mut out = Vec::with_capacity(cells.len());
    for _ in 0..missing {
        out.push(rng.gen_range(0..palette));
    }
    out.extend(survivors);
    out
}
