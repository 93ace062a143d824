/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory, the CWD, or the XDG
/// data dir. Every key has a default, so a missing or partial file is fine;
/// a malformed file logs a warning and falls back to defaults entirely.

use std::path::PathBuf;

use serde::Deserialize;

use crate::games::Scoring;

// ── Public config ──

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub scoring: ScoringConfig,
    pub boards: BoardConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Snake movement cadence.
    pub snake_tick_ms: u64,
    /// Delay before two mismatched Memory cards flip back. A tuning value,
    /// not a rule — hence configurable.
    pub flip_back_ms: u64,
    /// Session time limit shown on the HUD; 0 = untimed.
    pub time_limit_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub tictactoe: Scoring,
    /// Single canonical table shared by both Caro presets.
    pub caro: Scoring,
    pub snake_food: i32,
    pub cascade_per_cell: i32,
    pub memory_match: i32,
    pub memory_complete: i32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub caro_mini_size: usize,
    pub caro_mini_win: usize,
    pub caro_size: usize,
    pub caro_win: usize,
    pub snake_size: usize,
    pub cascade_size: usize,
    pub cascade_colors: u8,
    pub memory_size: usize,
}

// ── Defaults ──

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            snake_tick_ms: 140,
            flip_back_ms: 650,
            time_limit_secs: 0,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            tictactoe: Scoring { win: 100, loss: -10, draw: 20 },
            caro: Scoring { win: 200, loss: -20, draw: 30 },
            snake_food: 10,
            cascade_per_cell: 5,
            memory_match: 20,
            memory_complete: 50,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            caro_mini_size: 10,
            caro_mini_win: 4,
            caro_size: 15,
            caro_win: 5,
            snake_size: 15,
            cascade_size: 9,
            cascade_colors: 5,
            memory_size: 4,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load `config.toml`, searching the candidate dirs in order.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        for dir in candidate_dirs() {
            let path = dir.join("config.toml");
            if !path.exists() {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<GameConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e,
                            "config.toml parse error, using defaults");
                        return GameConfig::default();
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e,
                        "could not read config.toml");
                }
            }
        }
        GameConfig::default()
    }
}

/// Candidate directories: exe dir, CWD, XDG data home (deduplicated).
/// Shared with the save module so saves and config live together.
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so a system-installed binary still finds its data.
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

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/gridarcade");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}
