/// Local save slots, keyed by game and slot name.
///
/// One JSON file per (game, slot): the engine snapshot plus the shell's
/// clock, so loading resumes both the board and the session timer. JSON
/// rather than TOML because boards are arrays with empty cells, which TOML
/// cannot represent. A missing or unreadable file is "no save available",
/// never an error the caller must recover from; only writes can fail.

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::games::{GameId, GameSnapshot};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save io: {0}")]
    Io(#[from] std::io::Error),
    #[error("save encode: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What one slot stores.
#[derive(Serialize, Deserialize, Debug)]
pub struct SavePayload {
    pub time_seconds: u64,
    pub time_limit_seconds: u64,
    pub state: GameSnapshot,
}

/// A slot known to exist on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEntry {
    pub slot: String,
    pub modified: SystemTime,
}

pub struct SaveStore {
    dir: PathBuf,
}

impl SaveStore {
    pub fn new(dir: PathBuf) -> SaveStore {
        SaveStore { dir }
    }

    pub fn open_default() -> SaveStore {
        SaveStore { dir: default_dir() }
    }

    /// The data directory; the shell parks its log files next to the saves.
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn path(&self, game: GameId, slot: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.json", game.slug(), sanitize(slot)))
    }

    pub fn save(&self, slot: &str, payload: &SavePayload) -> Result<(), SaveError> {
        let content = serde_json::to_string_pretty(payload)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(payload.state.game(), slot), content)?;
        Ok(())
    }

    /// None means "no save available": missing file and corrupt file alike.
    pub fn load(&self, game: GameId, slot: &str) -> Option<SavePayload> {
        let path = self.path(game, slot);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(path = %path.display(), "unreadable save ignored: {e}");
                None
            }
        }
    }

    /// Slots on disk for one game, most recently written first.
    pub fn list(&self, game: GameId) -> Vec<SaveEntry> {
        let prefix = format!("{}_", game.slug());
        let mut entries: Vec<SaveEntry> = fs::read_dir(&self.dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let slot = name.strip_prefix(&prefix)?.strip_suffix(".json")?;
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some(SaveEntry { slot: slot.to_string(), modified })
            })
            .collect();
        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        entries
    }
}

/// Slot names become filename fragments; keep them boring.
fn sanitize(slot: &str) -> String {
    slot.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

fn default_dir() -> PathBuf {
    // 1. Exe directory when writable (portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            let test_path = parent.join(".write_test_gridarcade");
            if fs::write(&test_path, "").is_ok() {
                let _ = fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home for system installs
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/gridarcade");
        if fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. Fallback to CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe;
    use crate::games::Scoring;

    fn scratch(name: &str) -> SaveStore {
        let dir = std::env::temp_dir()
            .join(format!("gridarcade_save_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        SaveStore::new(dir)
    }

    fn payload(score: i32) -> SavePayload {
        let mut state = tictactoe::create(Scoring { win: 100, loss: -10, draw: 20 });
        state.score = score;
        SavePayload {
            time_seconds: 42,
            time_limit_seconds: 0,
            state: GameSnapshot::TicTacToe(state),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = scratch("roundtrip");
        store.save("quick", &payload(70)).unwrap();

        let loaded = store.load(GameId::TicTacToe, "quick").unwrap();
        assert_eq!(loaded.time_seconds, 42);
        match loaded.state {
            GameSnapshot::TicTacToe(s) => assert_eq!(s.score, 70),
            other => panic!("wrong snapshot variant: {:?}", other),
        }
    }

    #[test]
    fn missing_slot_is_none() {
        let store = scratch("missing");
        assert!(store.load(GameId::Snake, "nothing").is_none());
    }

    #[test]
    fn corrupt_file_is_none_not_error() {
        let store = scratch("corrupt");
        fs::create_dir_all(&store.dir).unwrap();
        fs::write(store.path(GameId::Caro, "bad"), "not = [valid").unwrap();
        assert!(store.load(GameId::Caro, "bad").is_none());
    }

    #[test]
    fn slots_are_keyed_by_game() {
        let store = scratch("keyed");
        store.save("1", &payload(5)).unwrap();
        // Same slot name under a different game id stays empty.
        assert!(store.load(GameId::Memory, "1").is_none());
        assert!(store.load(GameId::TicTacToe, "1").is_some());
    }

    #[test]
    fn list_is_sorted_most_recent_first() {
        let store = scratch("list");
        store.save("older", &payload(1)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        store.save("newer", &payload(2)).unwrap();

        let entries = store.list(GameId::TicTacToe);
        let slots: Vec<&str> = entries.iter().map(|e| e.slot.as_str()).collect();
        assert_eq!(slots, vec!["newer", "older"]);
        assert!(store.list(GameId::Snake).is_empty());
    }

    #[test]
    fn slot_names_are_sanitized() {
        let store = scratch("sanitize");
        store.save("week/1 fun", &payload(3)).unwrap();
        assert!(store.load(GameId::TicTacToe, "week/1 fun").is_some());
        // the file on disk carries no path separator
        let entries = store.list(GameId::TicTacToe);
        assert_eq!(entries[0].slot, "week_1_fun");
    }
}
