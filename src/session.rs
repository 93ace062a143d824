/// Session recording boundary.
///
/// A session is one play attempt: started when a game is entered, finished
/// exactly once when its outcome first turns terminal. Recording is
/// advisory: every failure is logged with `tracing` and swallowed, so
/// gameplay and local scoring proceed identically whether or not the sink
/// works. The idempotence guard lives in `SessionTracker`, not in sinks;
/// the terminal condition is observed on every frame and must only be
/// reported on the first observation.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::games::{GameId, GameSnapshot, Outcome};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session io: {0}")]
    Io(#[from] std::io::Error),
    #[error("session encode: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SessionId(pub u64);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionResult {
    Win,
    Lose,
    Draw,
}

impl SessionResult {
    /// Only terminal outcomes map to a result.
    pub fn from_outcome(o: Outcome) -> Option<SessionResult> {
        match o {
            Outcome::Win => Some(SessionResult::Win),
            Outcome::Loss => Some(SessionResult::Lose),
            Outcome::Draw => Some(SessionResult::Draw),
            Outcome::Ongoing => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SessionReport {
    pub result: SessionResult,
    pub score: i32,
    pub duration_seconds: u64,
}

/// One line of the session log.
#[derive(Serialize, Debug)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Record<'a> {
    Start {
        session: SessionId,
        game: &'a str,
        mode: &'a str,
        state: &'a GameSnapshot,
    },
    Finish {
        session: SessionId,
        #[serde(flatten)]
        report: SessionReport,
    },
}

/// Where session lifecycle calls go. Stands in for the backend API.
/// `mode` names how the game is being played; the shell currently only
/// knows "play".
pub trait SessionSink {
    fn start_session(
        &mut self,
        game: GameId,
        mode: &str,
        initial: &GameSnapshot,
    ) -> Result<SessionId, SessionError>;
    fn finish_session(&mut self, id: SessionId, report: SessionReport) -> Result<(), SessionError>;
}

/// Discards everything; still hands out ids so callers behave identically.
#[derive(Default)]
pub struct NullSink {
    next: u64,
}

impl SessionSink for NullSink {
    fn start_session(
        &mut self,
        _game: GameId,
        _mode: &str,
        _initial: &GameSnapshot,
    ) -> Result<SessionId, SessionError> {
        self.next += 1;
        Ok(SessionId(self.next))
    }

    fn finish_session(&mut self, _id: SessionId, _report: SessionReport) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Appends one JSON object per call to a local file.
pub struct SessionLog {
    file: File,
    next: u64,
}

impl SessionLog {
    pub fn open(path: &Path) -> Result<SessionLog, SessionError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(SessionLog { file, next: 0 })
    }

    fn write(&mut self, record: &Record) -> Result<(), SessionError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        Ok(())
    }
}

impl SessionSink for SessionLog {
    fn start_session(
        &mut self,
        game: GameId,
        mode: &str,
        initial: &GameSnapshot,
    ) -> Result<SessionId, SessionError> {
        self.next += 1;
        let id = SessionId(self.next);
        self.write(&Record::Start {
            session: id,
            game: game.slug(),
            mode,
            state: initial,
        })?;
        Ok(id)
    }

    fn finish_session(&mut self, id: SessionId, report: SessionReport) -> Result<(), SessionError> {
        self.write(&Record::Finish { session: id, report })
    }
}

/// Client-side lifecycle guard: start once per game entry, finish once per
/// terminal state. Sink failures are warned about and dropped.
#[derive(Default)]
pub struct SessionTracker {
    current: Option<SessionId>,
    finished: bool,
}

impl SessionTracker {
    /// Call when PLAY mode begins. A no-op if a session is already open.
    pub fn on_enter(
        &mut self,
        sink: &mut dyn SessionSink,
        game: GameId,
        mode: &str,
        initial: &GameSnapshot,
    ) {
        if self.current.is_some() {
            return;
        }
        match sink.start_session(game, mode, initial) {
            Ok(id) => {
                self.current = Some(id);
                self.finished = false;
            }
            Err(e) => warn!(game = game.slug(), "session start failed: {e}"),
        }
    }

    /// Call on every frame with the current outcome; reports only the first
    /// terminal observation.
    pub fn on_outcome(
        &mut self,
        sink: &mut dyn SessionSink,
        outcome: Outcome,
        score: i32,
        duration_seconds: u64,
    ) {
        if self.finished {
            return;
        }
        let Some(result) = SessionResult::from_outcome(outcome) else {
            return;
        };
        let Some(id) = self.current else {
            return;
        };
        self.finished = true;
        let report = SessionReport { result, score, duration_seconds };
        if let Err(e) = sink.finish_session(id, report) {
            warn!("session finish failed: {e}");
        }
    }

    /// Call when PLAY mode ends; the next entry starts a new session.
    pub fn on_leave(&mut self) {
        self.current = None;
        self.finished = false;
    }
}
