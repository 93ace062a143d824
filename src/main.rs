/// Entry point and frame loop.
///
/// The loop is single-threaded and cooperative: drain input, run meta keys,
/// forward game actions to the host, fire the game timer if its deadline
/// passed, then render. All game state changes go through engine
/// transitions; the shell only owns the clock, the timer deadline, and the
/// save/session plumbing.

mod config;
mod games;
mod grid;
mod host;
mod save;
mod session;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::warn;

use config::GameConfig;
use games::build_registry;
use host::{Host, Mode};
use save::{SavePayload, SaveStore};
use session::{NullSink, SessionLog, SessionSink, SessionTracker};
use ui::input::InputState;
use ui::renderer::{Hud, Renderer};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const MESSAGE_TTL: Duration = Duration::from_secs(2);

const KEYS_BACK: &[KeyCode] = &[KeyCode::Esc, KeyCode::Backspace];
const KEYS_HELP: &[KeyCode] = &[KeyCode::Char('h'), KeyCode::Char('H'), KeyCode::F(1)];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

fn main() {
    let config = GameConfig::load();
    let store = SaveStore::open_default();
    init_logging(&store);

    let mut sink: Box<dyn SessionSink> = match SessionLog::open(&store.dir().join("sessions.jsonl"))
    {
        Ok(log) => Box::new(log),
        Err(e) => {
            warn!("session log unavailable, recording disabled: {e}");
            Box::new(NullSink::default())
        }
    };

    let mut rng = SmallRng::from_entropy();
    let mut shell = Shell {
        host: Host::new(build_registry(&config, &mut rng)),
        rng,
        store,
        tracker: SessionTracker::default(),
        config,
        clock_base: 0,
        play_started: Instant::now(),
        next_tick: None,
        was_playing: false,
        help_visible: false,
        message: None,
        message_until: Instant::now(),
    };

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = shell.run(&mut renderer, sink.as_mut());

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Grid Arcade!");
    println!("Final score: {}", shell.host.total_score());
}

/// Logging goes to a file in the data directory; stdout belongs to the
/// renderer while raw mode is active.
fn init_logging(store: &SaveStore) {
    let path = store.dir().join("gridarcade.log");
    let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Arc::new(file))
        .with_ansi(false)
        .try_init();
}

struct Shell {
    host: Host,
    rng: SmallRng,
    store: SaveStore,
    tracker: SessionTracker,
    config: GameConfig,
    /// Seconds already on the clock when the current play entry began
    /// (nonzero after loading a save).
    clock_base: u64,
    play_started: Instant,
    /// Deadline of the next game tick, if the active engine wants one.
    next_tick: Option<Instant>,
    /// Host mode on the previous frame; a Select→Play edge is a new entry.
    was_playing: bool,
    help_visible: bool,
    message: Option<String>,
    message_until: Instant,
}

impl Shell {
    fn run(
        &mut self,
        renderer: &mut Renderer,
        sink: &mut dyn SessionSink,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut input = InputState::new();

        loop {
            input.drain_events();
            if input.ctrl_c_pressed() {
                break;
            }

            if let Some(slot) = input.take_submitted() {
                if !slot.is_empty() {
                    self.save_to(&slot);
                }
            }
            if !input.is_capturing() {
                if self.handle_meta(&mut input, sink) {
                    break;
                }
                for action in input.actions() {
                    self.host.handle(action, &mut self.rng);
                }
            }

            self.run_timer();
            self.track_session(sink);
            self.expire_message();

            let hud = Hud {
                total_score: self.host.total_score(),
                elapsed_seconds: self.elapsed_seconds(),
                time_limit_seconds: self.config.timing.time_limit_secs,
                help_visible: self.help_visible,
                message: self.message.as_deref(),
                prompt: input.is_capturing().then(|| input.capture_text()),
            };
            renderer.render(&self.host, &hud)?;
            std::thread::sleep(FRAME_SLEEP);
        }

        Ok(())
    }

    /// Shell-level keys. Returns true to quit.
    fn handle_meta(&mut self, input: &mut InputState, sink: &mut dyn SessionSink) -> bool {
        if input.any_pressed(KEYS_HELP) {
            self.help_visible = !self.help_visible;
            return false;
        }

        match self.host.mode() {
            Mode::Select => {
                if input.any_pressed(KEYS_QUIT) || input.any_pressed(KEYS_BACK) {
                    return true;
                }
            }
            Mode::Play => {
                if input.any_pressed(KEYS_BACK) {
                    self.host.back(&mut self.rng);
                    self.tracker.on_leave();
                    self.next_tick = None;
                    return false;
                }
                // F2: save under a typed name
                if input.any_pressed(&[KeyCode::F(2)]) {
                    input.begin_capture();
                    return false;
                }
                // F5-F8: save slot 1-4, F9-F12: load slot 1-4
                for slot in 1..=4u8 {
                    if input.any_pressed(&[KeyCode::F(slot + 4)]) {
                        self.save_to(&slot.to_string());
                        return false;
                    }
                    if input.any_pressed(&[KeyCode::F(slot + 8)]) {
                        self.load_from(&slot.to_string(), sink);
                        return false;
                    }
                }
            }
        }
        false
    }

    fn save_to(&mut self, slot: &str) {
        let Some(state) = self.host.snapshot_active() else {
            return;
        };
        let payload = SavePayload {
            time_seconds: self.elapsed_seconds(),
            time_limit_seconds: self.config.timing.time_limit_secs,
            state,
        };
        match self.store.save(slot, &payload) {
            Ok(()) => self.set_message(format!("Saved slot {slot}")),
            Err(e) => {
                warn!("save failed: {e}");
                self.set_message("Save failed!".to_string());
            }
        }
    }

    fn load_from(&mut self, slot: &str, sink: &mut dyn SessionSink) {
        let game = self.host.active().id();
        let Some(payload) = self.store.load(game, slot) else {
            let known = self.store.list(game);
            if known.is_empty() {
                self.set_message(format!("Slot {slot} is empty"));
            } else {
                let names: Vec<&str> = known.iter().map(|e| e.slot.as_str()).collect();
                self.set_message(format!("Slot {slot} is empty; saved: {}", names.join(", ")));
            }
            return;
        };
        match self.host.restore(payload.state) {
            Ok(()) => {
                // A loaded game is a new play entry: fresh session, resumed clock.
                self.tracker.on_leave();
                self.was_playing = false;
                self.track_session(sink);
                self.clock_base = payload.time_seconds;
                self.play_started = Instant::now();
                self.next_tick = None;
                self.set_message(format!("Loaded slot {slot}"));
            }
            Err(e) => {
                warn!("restore failed: {e}");
                self.set_message("Load failed!".to_string());
            }
        }
    }

    /// Fire the active engine's tick when its deadline passes. The deadline
    /// is dropped whenever no tick is wanted, so leaving a game or pausing
    /// cancels the timer instead of ticking a discarded board.
    fn run_timer(&mut self) {
        let Some(interval) = self.host.tick_interval() else {
            self.next_tick = None;
            return;
        };
        let now = Instant::now();
        match self.next_tick {
            None => self.next_tick = Some(now + interval),
            Some(deadline) if now >= deadline => {
                self.host.handle(games::Action::Tick, &mut self.rng);
                // re-read: the tick may have changed the wanted cadence
                self.next_tick = self.host.tick_interval().map(|iv| now + iv);
            }
            Some(_) => {}
        }
    }

    /// Entry is the Play-mode edge, tracked with its own flag: a failed
    /// `start_session` must not re-arm the clock reset or retry every frame.
    fn track_session(&mut self, sink: &mut dyn SessionSink) {
        let playing = self.host.mode() == Mode::Play;
        let entering = playing && !self.was_playing;
        self.was_playing = playing;
        if !playing {
            return;
        }
        if entering {
            self.clock_base = 0;
            self.play_started = Instant::now();
            let engine = self.host.active();
            let snap = engine.snapshot();
            self.tracker.on_enter(sink, engine.id(), "play", &snap);
        }
        let engine = self.host.active();
        self.tracker.on_outcome(
            sink,
            engine.outcome(),
            engine.score(),
            self.elapsed_seconds(),
        );
    }

    fn elapsed_seconds(&self) -> u64 {
        match self.host.mode() {
            Mode::Select => 0,
            Mode::Play => self.clock_base + self.play_started.elapsed().as_secs(),
        }
    }

    fn set_message(&mut self, text: String) {
        self.message = Some(text);
        self.message_until = Instant::now() + MESSAGE_TTL;
    }

    fn expire_message(&mut self) {
        if self.message.is_some() && Instant::now() >= self.message_until {
            self.message = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use games::{Action, GameId, GameSnapshot};
    use session::{SessionError, SessionId, SessionReport};
    use rand::SeedableRng;

    /// A sink whose backend is down; every start fails.
    struct FailingSink {
        starts: usize,
    }

    impl SessionSink for FailingSink {
        fn start_session(
            &mut self,
            _game: GameId,
            _mode: &str,
            _initial: &GameSnapshot,
        ) -> Result<SessionId, SessionError> {
            self.starts += 1;
            Err(SessionError::Io(std::io::Error::other("down")))
        }

        fn finish_session(
            &mut self,
            _id: SessionId,
            _report: SessionReport,
        ) -> Result<(), SessionError> {
            Ok(())
        }
    }

    fn shell(name: &str) -> Shell {
        let config = GameConfig::default();
        let mut rng = SmallRng::seed_from_u64(3);
        let host = Host::new(build_registry(&config, &mut rng));
        let dir = std::env::temp_dir()
            .join(format!("gridarcade_shell_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        Shell {
            host,
            rng,
            store: SaveStore::new(dir),
            tracker: SessionTracker::default(),
            config,
            clock_base: 0,
            play_started: Instant::now(),
            next_tick: None,
            was_playing: false,
            help_visible: false,
            message: None,
            message_until: Instant::now(),
        }
    }

    // The selection cursor starts on the middle launch cell, so a bare
    // Activate enters Play immediately.
    fn enter_play(shell: &mut Shell) {
        shell.host.handle(Action::Activate, &mut shell.rng);
        assert_eq!(shell.host.mode(), Mode::Play);
    }

    #[test]
    fn failed_session_start_does_not_rearm_the_clock() {
        let mut shell = shell("failstart");
        enter_play(&mut shell);

        let mut sink = FailingSink { starts: 0 };
        shell.track_session(&mut sink);
        let armed = shell.play_started;
        std::thread::sleep(Duration::from_millis(15));
        shell.track_session(&mut sink);
        shell.track_session(&mut sink);

        // one start attempt per entry, and the clock keeps running
        assert_eq!(sink.starts, 1);
        assert_eq!(shell.play_started, armed);
    }

    #[test]
    fn reentering_play_is_a_fresh_entry() {
        let mut shell = shell("reenter");
        let mut sink = NullSink::default();
        enter_play(&mut shell);
        shell.track_session(&mut sink);
        shell.clock_base = 41; // pretend time passed

        shell.host.back(&mut shell.rng);
        shell.tracker.on_leave();
        shell.track_session(&mut sink); // Select frame

        enter_play(&mut shell);
        shell.track_session(&mut sink);
        assert_eq!(shell.clock_base, 0);
    }

    #[test]
    fn empty_slot_message_lists_known_saves() {
        let mut shell = shell("slots");
        let mut sink = NullSink::default();
        enter_play(&mut shell);
        shell.save_to("2");

        shell.load_from("9", &mut sink);
        let msg = shell.message.clone().unwrap_or_default();
        assert!(msg.contains("empty"), "got: {msg}");
        assert!(msg.contains("saved: 2"), "got: {msg}");
    }
}
