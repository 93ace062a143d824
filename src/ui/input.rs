/// Input state tracker and key-to-action mapping.
///
/// Every game in the registry is turn-based from the input's point of view
/// (Snake turns on key press too), so keys are edge-triggered: each
/// Press/Repeat event counts once, and terminal autorepeat gives held-key
/// movement for free.
///
/// A capture mode implements text entry for slot naming: while active,
/// key events build a line buffer and none of the game-key queries fire.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::games::Action;
use crate::grid::Dir;

/// Map one key press to an abstract game action. Arrow keys and WASD move,
/// Enter/Space activates, p pauses, r resets.
pub fn map_action(key: &KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Action::Move(Dir::Up)),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Action::Move(Dir::Down)),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Action::Move(Dir::Left)),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Action::Move(Dir::Right)),
        KeyCode::Enter | KeyCode::Char(' ') => Some(Action::Activate),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(Action::TogglePause),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::Reset),
        _ => None,
    }
}

pub struct InputState {
    /// Key events accepted this frame, in arrival order.
    pressed: Vec<KeyEvent>,
    /// Line buffer while text entry is active.
    capture: Option<String>,
    /// A line finished with Enter, waiting for pickup.
    submitted: Option<String>,
    ctrl_c: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            pressed: Vec::with_capacity(8),
            capture: None,
            submitted: None,
            ctrl_c: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.pressed.clear();
        self.ctrl_c = false;

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.handle_key(key);
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.ctrl_c = true;
            return;
        }
        match &mut self.capture {
            Some(buf) => match key.code {
                KeyCode::Char(c) => buf.push(c),
                KeyCode::Backspace => {
                    buf.pop();
                }
                KeyCode::Enter => {
                    self.submitted = self.capture.take();
                }
                KeyCode::Esc => {
                    self.capture = None;
                }
                _ => {}
            },
            None => self.pressed.push(key),
        }
    }

    /// Was this key pressed this frame? Always false during text entry.
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.pressed.iter().any(|k| k.code == code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Game actions requested this frame, in press order.
    pub fn actions(&self) -> Vec<Action> {
        self.pressed.iter().filter_map(map_action).collect()
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.ctrl_c
    }

    // ── Text entry ──

    pub fn begin_capture(&mut self) {
        self.capture = Some(String::new());
        self.submitted = None;
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    /// Current buffer contents, for rendering the prompt.
    pub fn capture_text(&self) -> &str {
        self.capture.as_deref().unwrap_or("")
    }

    /// The finished line, if Enter was pressed since the last call.
    pub fn take_submitted(&mut self) -> Option<String> {
        self.submitted.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_and_wasd_map_to_moves() {
        assert_eq!(map_action(&press(KeyCode::Up)), Some(Action::Move(Dir::Up)));
        assert_eq!(map_action(&press(KeyCode::Char('a'))), Some(Action::Move(Dir::Left)));
        assert_eq!(map_action(&press(KeyCode::Char('S'))), Some(Action::Move(Dir::Down)));
        assert_eq!(map_action(&press(KeyCode::Enter)), Some(Action::Activate));
        assert_eq!(map_action(&press(KeyCode::Char(' '))), Some(Action::Activate));
        assert_eq!(map_action(&press(KeyCode::Char('p'))), Some(Action::TogglePause));
        assert_eq!(map_action(&press(KeyCode::Esc)), None);
        assert_eq!(map_action(&press(KeyCode::F(5))), None);
    }

    #[test]
    fn presses_accumulate_in_order() {
        let mut input = InputState::new();
        input.handle_key(press(KeyCode::Right));
        input.handle_key(press(KeyCode::Enter));
        assert!(input.was_pressed(KeyCode::Right));
        assert_eq!(
            input.actions(),
            vec![Action::Move(Dir::Right), Action::Activate]
        );
    }

    #[test]
    fn capture_swallows_game_keys() {
        let mut input = InputState::new();
        input.begin_capture();
        input.handle_key(press(KeyCode::Char('w')));
        input.handle_key(press(KeyCode::Char('1')));
        assert!(!input.was_pressed(KeyCode::Char('w')));
        assert!(input.actions().is_empty());
        assert_eq!(input.capture_text(), "w1");
    }

    #[test]
    fn capture_backspace_and_submit() {
        let mut input = InputState::new();
        input.begin_capture();
        for c in "abx".chars() {
            input.handle_key(press(KeyCode::Char(c)));
        }
        input.handle_key(press(KeyCode::Backspace));
        input.handle_key(press(KeyCode::Enter));
        assert_eq!(input.take_submitted(), Some("ab".to_string()));
        assert!(!input.is_capturing());
        // pickup is one-shot
        assert_eq!(input.take_submitted(), None);
    }

    #[test]
    fn capture_escape_cancels() {
        let mut input = InputState::new();
        input.begin_capture();
        input.handle_key(press(KeyCode::Char('z')));
        input.handle_key(press(KeyCode::Esc));
        assert!(!input.is_capturing());
        assert_eq!(input.take_submitted(), None);
    }

    #[test]
    fn ctrl_c_is_detected_even_while_capturing() {
        let mut input = InputState::new();
        input.begin_capture();
        input.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(input.ctrl_c_pressed());
        assert_eq!(input.capture_text(), "");
    }
}
