use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// How long a key counts as held after its last press or repeat when the
/// terminal does not report releases.
const HOLD_TIMEOUT: Duration = Duration::from_millis(150);

/// Logical keys the games react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Confirm,
    Cancel,
    Rotate,
    /// Hard drop in the block game, serve/pause in the paddle game.
    Space,
    Digit(u8),
}

/// Controller buttons. Gamepads number these 0, 1, 4, 5, 6 and 7.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    LeftShoulder,
    RightShoulder,
    /// Button 6, the "-" key. Reserved for returning to the launcher.
    Select,
    Start,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Window close / Ctrl+C.
    Quit,
    Key(Key),
    Button(Button),
    /// D-pad motion, y = 1 is up.
    // Only controller backends produce hat motion; the terminal reports
    // arrows as keys.
    #[allow(dead_code)]
    Hat(i8, i8),
}

/// Continuous input sampled once per frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputState {
    pub held: Vec<Key>,
    /// Left stick, each in [-1, 1]; axis 1 positive is down.
    pub axes: [f32; 2],
    pub hat: (i8, i8),
}

impl InputState {
    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }
}

/// Input devices a game module borrows for its lifetime.
pub trait InputDevices {
    /// Drains pending events without blocking.
    fn poll(&mut self) -> io::Result<Vec<InputEvent>>;
    fn state(&self) -> InputState;
}

pub struct CrosstermInput {
    held: HashMap<Key, Instant>,
}

impl CrosstermInput {
    pub fn new() -> Self {
        Self {
            held: HashMap::new(),
        }
    }

    /// Drops keys whose last press or repeat is `HOLD_TIMEOUT` old.
    fn expire_held(&mut self, now: Instant) {
        self.held.retain(|_, at| now.duration_since(*at) < HOLD_TIMEOUT);
    }

    fn on_key(&mut self, key: KeyEvent) -> Option<InputEvent> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(InputEvent::Quit);
        }
        let mapped = map_key(key.code)?;
        match key.kind {
            KeyEventKind::Release => {
                if let InputEvent::Key(k) = mapped {
                    self.held.remove(&k);
                }
                None
            }
            KeyEventKind::Press | KeyEventKind::Repeat => {
                if let InputEvent::Key(k) = mapped {
                    self.held.insert(k, Instant::now());
                }
                Some(mapped)
            }
        }
    }
}

impl InputDevices for CrosstermInput {
    fn poll(&mut self) -> io::Result<Vec<InputEvent>> {
        let mut events = Vec::new();
        while event::poll(Duration::ZERO)? {
            if let crossterm::event::Event::Key(key) = event::read()? {
                if let Some(ev) = self.on_key(key) {
                    events.push(ev);
                }
            }
        }
        self.expire_held(Instant::now());
        Ok(events)
    }

    fn state(&self) -> InputState {
        InputState {
            held: self.held.keys().copied().collect(),
            ..InputState::default()
        }
    }
}

fn map_key(code: KeyCode) -> Option<InputEvent> {
    let key = match code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Key::Up,
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Key::Down,
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Key::Left,
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Key::Right,
        KeyCode::Enter => Key::Confirm,
        KeyCode::Esc => Key::Cancel,
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char('x') | KeyCode::Char('X') | KeyCode::Char('z') | KeyCode::Char('Z') => {
            Key::Rotate
        }
        KeyCode::Char(c @ '0'..='9') => Key::Digit(c as u8 - b'0'),
        // Terminal stand-ins for controller buttons
        KeyCode::Char('-') => return Some(InputEvent::Button(Button::Select)),
        KeyCode::Char('p') | KeyCode::Char('P') => return Some(InputEvent::Button(Button::Start)),
        KeyCode::Char('[') => return Some(InputEvent::Button(Button::LeftShoulder)),
        KeyCode::Char(']') => return Some(InputEvent::Button(Button::RightShoulder)),
        KeyCode::Char('j') | KeyCode::Char('J') => return Some(InputEvent::Button(Button::A)),
        KeyCode::Char('k') | KeyCode::Char('K') => return Some(InputEvent::Button(Button::B)),
        _ => return None,
    };
    Some(InputEvent::Key(key))
}

/// Replays a fixed list of per-frame event batches. Once the script runs
/// out it reports `Quit`, so a headless run always terminates.
#[cfg(test)]
pub struct ScriptedInput {
    frames: std::collections::VecDeque<Vec<InputEvent>>,
    pub state: InputState,
}

#[cfg(test)]
impl ScriptedInput {
    pub fn new(frames: Vec<Vec<InputEvent>>) -> Self {
        Self {
            frames: frames.into(),
            state: InputState::default(),
        }
    }
}

#[cfg(test)]
impl InputDevices for ScriptedInput {
    fn poll(&mut self) -> io::Result<Vec<InputEvent>> {
        Ok(self.frames.pop_front().unwrap_or_else(|| vec![InputEvent::Quit]))
    }

    fn state(&self) -> InputState {
        self.state.clone()
    }
}
