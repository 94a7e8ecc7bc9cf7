use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// A keystroke translated into the trainer's input vocabulary. Raw terminal
/// events never leave this module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    /// Printable character, destined for the engine or a text field.
    Char(char),
    Nav(Nav),
    /// Ctrl-C, honored on every screen.
    Interrupt,
    Resize,
    Tick,
}

/// Keys whose meaning is independent of the character set: movement,
/// confirm/dismiss, and the two surface toggles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nav {
    Up,
    Down,
    Left,
    Right,
    Accept,
    Cancel,
    Browse,
    Notes,
    Erase,
}

/// Maps a raw key event onto the vocabulary. Keys with no meaning anywhere
/// in the app are dropped here, as are release events, which would
/// double-count keystrokes on platforms that report them.
pub fn translate_key(key: KeyEvent) -> Option<Input> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Input::Interrupt),
            _ => None,
        };
    }
    let input = match key.code {
        KeyCode::Char(c) => Input::Char(c),
        KeyCode::Up => Input::Nav(Nav::Up),
        KeyCode::Down => Input::Nav(Nav::Down),
        KeyCode::Left => Input::Nav(Nav::Left),
        KeyCode::Right => Input::Nav(Nav::Right),
        KeyCode::Enter => Input::Nav(Nav::Accept),
        KeyCode::Esc => Input::Nav(Nav::Cancel),
        KeyCode::Tab => Input::Nav(Nav::Browse),
        KeyCode::F(2) => Input::Nav(Nav::Notes),
        KeyCode::Backspace => Input::Nav(Nav::Erase),
        _ => return None,
    };
    Some(input)
}

/// Source of translated inputs for the app loop.
pub trait InputSource: Send + 'static {
    /// Block for up to `timeout` waiting for an input.
    fn recv_timeout(&self, timeout: Duration) -> Result<Input, RecvTimeoutError>;
}

/// Reads crossterm events on a background thread and translates them as
/// they arrive.
pub struct CrosstermInputSource {
    rx: Receiver<Input>,
}

impl CrosstermInputSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let input = match event::read() {
                Ok(CtEvent::Key(key)) => match translate_key(key) {
                    Some(input) => input,
                    None => continue,
                },
                Ok(CtEvent::Resize(_, _)) => Input::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(input).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermInputSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for CrosstermInputSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<Input, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-fed source for driving the loop from tests.
pub struct QueuedInputSource {
    rx: Receiver<Input>,
}

impl QueuedInputSource {
    pub fn new(rx: Receiver<Input>) -> Self {
        Self { rx }
    }
}

impl InputSource for QueuedInputSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<Input, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the app one input at a time, yielding `Tick` whenever the tick
/// interval passes with nothing pressed.
pub struct Runner<S: InputSource> {
    source: S,
    tick: Duration,
}

impl<S: InputSource> Runner<S> {
    pub fn new(source: S, tick: Duration) -> Self {
        Self { source, tick }
    }

    pub fn step(&self) -> Input {
        match self.source.recv_timeout(self.tick) {
            Ok(input) => input,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Input::Tick,
        }
    }
}
