use crossterm::event::{poll, read, Event, KeyCode};
use crossterm::terminal;
use log::{debug, warn};
use std::collections::HashMap;
use std::io;
use std::time::Duration;

pub const KEY_COUNT: usize = 16;

/// map of keyboard characters to the hex keypad, using the left-hand side of
/// a qwerty keyboard:
///   1 2 3 4      1 2 3 C
///   q w e r  =>  4 5 6 D
///   a s d f      7 8 9 E
///   z x c v      A 0 B F
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// The 16-key hex keypad as the CPU sees it
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; KEY_COUNT],
}

impl Keypad {
    pub fn new() -> Self {
        Keypad::default()
    }

    /// out-of-range keys are ignored
    pub fn key_down(&mut self, key: u8) {
        if let Some(k) = self.keys.get_mut(key as usize) {
            *k = true;
        }
    }

    pub fn key_up(&mut self, key: u8) {
        if let Some(k) = self.keys.get_mut(key as usize) {
            *k = false;
        }
    }

    /// only the low nibble counts, as on the VIP
    pub fn is_down(&self, key: u8) -> bool {
        self.keys[(key & 0x0f) as usize]
    }

    /// lowest-numbered key that is down
    pub fn first_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|&k| k).map(|k| k as u8)
    }

    /// take the first pressed key, releasing it so it isn't seen twice
    pub fn consume_first_pressed(&mut self) -> Option<u8> {
        let key = self.first_pressed()?;
        self.key_up(key);
        Some(key)
    }

    pub fn release_all(&mut self) {
        self.keys = [false; KEY_COUNT];
    }
}

/// what the front-end wants after polling for input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// reads keypresses and applies them to the keypad
pub trait Input {
    /// apply whatever has happened since the last poll
    fn poll(&mut self, keypad: &mut Keypad) -> Result<Control, io::Error>;
}

/// Terminals only report key presses (and repeats), never releases, so a
/// key is held for a few frames after its last press event.
const TERM_HOLD_FRAMES: u8 = 6;

/// keyboard input from the terminal, using crossterm
pub struct TermInput {
    keymap: HashMap<char, u8>,
    held: [u8; KEY_COUNT],
}

impl TermInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            held: [0; KEY_COUNT],
        })
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("couldn't leave raw mode: {}", e);
        }
    }
}

impl Input for TermInput {
    fn poll(&mut self, keypad: &mut Keypad) -> Result<Control, io::Error> {
        for (key, frames) in self.held.iter_mut().enumerate() {
            if *frames > 0 {
                *frames -= 1;
                if *frames == 0 {
                    keypad.key_up(key as u8);
                }
            }
        }
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                match evt.code {
                    KeyCode::Esc => return Ok(Control::Quit),
                    KeyCode::Char(c) => match self.keymap.get(&c.to_ascii_lowercase()) {
                        Some(&mapped_key) => {
                            keypad.key_down(mapped_key);
                            self.held[mapped_key as usize] = TERM_HOLD_FRAMES;
                        }
                        None => debug!("can't map {:?} to a keypad key", c),
                    },
                    other => debug!("ignoring key {:?}", other),
                }
            }
        }
        Ok(Control::Continue)
    }
}

/// dummy Input implementation for testing: presses the given keys on the
/// first poll and quits after `polls` polls
pub struct DummyInput {
    keys: Vec<u8>,
    polls: usize,
}

impl DummyInput {
    pub fn new(keys: &[u8], polls: usize) -> Self {
        DummyInput {
            keys: Vec::from(keys),
            polls,
        }
    }
}

impl Input for DummyInput {
    fn poll(&mut self, keypad: &mut Keypad) -> Result<Control, io::Error> {
        for key in self.keys.drain(..) {
            keypad.key_down(key);
        }
        if self.polls == 0 {
            return Ok(Control::Quit);
        }
        self.polls -= 1;
        Ok(Control::Continue)
    }
}
