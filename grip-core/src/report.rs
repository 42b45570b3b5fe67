//! HID boot keyboard report model.
//!
//! Tracks which keys are held across both ports and renders the standard
//! 8-byte boot keyboard report (modifiers, reserved, six key codes). Key
//! codes are HID Usage Table (Keyboard/Keypad page) values for a US layout.

use crate::events::{KeyAction, KeyEvent};
use crate::keymap::{NamedKey, Symbol};
use crate::output::EmitError;
use heapless::Vec;

/// Maximum simultaneously reported non-modifier keys.
pub const MAX_KEYS: usize = 6;

const MOD_LEFT_SHIFT: u8 = 0x02;
const MOD_RIGHT_CTRL: u8 = 0x10;
const MOD_RIGHT_SHIFT: u8 = 0x20;
const MOD_RIGHT_ALT: u8 = 0x40;

/// A symbol translated to HID terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Keystroke {
    /// A modifier bit in the report's first byte.
    Modifier(u8),
    /// A key code, optionally needing shift held with it.
    Key { usage: u8, shifted: bool },
}

impl Keystroke {
    const fn key(usage: u8) -> Self {
        Keystroke::Key { usage, shifted: false }
    }

    const fn shifted(usage: u8) -> Self {
        Keystroke::Key { usage, shifted: true }
    }
}

/// Translate a symbol. Returns `None` for characters outside printable ASCII.
#[must_use]
pub fn keystroke(symbol: Symbol) -> Option<Keystroke> {
    let c = match symbol {
        Symbol::Named(key) => {
            return Some(match key {
                NamedKey::RightArrow => Keystroke::key(0x4F),
                NamedKey::LeftArrow => Keystroke::key(0x50),
                NamedKey::DownArrow => Keystroke::key(0x51),
                NamedKey::UpArrow => Keystroke::key(0x52),
                NamedKey::Return => Keystroke::key(0x28),
                NamedKey::Escape => Keystroke::key(0x29),
                NamedKey::RightShift => Keystroke::Modifier(MOD_RIGHT_SHIFT),
                NamedKey::RightCtrl => Keystroke::Modifier(MOD_RIGHT_CTRL),
                NamedKey::RightAlt => Keystroke::Modifier(MOD_RIGHT_ALT),
            })
        }
        Symbol::Char(c) => c,
    };

    let stroke = match c {
        'a'..='z' => Keystroke::key(0x04 + (c as u8 - b'a')),
        'A'..='Z' => Keystroke::shifted(0x04 + (c as u8 - b'A')),
        '1'..='9' => Keystroke::key(0x1E + (c as u8 - b'1')),
        '0' => Keystroke::key(0x27),
        '!' => Keystroke::shifted(0x1E),
        '@' => Keystroke::shifted(0x1F),
        '#' => Keystroke::shifted(0x20),
        '$' => Keystroke::shifted(0x21),
        '%' => Keystroke::shifted(0x22),
        '^' => Keystroke::shifted(0x23),
        '&' => Keystroke::shifted(0x24),
        '*' => Keystroke::shifted(0x25),
        '(' => Keystroke::shifted(0x26),
        ')' => Keystroke::shifted(0x27),
        ' ' => Keystroke::key(0x2C),
        '-' => Keystroke::key(0x2D),
        '_' => Keystroke::shifted(0x2D),
        '=' => Keystroke::key(0x2E),
        '+' => Keystroke::shifted(0x2E),
        '[' => Keystroke::key(0x2F),
        '{' => Keystroke::shifted(0x2F),
        ']' => Keystroke::key(0x30),
        '}' => Keystroke::shifted(0x30),
        '\\' => Keystroke::key(0x31),
        '|' => Keystroke::shifted(0x31),
        ';' => Keystroke::key(0x33),
        ':' => Keystroke::shifted(0x33),
        '\'' => Keystroke::key(0x34),
        '"' => Keystroke::shifted(0x34),
        '`' => Keystroke::key(0x35),
        '~' => Keystroke::shifted(0x35),
        ',' => Keystroke::key(0x36),
        '<' => Keystroke::shifted(0x36),
        '.' => Keystroke::key(0x37),
        '>' => Keystroke::shifted(0x37),
        '/' => Keystroke::key(0x38),
        '?' => Keystroke::shifted(0x38),
        _ => return None,
    };
    Some(stroke)
}

/// 8-byte HID boot keyboard input report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    pub modifier: u8,
    pub keycodes: [u8; MAX_KEYS],
}

impl KeyboardReport {
    /// Size of the report in bytes.
    pub const SIZE: usize = 8;

    /// Convert the report to bytes.
    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0] = self.modifier;
        bytes[2..].copy_from_slice(&self.keycodes);
        bytes
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct HeldKey {
    usage: u8,
    shifted: bool,
}

/// Keys currently held on the emulated keyboard.
#[derive(Clone, Debug, Default)]
pub struct KeyboardState {
    modifiers: u8,
    keys: Vec<HeldKey, MAX_KEYS>,
}

impl KeyboardState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            modifiers: 0,
            keys: Vec::new(),
        }
    }

    /// Apply a press or release. Returns whether the report changed.
    ///
    /// A seventh simultaneous key is refused with [`EmitError::Rollover`]
    /// and leaves the state untouched.
    pub fn apply(&mut self, event: &KeyEvent) -> Result<bool, EmitError> {
        let Some(stroke) = keystroke(event.symbol) else {
            return Ok(false);
        };

        match (stroke, event.action) {
            (Keystroke::Modifier(bit), KeyAction::Press) => {
                let before = self.modifiers;
                self.modifiers |= bit;
                Ok(before != self.modifiers)
            }
            (Keystroke::Modifier(bit), KeyAction::Release) => {
                let before = self.modifiers;
                self.modifiers &= !bit;
                Ok(before != self.modifiers)
            }
            (Keystroke::Key { usage, shifted }, KeyAction::Press) => {
                if self.keys.iter().any(|k| k.usage == usage) {
                    return Ok(false);
                }
                self.keys
                    .push(HeldKey { usage, shifted })
                    .map_err(|_| EmitError::Rollover)?;
                Ok(true)
            }
            (Keystroke::Key { usage, .. }, KeyAction::Release) => {
                match self.keys.iter().position(|k| k.usage == usage) {
                    Some(index) => {
                        self.keys.remove(index);
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }

    /// Release everything.
    pub fn clear(&mut self) {
        self.modifiers = 0;
        self.keys.clear();
    }

    /// Render the current state.
    #[must_use]
    pub fn report(&self) -> KeyboardReport {
        let mut report = KeyboardReport {
            modifier: self.modifiers,
            keycodes: [0; MAX_KEYS],
        };
        for (slot, key) in report.keycodes.iter_mut().zip(self.keys.iter()) {
            *slot = key.usage;
            if key.shifted {
                report.modifier |= MOD_LEFT_SHIFT;
            }
        }
        report
    }
}
