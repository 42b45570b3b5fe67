//! Button state transitions and the key events derived from them.

use crate::keymap::{Keymap, Symbol};
use crate::types::{Button, Buttons, PortId};

/// Direction of a key event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyAction {
    Press,
    Release,
}

/// A change of one button between two bitmaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub button: Button,
    pub action: KeyAction,
}

/// Iterator over the buttons that differ between two bitmaps.
///
/// Yields transitions in button order: a press for every bit newly set in
/// `current`, a release for every bit newly cleared.
#[derive(Clone, Debug)]
pub struct Transitions {
    changed: Buttons,
    current: Buttons,
    next: usize,
}

impl Transitions {
    /// Whether the two bitmaps were identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

impl Iterator for Transitions {
    type Item = Transition;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&button) = Button::ALL.get(self.next) {
            self.next += 1;
            if self.changed.is_pressed(button) {
                let action = if self.current.is_pressed(button) {
                    KeyAction::Press
                } else {
                    KeyAction::Release
                };
                return Some(Transition { button, action });
            }
        }
        None
    }
}

/// Compare two snapshots of the same port.
pub fn transitions(previous: Buttons, current: Buttons) -> Transitions {
    Transitions {
        changed: previous ^ current,
        current,
        next: 0,
    }
}

/// A keystroke for the input emitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    pub port: PortId,
    pub button: Button,
    pub symbol: Symbol,
    pub action: KeyAction,
}

impl KeyEvent {
    /// Resolve a transition through a port's keymap.
    #[must_use]
    pub fn resolve(port: PortId, keymap: &Keymap, transition: Transition) -> Self {
        Self {
            port,
            button: transition.button,
            symbol: keymap.symbol(transition.button),
            action: transition.action,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_press(&self) -> bool {
        self.action == KeyAction::Press
    }
}
