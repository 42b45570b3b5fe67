//! Core decoder types: PortId, Button, Buttons.

use core::ops::{BitAnd, BitOr, BitOrAssign, BitXor, Not};

/// One of the two controller connections on the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortId {
    Js1,
    Js2,
}

impl PortId {
    /// Both ports, in index order.
    pub const ALL: [PortId; 2] = [PortId::Js1, PortId::Js2];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            PortId::Js1 => 0,
            PortId::Js2 => 1,
        }
    }
}

/// A logical button on the GRiP pad.
///
/// Discriminants are the bit positions in the compact [`Buttons`] bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Button {
    Left = 0,
    Right = 1,
    Down = 2,
    Up = 3,
    R1 = 4,
    L1 = 5,
    Red = 6,
    Yellow = 7,
    Green = 8,
    L2 = 9,
    Blue = 10,
    R2 = 11,
    Start = 12,
    Select = 13,
}

impl Button {
    pub const COUNT: usize = 14;

    /// Every button in compact bit order.
    pub const ALL: [Button; Button::COUNT] = [
        Button::Left,
        Button::Right,
        Button::Down,
        Button::Up,
        Button::R1,
        Button::L1,
        Button::Red,
        Button::Yellow,
        Button::Green,
        Button::L2,
        Button::Blue,
        Button::R2,
        Button::Start,
        Button::Select,
    ];

    /// Position of this button in [`Buttons`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The single-button bitmap for this button.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> Buttons {
        Buttons(1 << self as u16)
    }
}

/// Snapshot of held buttons as a compact 14-bit bitfield.
///
/// # Example
///
/// ```
/// use grip_core::{Button, Buttons};
///
/// let buttons = Buttons::LEFT | Buttons::RED;
/// assert!(buttons.contains(Buttons::RED));
/// assert!(buttons.is_pressed(Button::Left));
/// assert!(!buttons.is_pressed(Button::Up));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u16);

impl Buttons {
    pub const LEFT: Self = Button::Left.bit();
    pub const RIGHT: Self = Button::Right.bit();
    pub const DOWN: Self = Button::Down.bit();
    pub const UP: Self = Button::Up.bit();
    pub const R1: Self = Button::R1.bit();
    pub const L1: Self = Button::L1.bit();
    pub const RED: Self = Button::Red.bit();
    pub const YELLOW: Self = Button::Yellow.bit();
    pub const GREEN: Self = Button::Green.bit();
    pub const L2: Self = Button::L2.bit();
    pub const BLUE: Self = Button::Blue.bit();
    pub const R2: Self = Button::R2.bit();
    pub const START: Self = Button::Start.bit();
    pub const SELECT: Self = Button::Select.bit();

    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Every defined button pressed.
    pub const ALL: Self = Self((1 << Button::COUNT) - 1);

    /// Check if all of the given button(s) are pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, buttons: Buttons) -> bool {
        (self.0 & buttons.0) == buttons.0
    }

    /// Check if a single logical button is pressed.
    #[inline]
    #[must_use]
    pub const fn is_pressed(self, button: Button) -> bool {
        self.contains(button.bit())
    }

    /// Set or clear a button.
    #[inline]
    pub fn set(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.0 |= button.bit().0;
        } else {
            self.0 &= !button.bit().0;
        }
    }

    /// Get the raw u16 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Check if no buttons are pressed.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the pressed buttons in bit order.
    pub fn iter(self) -> impl Iterator<Item = Button> {
        Button::ALL.into_iter().filter(move |b| self.is_pressed(*b))
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitXor for Buttons {
    type Output = Self;

    #[inline]
    fn bitxor(self, rhs: Self) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for Buttons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0 & Self::ALL.0)
    }
}

impl FromIterator<Button> for Buttons {
    fn from_iter<T: IntoIterator<Item = Button>>(iter: T) -> Self {
        let mut buttons = Buttons::NONE;
        for button in iter {
            buttons |= button.bit();
        }
        buttons
    }
}
