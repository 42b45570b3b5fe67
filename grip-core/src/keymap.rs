//! Button-to-key mapping for each controller port.
//!
//! Every [`Button`] resolves to exactly one [`Symbol`]. Keymaps are built
//! and validated once at startup; a missing or invalid entry is rejected
//! there and never surfaces while packets are being decoded.

use crate::types::{Button, PortId};

/// Non-printable keys a button may be mapped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NamedKey {
    LeftArrow,
    RightArrow,
    UpArrow,
    DownArrow,
    Return,
    Escape,
    RightShift,
    RightCtrl,
    RightAlt,
}

/// Output symbol for a button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Symbol {
    /// A printable ASCII character, including space.
    Char(char),
    /// A named control key.
    Named(NamedKey),
}

impl Symbol {
    /// Check whether the symbol can be emitted as a keystroke.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        match self {
            Symbol::Char(c) => c.is_ascii_graphic() || c == ' ',
            Symbol::Named(_) => true,
        }
    }
}

impl From<NamedKey> for Symbol {
    fn from(key: NamedKey) -> Self {
        Symbol::Named(key)
    }
}

impl From<char> for Symbol {
    fn from(c: char) -> Self {
        Symbol::Char(c)
    }
}

/// Keymap construction error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeymapError {
    /// A button has no symbol.
    Unbound(Button),
    /// A button was bound more than once.
    Duplicate(Button),
    /// A character symbol is not printable ASCII.
    Unprintable(char),
}

/// Complete mapping from every button to its symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Keymap {
    symbols: [Symbol; Button::COUNT],
}

impl Keymap {
    /// Build a keymap from a function over all buttons.
    ///
    /// Writing `f` as an exhaustive `match` makes a missing button a compile
    /// error.
    pub fn from_fn(mut f: impl FnMut(Button) -> Symbol) -> Result<Self, KeymapError> {
        let symbols = Button::ALL.map(&mut f);
        for symbol in symbols {
            validate(symbol)?;
        }
        Ok(Self { symbols })
    }

    /// Build a keymap from explicit bindings.
    ///
    /// Every button must appear exactly once.
    pub fn from_bindings(bindings: &[(Button, Symbol)]) -> Result<Self, KeymapError> {
        let mut slots: [Option<Symbol>; Button::COUNT] = [None; Button::COUNT];
        for &(button, symbol) in bindings {
            validate(symbol)?;
            let slot = &mut slots[button.index()];
            if slot.is_some() {
                return Err(KeymapError::Duplicate(button));
            }
            *slot = Some(symbol);
        }

        let mut symbols = [Symbol::Char(' '); Button::COUNT];
        for button in Button::ALL {
            symbols[button.index()] = slots[button.index()].ok_or(KeymapError::Unbound(button))?;
        }
        Ok(Self { symbols })
    }

    /// Default keymap for controller port 1: arrows, modifiers and punctuation.
    pub fn js1() -> Result<Self, KeymapError> {
        Self::from_fn(|button| match button {
            Button::Left => NamedKey::LeftArrow.into(),
            Button::Right => NamedKey::RightArrow.into(),
            Button::Down => NamedKey::DownArrow.into(),
            Button::Up => NamedKey::UpArrow.into(),
            Button::R1 => ':'.into(),
            Button::L1 => 'l'.into(),
            Button::Red => NamedKey::RightShift.into(),
            Button::Yellow => ' '.into(),
            Button::Green => NamedKey::RightCtrl.into(),
            Button::L2 => '.'.into(),
            Button::Blue => NamedKey::RightAlt.into(),
            Button::R2 => '/'.into(),
            Button::Start => NamedKey::Return.into(),
            Button::Select => NamedKey::Escape.into(),
        })
    }

    /// Default keymap for controller port 2: letters and digits.
    pub fn js2() -> Result<Self, KeymapError> {
        Self::from_fn(|button| {
            Symbol::Char(match button {
                Button::Left => 'a',
                Button::Right => 'd',
                Button::Down => 's',
                Button::Up => 'w',
                Button::R1 => 'e',
                Button::L1 => 'q',
                Button::Red => 'r',
                Button::Yellow => 'f',
                Button::Green => 'g',
                Button::L2 => '1',
                Button::Blue => 't',
                Button::R2 => '3',
                Button::Start => 'z',
                Button::Select => 'c',
            })
        })
    }

    /// Default keymap for the given port.
    pub fn for_port(port: PortId) -> Result<Self, KeymapError> {
        match port {
            PortId::Js1 => Self::js1(),
            PortId::Js2 => Self::js2(),
        }
    }

    /// Symbol mapped to `button`.
    #[inline]
    #[must_use]
    pub fn symbol(&self, button: Button) -> Symbol {
        self.symbols[button.index()]
    }

    /// All bindings in button order.
    pub fn iter(&self) -> impl Iterator<Item = (Button, Symbol)> + '_ {
        Button::ALL.into_iter().map(|b| (b, self.symbol(b)))
    }
}

fn validate(symbol: Symbol) -> Result<(), KeymapError> {
    match symbol {
        Symbol::Char(c) if !symbol.is_valid() => Err(KeymapError::Unprintable(c)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js1_defaults() {
        let keymap = Keymap::js1().unwrap();
        assert_eq!(keymap.symbol(Button::Up), Symbol::Named(NamedKey::UpArrow));
        assert_eq!(keymap.symbol(Button::R1), Symbol::Char(':'));
        assert_eq!(keymap.symbol(Button::Red), Symbol::Named(NamedKey::RightShift));
        assert_eq!(keymap.symbol(Button::Yellow), Symbol::Char(' '));
        assert_eq!(keymap.symbol(Button::Select), Symbol::Named(NamedKey::Escape));
    }

    #[test]
    fn test_js2_defaults() {
        let keymap = Keymap::for_port(PortId::Js2).unwrap();
        let chars: [char; Button::COUNT] = Button::ALL.map(|b| match keymap.symbol(b) {
            Symbol::Char(c) => c,
            Symbol::Named(k) => panic!("unexpected named key {:?}", k),
        });
        assert_eq!(chars, ['a', 'd', 's', 'w', 'e', 'q', 'r', 'f', 'g', '1', 't', '3', 'z', 'c']);
    }

    #[test]
    fn test_from_bindings_matches_from_fn() {
        let js2 = Keymap::js2().unwrap();
        let mut bindings = [(Button::Left, Symbol::Char(' ')); Button::COUNT];
        for (slot, binding) in bindings.iter_mut().zip(js2.iter()) {
            *slot = binding;
        }
        bindings.reverse();
        assert_eq!(Keymap::from_bindings(&bindings), Ok(js2));
    }

    #[test]
    fn test_missing_binding_rejected() {
        let js1 = Keymap::js1().unwrap();
        let mut bindings = [(Button::Left, Symbol::Char(' ')); Button::COUNT - 1];
        for (slot, binding) in bindings.iter_mut().zip(js1.iter().filter(|(b, _)| *b != Button::Green)) {
            *slot = binding;
        }
        assert_eq!(
            Keymap::from_bindings(&bindings),
            Err(KeymapError::Unbound(Button::Green))
        );
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let bindings = [
            (Button::Left, Symbol::Char('a')),
            (Button::Left, Symbol::Char('b')),
        ];
        assert_eq!(
            Keymap::from_bindings(&bindings),
            Err(KeymapError::Duplicate(Button::Left))
        );
    }

    #[test]
    fn test_unprintable_symbol_rejected() {
        let result = Keymap::from_fn(|button| match button {
            Button::Start => Symbol::Char('\n'),
            _ => Symbol::Char('x'),
        });
        assert_eq!(result, Err(KeymapError::Unprintable('\n')));
        assert!(!Symbol::Char('é').is_valid());
    }
}
