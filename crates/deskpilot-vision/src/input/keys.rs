use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Keyboard Types
// ============================================================================

/// A Windows virtual-key code.
///
/// Codes are plain `u16`s so that backends other than Win32 (and the recording
/// backend used in tests) can carry them without platform bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualKey(pub u16);

impl VirtualKey {
    pub const BACK: Self = Self(0x08);
    pub const TAB: Self = Self(0x09);
    pub const RETURN: Self = Self(0x0D);
    pub const SHIFT: Self = Self(0x10);
    pub const CONTROL: Self = Self(0x11);
    pub const MENU: Self = Self(0x12);
    pub const ESCAPE: Self = Self(0x1B);
    pub const SPACE: Self = Self(0x20);
    pub const PRIOR: Self = Self(0x21);
    pub const NEXT: Self = Self(0x22);
    pub const END: Self = Self(0x23);
    pub const HOME: Self = Self(0x24);
    pub const LEFT: Self = Self(0x25);
    pub const UP: Self = Self(0x26);
    pub const RIGHT: Self = Self(0x27);
    pub const DOWN: Self = Self(0x28);
    pub const INSERT: Self = Self(0x2D);
    pub const DELETE: Self = Self(0x2E);
    pub const KEY_R: Self = Self(0x52);
    pub const KEY_V: Self = Self(0x56);
    pub const LWIN: Self = Self(0x5B);
    pub const RWIN: Self = Self(0x5C);
    pub const F1: Self = Self(0x70);

    /// Letter key (`'a'..='z'`, case-insensitive).
    pub fn letter(c: char) -> Option<Self> {
        let c = c.to_ascii_uppercase();
        c.is_ascii_uppercase().then(|| Self(c as u16))
    }

    /// Top-row digit key.
    pub fn digit(c: char) -> Option<Self> {
        c.is_ascii_digit().then(|| Self(c as u16))
    }

    /// Function key `F1..=F24`.
    pub fn function(n: u8) -> Option<Self> {
        (1..=24).contains(&n).then(|| Self(Self::F1.0 + (n as u16 - 1)))
    }

    /// Resolve a logical key name the way models tend to spell them.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    pub fn parse(name: &str) -> Option<Self> {
        let k = name.trim().to_lowercase();
        if k.is_empty() {
            return None;
        }

        let named = match k.as_str() {
            "ctrl" | "control" => Some(Self::CONTROL),
            "alt" | "menu" => Some(Self::MENU),
            "shift" => Some(Self::SHIFT),
            "win" | "meta" | "command" | "lwin" => Some(Self::LWIN),
            "rwin" => Some(Self::RWIN),
            "enter" | "return" => Some(Self::RETURN),
            "esc" | "escape" => Some(Self::ESCAPE),
            "space" => Some(Self::SPACE),
            "tab" => Some(Self::TAB),
            "backspace" => Some(Self::BACK),
            "delete" | "del" => Some(Self::DELETE),
            "insert" | "ins" => Some(Self::INSERT),
            "home" => Some(Self::HOME),
            "end" => Some(Self::END),
            "pageup" | "pgup" => Some(Self::PRIOR),
            "pagedown" | "pgdn" => Some(Self::NEXT),
            "up" => Some(Self::UP),
            "down" => Some(Self::DOWN),
            "left" => Some(Self::LEFT),
            "right" => Some(Self::RIGHT),
            _ => None,
        };
        if named.is_some() {
            return named;
        }

        let mut chars = k.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Self::digit(c).or_else(|| Self::letter(c));
        }

        k.strip_prefix('f')
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(Self::function)
    }

    /// Member of the fixed modifier set used to split hotkeys.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::CONTROL | Self::MENU | Self::SHIFT | Self::LWIN | Self::RWIN
        )
    }

    /// Keys that need the extended flag when sent by scan code.
    ///
    /// Ctrl, Alt and Shift are deliberately not extended here.
    pub fn is_extended(self) -> bool {
        matches!(
            self,
            Self::LEFT
                | Self::RIGHT
                | Self::UP
                | Self::DOWN
                | Self::HOME
                | Self::END
                | Self::PRIOR
                | Self::NEXT
                | Self::INSERT
                | Self::DELETE
                | Self::LWIN
                | Self::RWIN
        )
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VK(0x{:02X})", self.0)
    }
}

// ============================================================================
// Mouse Types
// ============================================================================

/// Mouse button types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Parse a button name; anything unrecognised is treated as left.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "right" => Self::Right,
            "middle" => Self::Middle,
            _ => Self::Left,
        }
    }
}
