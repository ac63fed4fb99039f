use super::keys::MouseButton;
use serde::Serialize;

/// Flags carried by a keyboard event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyFlags {
    pub key_up: bool,
    /// `scan` is authoritative and `vk` is zero
    pub scancode: bool,
    pub extended: bool,
    /// `scan` holds a UTF-16 code unit rather than a hardware code
    pub unicode: bool,
}

/// One keyboard event, shaped like a Win32 `KEYBDINPUT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyStroke {
    pub vk: u16,
    pub scan: u16,
    pub flags: KeyFlags,
}

impl KeyStroke {
    /// A Unicode character event that bypasses the keyboard layout.
    pub fn unicode(unit: u16, key_up: bool) -> Self {
        Self {
            vk: 0,
            scan: unit,
            flags: KeyFlags {
                key_up,
                unicode: true,
                ..Default::default()
            },
        }
    }

    pub fn is_up(&self) -> bool {
        self.flags.key_up
    }
}

/// One mouse event. Button events never carry a move delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MouseEvent {
    Down(MouseButton),
    Up(MouseButton),
    /// Move to a point on the 0..=65535 virtual-desktop scale
    MoveAbsolute { x: i32, y: i32 },
}

/// A single hardware input event handed to an [`InputBackend`](super::InputBackend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputEvent {
    Key(KeyStroke),
    Mouse(MouseEvent),
}

/// What the OS reported after a batch of events was injected.
///
/// Zero accepted events is an expected condition (e.g. the foreground window
/// runs at a higher integrity level), so it is reported rather than raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub requested: u32,
    pub accepted: u32,
    pub os_error: Option<u32>,
}

impl DispatchReport {
    pub fn accepted_all(requested: u32) -> Self {
        Self {
            requested,
            accepted: requested,
            os_error: None,
        }
    }

    pub fn rejected(requested: u32, os_error: u32) -> Self {
        Self {
            requested,
            accepted: 0,
            os_error: Some(os_error),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.accepted == self.requested
    }

    /// Fold another report into this one, keeping the first OS error seen.
    pub fn merge(&mut self, other: DispatchReport) {
        self.requested += other.requested;
        self.accepted += other.accepted;
        if self.os_error.is_none() {
            self.os_error = other.os_error;
        }
    }
}
