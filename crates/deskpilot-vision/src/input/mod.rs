//! Hardware-level input synthesis.
//!
//! This module provides:
//! - Logical key names and virtual-key codes ([`VirtualKey`])
//! - Backend-neutral input events ([`InputEvent`]) and the [`InputBackend`] seam
//! - The [`InputDispatcher`]: key taps, chords, Unicode text, mouse buttons
//!   and the verified cursor-positioning protocol
//! - A Win32 `SendInput` backend (Windows only) and a recording backend for tests

mod backend;
mod dispatcher;
mod event;
mod keys;
pub mod mock;
mod positioning;
#[cfg(windows)]
pub mod win32;

pub use backend::InputBackend;
pub use dispatcher::InputDispatcher;
pub use event::{DispatchReport, InputEvent, KeyFlags, KeyStroke, MouseEvent};
pub use keys::{MouseButton, VirtualKey};
pub use positioning::{PositionAttempt, PositionOutcome, PositionState};

use thiserror::Error;

/// Errors that can occur during input synthesis.
#[derive(Error, Debug)]
pub enum InputError {
    /// `code` is a Win32 error code, not an HRESULT
    #[error("{call} failed (os error {code})")]
    Os { call: &'static str, code: u32 },
}

/// Win32 error code carried by an HRESULT. `HRESULT_FROM_WIN32` values
/// (facility 7) unwrap to the original code; anything else passes through.
pub fn win32_code(hresult: i32) -> u32 {
    let raw = hresult as u32;
    if raw & 0xFFFF_0000 == 0x8007_0000 {
        raw & 0xFFFF
    } else {
        raw
    }
}

/// Result type for input operations.
pub type InputResult<T> = Result<T, InputError>;

/// Absolute-move coordinate on the 0..=65535 scale used by normalized mouse events.
pub fn normalize_absolute(value: i32, origin: i32, extent: i32) -> i32 {
    if extent <= 0 {
        return 0;
    }
    let scaled = (value as i64 - origin as i64) * 65535 / extent as i64;
    scaled.clamp(0, 65535) as i32
}
