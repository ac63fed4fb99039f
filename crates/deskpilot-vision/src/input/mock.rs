//! Deterministic in-memory backend.
//!
//! Records every event and cursor call instead of touching the desktop. Cursor
//! drift and rejected injections can be simulated to exercise the dispatcher's
//! recovery paths.

use super::backend::InputBackend;
use super::event::{DispatchReport, InputEvent, MouseEvent};
use super::keys::{MouseButton, VirtualKey};
use super::InputResult;
use crate::geometry::ScreenGeometry;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    events: Vec<InputEvent>,
    send_calls: usize,
    set_cursor_calls: usize,
    absolute_moves: usize,
    cursor: (i32, i32),
}

/// Mock input backend that tracks calls but doesn't inject anything.
#[derive(Debug)]
pub struct RecordingBackend {
    state: Mutex<State>,
    drift: (i32, i32),
    absolute_drift: (i32, i32),
    screen: ScreenGeometry,
    reject_with: Option<u32>,
    scan_codes: bool,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    /// A 1920x1080 desktop at the origin that accepts everything.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            drift: (0, 0),
            absolute_drift: (0, 0),
            screen: ScreenGeometry::new(0, 0, 1920, 1080),
            reject_with: None,
            scan_codes: true,
        }
    }

    /// Every set-position call lands this far from the requested point.
    pub fn with_drift(mut self, dx: i32, dy: i32) -> Self {
        self.drift = (dx, dy);
        self
    }

    /// Absolute-move events land this far from the requested point.
    pub fn with_absolute_drift(mut self, dx: i32, dy: i32) -> Self {
        self.absolute_drift = (dx, dy);
        self
    }

    pub fn with_screen(mut self, screen: ScreenGeometry) -> Self {
        self.screen = screen;
        self
    }

    /// Report zero accepted events with this OS error code.
    pub fn rejecting(mut self, os_error: u32) -> Self {
        self.reject_with = Some(os_error);
        self
    }

    /// Pretend no key has a scan code.
    pub fn without_scan_codes(mut self) -> Self {
        self.scan_codes = false;
        self
    }

    /// The scan code this backend reports for a key.
    pub fn scan_for(key: VirtualKey) -> u16 {
        0x0100 + key.0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic while holding the lock only happens inside a failing test
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.lock().events.clone()
    }

    pub fn send_calls(&self) -> usize {
        self.lock().send_calls
    }

    pub fn set_cursor_calls(&self) -> usize {
        self.lock().set_cursor_calls
    }

    pub fn absolute_moves(&self) -> usize {
        self.lock().absolute_moves
    }

    pub fn cursor(&self) -> (i32, i32) {
        self.lock().cursor
    }

    /// Number of button-down events for `button`.
    pub fn clicks(&self, button: MouseButton) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| matches!(e, InputEvent::Mouse(MouseEvent::Down(b)) if *b == button))
            .count()
    }

    /// Total interactions of any kind with the backend.
    pub fn total_calls(&self) -> usize {
        let s = self.lock();
        s.send_calls + s.set_cursor_calls
    }

    pub fn clear(&self) {
        *self.lock() = State::default();
    }

    fn denormalize(v: i32, origin: i32, extent: i32) -> i32 {
        origin + ((v as i64 * extent as i64 + 32767) / 65535) as i32
    }
}

impl InputBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, events: &[InputEvent]) -> DispatchReport {
        let mut s = self.lock();
        s.send_calls += 1;
        s.events.extend_from_slice(events);

        if let Some(code) = self.reject_with {
            return DispatchReport::rejected(events.len() as u32, code);
        }

        for e in events {
            if let InputEvent::Mouse(MouseEvent::MoveAbsolute { x, y }) = e {
                s.absolute_moves += 1;
                s.cursor = (
                    Self::denormalize(*x, self.screen.origin_x, self.screen.width) + self.absolute_drift.0,
                    Self::denormalize(*y, self.screen.origin_y, self.screen.height) + self.absolute_drift.1,
                );
            }
        }
        DispatchReport::accepted_all(events.len() as u32)
    }

    fn scan_code(&self, key: VirtualKey) -> u16 {
        if self.scan_codes {
            Self::scan_for(key)
        } else {
            0
        }
    }

    fn set_cursor_pos(&self, x: i32, y: i32) -> InputResult<()> {
        let mut s = self.lock();
        s.set_cursor_calls += 1;
        s.cursor = (x + self.drift.0, y + self.drift.1);
        Ok(())
    }

    fn cursor_pos(&self) -> InputResult<(i32, i32)> {
        Ok(self.lock().cursor)
    }

    fn virtual_screen(&self) -> ScreenGeometry {
        self.screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_and_moves() {
        let b = RecordingBackend::new();
        b.set_cursor_pos(10, 20).unwrap();
        assert_eq!(b.cursor_pos().unwrap(), (10, 20));

        let r = b.send(&[InputEvent::Mouse(MouseEvent::MoveAbsolute { x: 65535, y: 0 })]);
        assert!(r.is_complete());
        assert_eq!(b.cursor(), (1920, 0));
        assert_eq!(b.absolute_moves(), 1);
        assert_eq!(b.total_calls(), 2);
    }

    #[test]
    fn test_rejecting_backend() {
        let b = RecordingBackend::new().rejecting(1400);
        let r = b.send(&[InputEvent::Mouse(MouseEvent::Down(MouseButton::Left))]);
        assert_eq!(r.accepted, 0);
        assert_eq!(r.os_error, Some(1400));
        assert_eq!(b.clicks(MouseButton::Left), 1);
    }
}
