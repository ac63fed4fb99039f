use super::event::{DispatchReport, InputEvent};
use super::keys::VirtualKey;
use super::InputResult;
use crate::geometry::ScreenGeometry;

/// The OS primitive underneath the dispatcher.
///
/// Implementations inject events synchronously; a single [`send`](Self::send)
/// call is treated as atomic and is never interrupted.
pub trait InputBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Inject a batch of events and report how many the OS accepted.
    fn send(&self, events: &[InputEvent]) -> DispatchReport;

    /// Hardware scan code for a virtual key, or 0 when none exists.
    fn scan_code(&self, key: VirtualKey) -> u16;

    /// Set the absolute cursor position in virtual-screen pixels.
    fn set_cursor_pos(&self, x: i32, y: i32) -> InputResult<()>;

    /// Read back the current cursor position.
    fn cursor_pos(&self) -> InputResult<(i32, i32)>;

    /// Current bounds of the virtual desktop.
    fn virtual_screen(&self) -> ScreenGeometry;
}

impl<T: InputBackend + ?Sized> InputBackend for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn send(&self, events: &[InputEvent]) -> DispatchReport {
        (**self).send(events)
    }

    fn scan_code(&self, key: VirtualKey) -> u16 {
        (**self).scan_code(key)
    }

    fn set_cursor_pos(&self, x: i32, y: i32) -> InputResult<()> {
        (**self).set_cursor_pos(x, y)
    }

    fn cursor_pos(&self) -> InputResult<(i32, i32)> {
        (**self).cursor_pos()
    }

    fn virtual_screen(&self) -> ScreenGeometry {
        (**self).virtual_screen()
    }
}
