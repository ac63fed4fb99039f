//! `SendInput` backend for Windows.

use super::backend::InputBackend;
use super::event::{DispatchReport, InputEvent, KeyStroke, MouseEvent};
use super::keys::{MouseButton, VirtualKey};
use super::{win32_code, InputError, InputResult};
use crate::geometry::ScreenGeometry;
use std::mem;
use tracing::debug;
use windows::Win32::Foundation::{GetLastError, POINT};
use windows::Win32::UI::HiDpi::{
    SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    MapVirtualKeyW, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT,
    KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE,
    KEYEVENTF_UNICODE, MAPVK_VK_TO_VSC, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE,
    MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_VIRTUALDESK, MOUSEINPUT,
    MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetSystemMetrics, SetCursorPos, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN,
    SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN,
};

/// Injects input through `SendInput` and positions the cursor with `SetCursorPos`.
#[derive(Debug, Default)]
pub struct Win32Backend;

impl Win32Backend {
    pub fn new() -> Self {
        Self
    }

    /// Opt the process into per-monitor DPI awareness so that cursor
    /// coordinates and screenshots share one pixel grid. Best effort.
    pub fn enable_dpi_awareness() {
        // Fails harmlessly if awareness was already set (e.g. by a manifest)
        if let Err(e) = unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) } {
            debug!(error = %e, "DPI awareness not changed");
        }
    }

    fn to_input(event: &InputEvent) -> INPUT {
        match event {
            InputEvent::Key(k) => Self::keyboard_input(k),
            InputEvent::Mouse(m) => Self::mouse_input(m),
        }
    }

    fn keyboard_input(k: &KeyStroke) -> INPUT {
        let mut flags = KEYBD_EVENT_FLAGS(0);
        if k.flags.key_up {
            flags |= KEYEVENTF_KEYUP;
        }
        if k.flags.scancode {
            flags |= KEYEVENTF_SCANCODE;
        }
        if k.flags.extended {
            flags |= KEYEVENTF_EXTENDEDKEY;
        }
        if k.flags.unicode {
            flags |= KEYEVENTF_UNICODE;
        }

        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(k.vk),
                    wScan: k.scan,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    fn mouse_input(m: &MouseEvent) -> INPUT {
        let (dx, dy, flags) = match *m {
            MouseEvent::Down(b) => (0, 0, button_flags(b).0),
            MouseEvent::Up(b) => (0, 0, button_flags(b).1),
            MouseEvent::MoveAbsolute { x, y } => (
                x,
                y,
                MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK,
            ),
        };

        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }
}

fn button_flags(button: MouseButton) -> (MOUSE_EVENT_FLAGS, MOUSE_EVENT_FLAGS) {
    match button {
        MouseButton::Left => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
        MouseButton::Right => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
        MouseButton::Middle => (MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP),
    }
}

impl InputBackend for Win32Backend {
    fn name(&self) -> &str {
        "win32"
    }

    fn send(&self, events: &[InputEvent]) -> DispatchReport {
        let inputs: Vec<INPUT> = events.iter().map(Self::to_input).collect();
        let requested = inputs.len() as u32;
        let accepted = unsafe { SendInput(&inputs, mem::size_of::<INPUT>() as i32) };
        if accepted == 0 && requested > 0 {
            let code = unsafe { GetLastError() }.0;
            return DispatchReport::rejected(requested, code);
        }
        DispatchReport {
            requested,
            accepted,
            os_error: None,
        }
    }

    fn scan_code(&self, key: VirtualKey) -> u16 {
        let scan = unsafe { MapVirtualKeyW(key.0 as u32, MAPVK_VK_TO_VSC) };
        u16::try_from(scan).unwrap_or(0)
    }

    fn set_cursor_pos(&self, x: i32, y: i32) -> InputResult<()> {
        unsafe { SetCursorPos(x, y) }.map_err(|e| InputError::Os {
            call: "SetCursorPos",
            code: win32_code(e.code().0),
        })
    }

    fn cursor_pos(&self) -> InputResult<(i32, i32)> {
        let mut p = POINT::default();
        unsafe { GetCursorPos(&mut p) }.map_err(|e| InputError::Os {
            call: "GetCursorPos",
            code: win32_code(e.code().0),
        })?;
        Ok((p.x, p.y))
    }

    fn virtual_screen(&self) -> ScreenGeometry {
        unsafe {
            ScreenGeometry::new(
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
            )
        }
    }
}
