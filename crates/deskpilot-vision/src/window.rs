//! Top-level window lookup and focus.

use thiserror::Error;

/// Errors from window enumeration or activation.
#[derive(Error, Debug)]
pub enum WindowError {
    #[error("Failed to enumerate windows: {0}")]
    EnumerationFailed(String),

    #[error("Failed to focus window '{0}'")]
    FocusFailed(String),
}

pub type WindowResult<T> = Result<T, WindowError>;

/// Information about a visible top-level window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// Platform handle
    pub handle: isize,
    pub title: String,
}

/// Find and raise windows by title.
pub trait WindowFocus: Send + Sync {
    /// Visible top-level windows with a non-empty title, in z-order.
    fn visible_windows(&self) -> WindowResult<Vec<WindowInfo>>;

    /// Restore the window if minimized and make it the foreground window.
    fn bring_to_front(&self, window: &WindowInfo) -> WindowResult<()>;

    /// Focus the first visible window whose title contains `fragment`
    /// (case-insensitive). Returns the focused window, if any matched.
    fn focus_by_title(&self, fragment: &str) -> WindowResult<Option<WindowInfo>> {
        let Some(found) = find_by_title(&self.visible_windows()?, fragment).cloned() else {
            return Ok(None);
        };
        self.bring_to_front(&found)?;
        Ok(Some(found))
    }
}

/// First window whose title contains `fragment`, ignoring case.
pub fn find_by_title<'a>(windows: &'a [WindowInfo], fragment: &str) -> Option<&'a WindowInfo> {
    let needle = fragment.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    windows
        .iter()
        .find(|w| w.title.to_lowercase().contains(&needle))
}

#[cfg(windows)]
pub mod platform {
    use super::*;
    use windows::Win32::Foundation::{BOOL, HWND, LPARAM, TRUE};
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetWindowTextW, IsWindowVisible, SetForegroundWindow, ShowWindowAsync,
        SW_RESTORE,
    };

    /// Win32 window enumeration via `EnumWindows`.
    #[derive(Debug, Default)]
    pub struct Win32Windows;

    unsafe extern "system" fn collect_cb(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let handles = &mut *(lparam.0 as *mut Vec<isize>);
        handles.push(hwnd.0 as isize);
        TRUE
    }

    impl WindowFocus for Win32Windows {
        fn visible_windows(&self) -> WindowResult<Vec<WindowInfo>> {
            let mut handles: Vec<isize> = Vec::new();
            unsafe {
                EnumWindows(
                    Some(collect_cb),
                    LPARAM(&mut handles as *mut Vec<isize> as isize),
                )
            }
            .map_err(|e| WindowError::EnumerationFailed(e.to_string()))?;

            let mut result = Vec::new();
            for raw in handles {
                let hwnd = HWND(raw as *mut _);
                unsafe {
                    if !IsWindowVisible(hwnd).as_bool() {
                        continue;
                    }
                    let mut buf = [0u16; 512];
                    let len = GetWindowTextW(hwnd, &mut buf);
                    if len <= 0 {
                        continue;
                    }
                    let title = String::from_utf16_lossy(&buf[..len as usize]);
                    if title.trim().is_empty() {
                        continue;
                    }
                    result.push(WindowInfo { handle: raw, title });
                }
            }
            Ok(result)
        }

        fn bring_to_front(&self, window: &WindowInfo) -> WindowResult<()> {
            let hwnd = HWND(window.handle as *mut _);
            unsafe {
                let _ = ShowWindowAsync(hwnd, SW_RESTORE);
                if !SetForegroundWindow(hwnd).as_bool() {
                    return Err(WindowError::FocusFailed(window.title.clone()));
                }
            }
            Ok(())
        }
    }
}

pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Fixed window list that records which windows were raised.
    #[derive(Debug, Default)]
    pub struct MockWindows {
        windows: Vec<WindowInfo>,
        focused: Mutex<Vec<String>>,
    }

    impl MockWindows {
        pub fn new<I, S>(titles: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                windows: titles
                    .into_iter()
                    .enumerate()
                    .map(|(i, t)| WindowInfo {
                        handle: i as isize + 1,
                        title: t.into(),
                    })
                    .collect(),
                focused: Mutex::new(Vec::new()),
            }
        }

        pub fn focused(&self) -> Vec<String> {
            self.focused.lock().map(|f| f.clone()).unwrap_or_default()
        }
    }

    impl WindowFocus for MockWindows {
        fn visible_windows(&self) -> WindowResult<Vec<WindowInfo>> {
            Ok(self.windows.clone())
        }

        fn bring_to_front(&self, window: &WindowInfo) -> WindowResult<()> {
            if let Ok(mut f) = self.focused.lock() {
                f.push(window.title.clone());
            }
            Ok(())
        }
    }
}
