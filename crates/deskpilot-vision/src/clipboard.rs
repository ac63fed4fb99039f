//! Text clipboard access.

use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard not available: {0}")]
    NotAvailable(String),

    #[error("Failed to set clipboard text after {attempts} attempts: {message}")]
    SetFailed { attempts: u32, message: String },
}

pub type ClipboardResult<T> = Result<T, ClipboardError>;

/// Plain-text clipboard. Calls may block the current thread.
pub trait Clipboard: Send + Sync {
    /// Current text contents, `None` when empty or not text.
    fn get_text(&self) -> Option<String>;

    fn set_text(&self, text: &str) -> ClipboardResult<()>;
}

#[cfg(feature = "clipboard")]
pub use system::SystemClipboard;

#[cfg(feature = "clipboard")]
mod system {
    use super::*;
    use std::time::Duration;
    use tracing::debug;

    const SET_ATTEMPTS: u32 = 4;
    const RETRY_PAUSE: Duration = Duration::from_millis(40);

    /// OS clipboard through `arboard`.
    ///
    /// Another process may hold the clipboard open for a moment, so setting
    /// text is retried a few times before giving up.
    pub struct SystemClipboard {
        inner: Mutex<arboard::Clipboard>,
    }

    impl SystemClipboard {
        pub fn new() -> ClipboardResult<Self> {
            let inner =
                arboard::Clipboard::new().map_err(|e| ClipboardError::NotAvailable(e.to_string()))?;
            Ok(Self {
                inner: Mutex::new(inner),
            })
        }
    }

    impl Clipboard for SystemClipboard {
        fn get_text(&self) -> Option<String> {
            let mut cb = self.inner.lock().ok()?;
            cb.get_text().ok()
        }

        fn set_text(&self, text: &str) -> ClipboardResult<()> {
            let mut last_error = String::new();
            for attempt in 1..=SET_ATTEMPTS {
                let result = match self.inner.lock() {
                    Ok(mut cb) => cb.set_text(text.to_string()).map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                match result {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        debug!(attempt, error = %e, "Clipboard busy");
                        last_error = e;
                    }
                }
                if attempt < SET_ATTEMPTS {
                    std::thread::sleep(RETRY_PAUSE);
                }
            }
            Err(ClipboardError::SetFailed {
                attempts: SET_ATTEMPTS,
                message: last_error,
            })
        }
    }
}

/// In-process clipboard for tests.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: Mutex<Option<String>>,
    history: Mutex<Vec<String>>,
    fail_sets: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(Some(text.into())),
            ..Self::default()
        }
    }

    /// Every `set_text` fails.
    pub fn failing() -> Self {
        Self {
            fail_sets: true,
            ..Self::default()
        }
    }

    /// Every value passed to `set_text`, in order.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

impl Clipboard for MemoryClipboard {
    fn get_text(&self) -> Option<String> {
        self.text.lock().ok().and_then(|t| t.clone())
    }

    fn set_text(&self, text: &str) -> ClipboardResult<()> {
        if self.fail_sets {
            return Err(ClipboardError::SetFailed {
                attempts: 1,
                message: "clipboard locked".to_string(),
            });
        }
        if let Ok(mut h) = self.history.lock() {
            h.push(text.to_string());
        }
        if let Ok(mut t) = self.text.lock() {
            *t = Some(text.to_string());
        }
        Ok(())
    }
}
