//! # Deskpilot Vision
//!
//! Desktop-facing primitives for deskpilot: seeing the screen and driving
//! the keyboard and mouse.
//!
//! ## Features
//!
//! - **Screen Capture**: all monitors composed into one virtual-desktop PNG
//! - **Coordinate Mapping**: screenshot pixels to real desktop pixels, with clamping
//! - **Input Dispatch**: scan-code keys, Unicode text, chords, mouse buttons and
//!   a verified cursor-positioning protocol with an absolute-move fallback
//! - **Window Focus**: raise a window by title fragment
//! - **Clipboard**: plain-text get/set with retries
//!
//! ## Quick Start
//!
//! ```rust
//! use deskpilot_vision::{CapturedImage, CoordinateMapper, ScreenGeometry};
//!
//! let mapper = CoordinateMapper::new()
//!     .with_geometry(ScreenGeometry::new(-1920, 0, 3840, 1080))
//!     .with_image(CapturedImage::new(1920, 540));
//!
//! assert_eq!(mapper.map_from_image_pixel(0, 0), (-1920, 0));
//! ```
//!
//! ## Platforms
//!
//! Input injection is implemented for Windows only (`input::win32`). Every
//! other component, plus the recording backend in `input::mock`, works
//! everywhere so the logic above the OS layer can be tested anywhere.

pub mod capture;
pub mod clipboard;
pub mod config;
pub mod geometry;
pub mod input;
pub mod window;

pub use capture::{CaptureError, CaptureResult, ScreenCapture, Screenshot};
pub use clipboard::{Clipboard, ClipboardError, ClipboardResult, MemoryClipboard};
pub use config::{CaptureSettings, ConfigError, InputSettings};
pub use geometry::{CapturedImage, CoordinateMapper, ScreenGeometry};
pub use input::{
    DispatchReport, InputBackend, InputDispatcher, InputError, InputEvent, InputResult,
    MouseButton, VirtualKey,
};
pub use window::{WindowError, WindowFocus, WindowInfo, WindowResult};

#[cfg(feature = "screen-capture")]
pub use capture::platform::XcapCapture;
#[cfg(feature = "clipboard")]
pub use clipboard::SystemClipboard;
#[cfg(windows)]
pub use input::win32::Win32Backend;
#[cfg(windows)]
pub use window::platform::Win32Windows;
