//! Configuration for capture and input.
//!
//! This module provides configuration structures for:
//! - Capture settings (downscaling of the image shown to the model)
//! - Input timing (key holds, settle waits, click cadence, positioning tolerance)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capture quality settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Downscale the composed desktop image so it is at most this wide.
    /// `None` keeps the native resolution (image space == screen space).
    pub max_width: Option<u32>,
}

/// Timing and tolerance knobs for the input dispatcher and tool executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Down-to-up gap for a simple key tap
    pub key_tap_hold_ms: u64,
    /// Default gap between characters when typing text
    pub key_interval_ms: u64,
    /// Gap between sequential taps of the `press` tool
    pub press_interval_ms: u64,
    /// Wait after setting the cursor before reading it back
    pub mouse_settle_ms: u64,
    /// Default gap between repeated clicks
    pub mouse_click_interval_ms: u64,
    /// Allowed deviation (px, per axis) when verifying cursor placement
    pub position_tolerance_px: i32,
    /// Direct set-position calls before the normalized fallback (first call included)
    pub position_attempts: u32,
    /// Wait after opening the run dialog before typing
    pub launch_warmup_ms: u64,
    /// Character gap when typing into the run dialog
    pub launch_type_interval_ms: u64,
    /// Wait after a paste before restoring the previous clipboard text
    pub clipboard_restore_delay_ms: u64,
    /// Short pause after every executed step, before the step delay
    pub inter_step_delay_ms: u64,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            key_tap_hold_ms: 10,
            key_interval_ms: 20,
            press_interval_ms: 50,
            mouse_settle_ms: 25,
            mouse_click_interval_ms: 120,
            position_tolerance_px: 2,
            position_attempts: 2,
            launch_warmup_ms: 150,
            launch_type_interval_ms: 8,
            clipboard_restore_delay_ms: 150,
            inter_step_delay_ms: 100,
        }
    }
}

impl InputSettings {
    /// Settings with every wait set to zero. Useful for tests.
    pub fn immediate() -> Self {
        Self {
            key_tap_hold_ms: 0,
            key_interval_ms: 0,
            press_interval_ms: 0,
            mouse_settle_ms: 0,
            mouse_click_interval_ms: 0,
            launch_warmup_ms: 0,
            launch_type_interval_ms: 0,
            clipboard_restore_delay_ms: 0,
            inter_step_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn key_tap_hold(&self) -> Duration {
        Duration::from_millis(self.key_tap_hold_ms)
    }

    pub fn key_interval(&self) -> Duration {
        Duration::from_millis(self.key_interval_ms)
    }

    pub fn mouse_settle(&self) -> Duration {
        Duration::from_millis(self.mouse_settle_ms)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.position_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "position_attempts must be at least 1".to_string(),
            ));
        }
        if self.position_tolerance_px < 0 {
            return Err(ConfigError::InvalidValue(
                "position_tolerance_px must not be negative".to_string(),
            ));
        }
        if self.mouse_settle_ms > 1000 {
            tracing::warn!(
                settle_ms = self.mouse_settle_ms,
                "Cursor settle wait is unusually long"
            );
        }
        Ok(())
    }
}

impl CaptureSettings {
    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.max_width, Some(w) if w < 100) {
            return Err(ConfigError::InvalidValue(
                "max_width must be at least 100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
