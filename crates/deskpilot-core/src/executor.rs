//! # Action Executor
//!
//! Runs one plan step against the desktop.
//!
//! ## Overview
//!
//! The executor is responsible for:
//! - Decoding a step's arguments into a typed [`Action`]
//! - Checking mouse targets against the last captured image before anything moves
//! - Mapping image coordinates to the desktop and driving the input dispatcher
//! - Clipboard and window-focus side effects for `paste` and `focus_window`
//!
//! A failing step never aborts the plan: [`ActionExecutor::execute_step`]
//! always returns a [`StepOutcome`], logging why a step was skipped.

use crate::action::{Action, ArgError};
use crate::plan::Step;
use deskpilot_vision::{
    Clipboard, ClipboardError, CoordinateMapper, DispatchReport, InputBackend, InputDispatcher,
    VirtualKey, WindowError, WindowFocus,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reasons a step could not be carried out.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Invalid arguments: {0}")]
    Args(#[from] ArgError),

    #[error("No image size in session")]
    NoImage,

    #[error("Out of bounds: ({x},{y}) not in [0..{max_x}]x[0..{max_y}]")]
    OutOfBounds { x: i64, y: i64, max_x: i32, max_y: i32 },

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    #[error("No visible window matches '{0}'")]
    WindowNotFound(String),
}

pub type ExecResult<T> = std::result::Result<T, ExecError>;

/// What happened to one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The action ran; the report covers every injected event
    Executed(DispatchReport),
    /// Validation or a collaborator failed; nothing further was done
    Skipped(String),
    /// Tool name not supported
    Ignored,
}

/// Maps decoded actions onto the input dispatcher and desktop collaborators.
pub struct ActionExecutor<B> {
    input: InputDispatcher<B>,
    clipboard: Arc<dyn Clipboard>,
    windows: Arc<dyn WindowFocus>,
}

impl<B: InputBackend> ActionExecutor<B> {
    pub fn new(
        input: InputDispatcher<B>,
        clipboard: Arc<dyn Clipboard>,
        windows: Arc<dyn WindowFocus>,
    ) -> Self {
        Self {
            input,
            clipboard,
            windows,
        }
    }

    pub fn input(&self) -> &InputDispatcher<B> {
        &self.input
    }

    /// Decode and run a step. Never fails; problems are logged and reported.
    pub async fn execute_step(&self, step: &Step, mapper: &CoordinateMapper) -> StepOutcome {
        let action = match Action::decode(&step.tool, &step.args) {
            Ok(a) => a,
            Err(e) => {
                warn!(tool = %step.tool, error = %e, "Step skipped");
                return StepOutcome::Skipped(e.to_string());
            }
        };

        if let Action::Unknown { tool, .. } = &action {
            warn!(tool = %tool, "Unsupported tool ignored");
            return StepOutcome::Ignored;
        }

        match self.execute(&action, mapper).await {
            Ok(report) => {
                if report.requested > 0 && report.accepted == 0 {
                    warn!(
                        tool = action.tool_name(),
                        os_error = ?report.os_error,
                        "No input events were accepted"
                    );
                }
                StepOutcome::Executed(report)
            }
            Err(e) => {
                warn!(tool = action.tool_name(), error = %e, "Step skipped");
                StepOutcome::Skipped(e.to_string())
            }
        }
    }

    /// Run a decoded action.
    pub async fn execute(&self, action: &Action, mapper: &CoordinateMapper) -> ExecResult<DispatchReport> {
        let settings = self.input.settings();
        let mut report = DispatchReport::default();

        match action {
            Action::Sleep { secs } => {
                debug!(secs, "sleep");
                sleep(Duration::from_secs_f64(*secs)).await;
            }

            Action::Press { keys } => {
                debug!(count = keys.len(), "press");
                let gap = Duration::from_millis(settings.press_interval_ms);
                for &k in keys {
                    report.merge(self.input.tap(k).await);
                    sleep(gap).await;
                }
            }

            Action::Hotkey { modifiers, normals } => {
                report = self.input.chord(modifiers, normals).await;
            }

            Action::Write { text, interval } => {
                let interval = interval.unwrap_or_else(|| settings.key_interval());
                debug!(len = text.chars().count(), interval_ms = interval.as_millis() as u64, "write");
                report = self.input.type_text(text, interval).await;
            }

            Action::Paste {
                text,
                restore_clipboard,
            } => {
                let previous = self.clipboard_get().await;
                self.clipboard_set(text).await?;
                debug!(len = text.chars().count(), restore = restore_clipboard, "paste");
                report = self
                    .input
                    .chord(&[VirtualKey::CONTROL], &[VirtualKey::KEY_V])
                    .await;

                if *restore_clipboard {
                    if let Some(prev) = previous {
                        sleep(Duration::from_millis(settings.clipboard_restore_delay_ms)).await;
                        if let Err(e) = self.clipboard_set(&prev).await {
                            warn!(error = %e, "Could not restore clipboard");
                        }
                    }
                }
            }

            Action::Launch { command } => {
                info!(command = %command, "launch");
                report = self
                    .input
                    .chord(&[VirtualKey::LWIN], &[VirtualKey::KEY_R])
                    .await;
                sleep(Duration::from_millis(settings.launch_warmup_ms)).await;
                report.merge(
                    self.input
                        .type_text(command, Duration::from_millis(settings.launch_type_interval_ms))
                        .await,
                );
                report.merge(self.input.tap(VirtualKey::RETURN).await);
            }

            Action::Mouse {
                x,
                y,
                button,
                clicks,
                interval,
                move_only,
            } => {
                let image = mapper
                    .image()
                    .filter(|i| i.is_valid())
                    .ok_or(ExecError::NoImage)?;
                if !image.contains(*x, *y) {
                    return Err(ExecError::OutOfBounds {
                        x: *x,
                        y: *y,
                        max_x: image.width - 1,
                        max_y: image.height - 1,
                    });
                }

                // In bounds, so both fit in i32
                let (sx, sy) = mapper.map_from_image_pixel(*x as i32, *y as i32);
                debug!(img_x = x, img_y = y, screen_x = sx, screen_y = sy, ?button, clicks, move_only, "mouse");

                self.input.move_cursor(sx, sy).await;
                if !*move_only {
                    let gap = interval
                        .unwrap_or_else(|| Duration::from_millis(settings.mouse_click_interval_ms));
                    for _ in 0..*clicks {
                        report.merge(self.input.mouse_button(*button));
                        sleep(gap).await;
                    }
                }
            }

            Action::FocusWindow { title } => match self.windows.focus_by_title(title)? {
                Some(w) => debug!(title = %w.title, "focus_window"),
                None => return Err(ExecError::WindowNotFound(title.clone())),
            },

            Action::Unknown { tool, .. } => {
                debug!(tool = %tool, "no-op");
            }
        }

        Ok(report)
    }

    // Clipboard backends retry with blocking pauses, so keep them off the runtime.
    async fn clipboard_get(&self) -> Option<String> {
        let clipboard = Arc::clone(&self.clipboard);
        tokio::task::spawn_blocking(move || clipboard.get_text())
            .await
            .ok()
            .flatten()
    }

    async fn clipboard_set(&self, text: &str) -> Result<(), ClipboardError> {
        let clipboard = Arc::clone(&self.clipboard);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || clipboard.set_text(&text))
            .await
            .unwrap_or_else(|e| {
                Err(ClipboardError::SetFailed {
                    attempts: 0,
                    message: e.to_string(),
                })
            })
    }
}

async fn sleep(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskpilot_vision::input::mock::RecordingBackend;
    use deskpilot_vision::input::{InputEvent, KeyStroke};
    use deskpilot_vision::window::mock::MockWindows;
    use deskpilot_vision::{CapturedImage, InputSettings, MemoryClipboard, MouseButton, ScreenGeometry};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        backend: Arc<RecordingBackend>,
        clipboard: Arc<MemoryClipboard>,
        windows: Arc<MockWindows>,
        exec: ActionExecutor<Arc<RecordingBackend>>,
    }

    fn harness_with(backend: RecordingBackend, clipboard: MemoryClipboard) -> Harness {
        let backend = Arc::new(backend);
        let clipboard = Arc::new(clipboard);
        let windows = Arc::new(MockWindows::new(["Untitled - Notepad", "Calculator"]));
        let exec = ActionExecutor::new(
            InputDispatcher::new(backend.clone(), InputSettings::immediate()),
            clipboard.clone(),
            windows.clone(),
        );
        Harness {
            backend,
            clipboard,
            windows,
            exec,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingBackend::new(), MemoryClipboard::new())
    }

    fn mapper(w: i32, h: i32) -> CoordinateMapper {
        CoordinateMapper::new()
            .with_geometry(ScreenGeometry::new(0, 0, 1920, 1080))
            .with_image(CapturedImage::new(w, h))
    }

    fn keys(events: &[InputEvent]) -> Vec<KeyStroke> {
        events
            .iter()
            .filter_map(|e| match e {
                InputEvent::Key(k) => Some(*k),
                _ => None,
            })
            .collect()
    }

    fn step(tool: &str, args: serde_json::Value) -> Step {
        Step::new(tool, args, "test")
    }

    #[tokio::test]
    async fn test_mouse_out_of_bounds_has_no_side_effects() {
        let h = harness();
        let m = mapper(1920, 1080);

        let out = h.exec.execute_step(&step("mouse", json!({"x": 1920, "y": 10})), &m).await;
        assert!(matches!(out, StepOutcome::Skipped(ref r) if r.contains("Out of bounds")));
        let out = h.exec.execute_step(&step("mouse", json!({"x": -1, "y": 10})), &m).await;
        assert!(matches!(out, StepOutcome::Skipped(_)));
        assert_eq!(h.backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_mouse_without_image_rejected() {
        let h = harness();
        let m = CoordinateMapper::new().with_geometry(ScreenGeometry::new(0, 0, 1920, 1080));
        let out = h.exec.execute_step(&step("mouse", json!({"x": 1, "y": 1})), &m).await;
        assert_eq!(out, StepOutcome::Skipped("No image size in session".to_string()));
        assert_eq!(h.backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_mouse_scales_and_clicks() {
        let geometry = ScreenGeometry::new(-1920, 0, 3840, 1080);
        let h = harness_with(RecordingBackend::new().with_screen(geometry), MemoryClipboard::new());
        let m = CoordinateMapper::new()
            .with_geometry(geometry)
            .with_image(CapturedImage::new(1920, 540));

        let out = h
            .exec
            .execute_step(&step("mouse", json!({"x": 960, "y": 270, "clicks": 2})), &m)
            .await;

        assert!(matches!(out, StepOutcome::Executed(_)));
        assert_eq!(h.backend.cursor(), (0, 540));
        assert_eq!(h.backend.set_cursor_calls(), 1);
        assert_eq!(h.backend.clicks(MouseButton::Left), 2);
    }

    #[tokio::test]
    async fn test_mouse_move_only() {
        let h = harness();
        let out = h
            .exec
            .execute_step(&step("mouse", json!({"x": 5, "y": 6, "action": "move", "button": "right"})), &mapper(1920, 1080))
            .await;
        assert!(matches!(out, StepOutcome::Executed(_)));
        assert_eq!(h.backend.cursor(), (5, 6));
        assert_eq!(h.backend.clicks(MouseButton::Right), 0);
        assert_eq!(h.backend.send_calls(), 0);
    }

    #[tokio::test]
    async fn test_press_taps_each_key() {
        let h = harness();
        h.exec
            .execute_step(&step("press", json!({"keys": ["tab", "enter"]})), &mapper(10, 10))
            .await;
        let ks = keys(&h.backend.events());
        assert_eq!(ks.len(), 4);
        assert_eq!(ks[0].scan, RecordingBackend::scan_for(VirtualKey::TAB));
        assert_eq!(ks[2].scan, RecordingBackend::scan_for(VirtualKey::RETURN));
        assert!(ks[1].is_up() && ks[3].is_up());
    }

    #[tokio::test]
    async fn test_hotkey_chord() {
        let h = harness();
        h.exec
            .execute_step(&step("hotkey", json!({"keys": ["ctrl", "c"]})), &mapper(10, 10))
            .await;
        let ks = keys(&h.backend.events());
        let ctrl = RecordingBackend::scan_for(VirtualKey::CONTROL);
        let c = RecordingBackend::scan_for(VirtualKey::letter('c').unwrap());
        let seq: Vec<(u16, bool)> = ks.iter().map(|k| (k.scan, k.is_up())).collect();
        assert_eq!(seq, vec![(ctrl, false), (c, false), (c, true), (ctrl, true)]);
    }

    #[tokio::test]
    async fn test_launch_sequence() {
        let h = harness();
        h.exec
            .execute_step(&step("launch", json!({"command": "calc"})), &mapper(10, 10))
            .await;
        let ks = keys(&h.backend.events());
        // Win+R chord, four unicode pairs, Enter tap
        assert_eq!(ks.len(), 4 + 8 + 2);
        assert_eq!(ks[0].scan, RecordingBackend::scan_for(VirtualKey::LWIN));
        assert!(ks[4..12].iter().all(|k| k.flags.unicode));
        assert_eq!(ks[4].scan, 'c' as u16);
        assert_eq!(ks[12].scan, RecordingBackend::scan_for(VirtualKey::RETURN));
    }

    #[tokio::test]
    async fn test_paste_restores_previous_text() {
        let h = harness_with(RecordingBackend::new(), MemoryClipboard::with_text("old"));
        let out = h
            .exec
            .execute_step(&step("paste", json!({"text": "new", "restore_clipboard": true})), &mapper(10, 10))
            .await;
        assert!(matches!(out, StepOutcome::Executed(_)));
        assert_eq!(h.clipboard.history(), vec!["new".to_string(), "old".to_string()]);
        assert_eq!(keys(&h.backend.events()).len(), 4);
    }

    #[tokio::test]
    async fn test_paste_without_restore_leaves_text() {
        let h = harness_with(RecordingBackend::new(), MemoryClipboard::with_text("old"));
        h.exec
            .execute_step(&step("paste", json!({"text": "new"})), &mapper(10, 10))
            .await;
        assert_eq!(h.clipboard.get_text().as_deref(), Some("new"));
    }

    /// Holds the calling thread on every write.
    struct SlowClipboard(MemoryClipboard);

    impl Clipboard for SlowClipboard {
        fn get_text(&self) -> Option<String> {
            self.0.get_text()
        }

        fn set_text(&self, text: &str) -> deskpilot_vision::ClipboardResult<()> {
            std::thread::sleep(Duration::from_millis(300));
            self.0.set_text(text)
        }
    }

    #[tokio::test]
    async fn test_paste_keeps_runtime_responsive() {
        let exec = ActionExecutor::new(
            InputDispatcher::new(RecordingBackend::new(), InputSettings::immediate()),
            Arc::new(SlowClipboard(MemoryClipboard::new())),
            Arc::new(MockWindows::new(Vec::<String>::new())),
        );
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let ticker = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let out = exec
            .execute_step(&step("paste", json!({"text": "slow"})), &mapper(10, 10))
            .await;
        ticker.abort();

        assert!(matches!(out, StepOutcome::Executed(_)));
        assert!(ticks.load(Ordering::SeqCst) >= 5);
    }

    #[tokio::test]
    async fn test_paste_clipboard_failure_skips() {
        let h = harness_with(RecordingBackend::new(), MemoryClipboard::failing());
        let out = h
            .exec
            .execute_step(&step("paste", json!({"text": "x"})), &mapper(10, 10))
            .await;
        assert!(matches!(out, StepOutcome::Skipped(_)));
        assert_eq!(h.backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_focus_window() {
        let h = harness();
        let out = h
            .exec
            .execute_step(&step("focus_window", json!({"title": "notepad"})), &mapper(10, 10))
            .await;
        assert!(matches!(out, StepOutcome::Executed(_)));
        assert_eq!(h.windows.focused(), vec!["Untitled - Notepad".to_string()]);

        let out = h
            .exec
            .execute_step(&step("focus_window", json!({"title": "paint"})), &mapper(10, 10))
            .await;
        assert!(matches!(out, StepOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_steps_do_nothing() {
        let h = harness();
        let m = mapper(10, 10);
        assert_eq!(h.exec.execute_step(&step("scroll", json!({"dy": 1})), &m).await, StepOutcome::Ignored);
        assert!(matches!(
            h.exec.execute_step(&step("write", json!({"txt": "a"})), &m).await,
            StepOutcome::Skipped(_)
        ));
        assert_eq!(h.backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_injection_still_executes() {
        let h = harness_with(RecordingBackend::new().rejecting(5), MemoryClipboard::new());
        let out = h
            .exec
            .execute_step(&step("press", json!({"key": "esc"})), &mapper(10, 10))
            .await;
        match out {
            StepOutcome::Executed(r) => {
                assert_eq!(r.accepted, 0);
                assert_eq!(r.os_error, Some(5));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
