use super::backend::InputBackend;
use super::event::{DispatchReport, InputEvent, KeyFlags, KeyStroke, MouseEvent};
use super::keys::{MouseButton, VirtualKey};
use super::normalize_absolute;
use super::positioning::{PositionAttempt, PositionState};
use crate::config::InputSettings;
use std::time::Duration;
use tracing::{debug, warn};

/// The only component allowed to synthesize hardware input.
///
/// Every method returns the [`DispatchReport`] of what the OS accepted instead
/// of failing; rejected injections are logged with their OS error code.
pub struct InputDispatcher<B> {
    backend: B,
    settings: InputSettings,
}

impl<B: InputBackend> InputDispatcher<B> {
    pub fn new(backend: B, settings: InputSettings) -> Self {
        Self { backend, settings }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &InputSettings {
        &self.settings
    }

    fn dispatch(&self, events: &[InputEvent]) -> DispatchReport {
        if events.is_empty() {
            return DispatchReport::default();
        }
        let report = self.backend.send(events);
        if report.accepted == 0 {
            warn!(
                backend = self.backend.name(),
                requested = report.requested,
                os_error = ?report.os_error,
                "Input injection rejected"
            );
        } else if !report.is_complete() {
            warn!(
                backend = self.backend.name(),
                requested = report.requested,
                accepted = report.accepted,
                os_error = ?report.os_error,
                "Input injection partially accepted"
            );
        }
        report
    }

    /// Build a key event, preferring the hardware scan code.
    fn key_stroke(&self, key: VirtualKey, key_up: bool) -> KeyStroke {
        let scan = self.backend.scan_code(key);
        if scan != 0 {
            KeyStroke {
                vk: 0,
                scan,
                flags: KeyFlags {
                    key_up,
                    scancode: true,
                    extended: key.is_extended(),
                    unicode: false,
                },
            }
        } else {
            KeyStroke {
                vk: key.0,
                scan: 0,
                flags: KeyFlags {
                    key_up,
                    ..Default::default()
                },
            }
        }
    }

    pub fn key_down(&self, key: VirtualKey) -> DispatchReport {
        self.dispatch(&[InputEvent::Key(self.key_stroke(key, false))])
    }

    pub fn key_up(&self, key: VirtualKey) -> DispatchReport {
        self.dispatch(&[InputEvent::Key(self.key_stroke(key, true))])
    }

    /// Down, short hold, up.
    pub async fn tap(&self, key: VirtualKey) -> DispatchReport {
        debug!(key = %key, "tap");
        let mut report = self.key_down(key);
        sleep(self.settings.key_tap_hold()).await;
        report.merge(self.key_up(key));
        report
    }

    /// Inject text as Unicode key events, one UTF-16 unit at a time.
    pub async fn type_text(&self, text: &str, interval: Duration) -> DispatchReport {
        debug!(chars = text.chars().count(), interval_ms = interval.as_millis() as u64, "type_text");
        let mut report = DispatchReport::default();
        for unit in text.encode_utf16() {
            report.merge(self.dispatch(&[
                InputEvent::Key(KeyStroke::unicode(unit, false)),
                InputEvent::Key(KeyStroke::unicode(unit, true)),
            ]));
            sleep(interval).await;
        }
        report
    }

    /// Press modifiers, then normals; release normals then modifiers, each in reverse.
    pub async fn chord(&self, modifiers: &[VirtualKey], normals: &[VirtualKey]) -> DispatchReport {
        debug!(?modifiers, ?normals, "chord");
        if modifiers.is_empty() && normals.len() == 1 {
            return self.tap(normals[0]).await;
        }

        let mut report = DispatchReport::default();
        for &m in modifiers {
            report.merge(self.key_down(m));
        }
        for &n in normals {
            report.merge(self.key_down(n));
        }
        for &n in normals.iter().rev() {
            report.merge(self.key_up(n));
        }
        for &m in modifiers.iter().rev() {
            report.merge(self.key_up(m));
        }
        report
    }

    /// Button down/up pair at the current cursor position.
    pub fn mouse_button(&self, button: MouseButton) -> DispatchReport {
        debug!(?button, "mouse_button");
        self.dispatch(&[
            InputEvent::Mouse(MouseEvent::Down(button)),
            InputEvent::Mouse(MouseEvent::Up(button)),
        ])
    }

    fn read_cursor(&self) -> Option<(i32, i32)> {
        match self.backend.cursor_pos() {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %e, "Could not read cursor position");
                None
            }
        }
    }

    /// Normalized absolute move across the whole virtual desktop.
    fn send_absolute_move(&self, x: i32, y: i32) -> DispatchReport {
        let screen = self.backend.virtual_screen();
        let nx = normalize_absolute(x, screen.origin_x, screen.width);
        let ny = normalize_absolute(y, screen.origin_y, screen.height);
        debug!(x, y, nx, ny, "absolute move fallback");
        self.dispatch(&[InputEvent::Mouse(MouseEvent::MoveAbsolute { x: nx, y: ny })])
    }

    /// Place the cursor on a screen pixel and verify it got there.
    ///
    /// Positioning is best-effort: the returned attempt records whether the
    /// cursor was verified, but callers proceed either way.
    pub async fn move_cursor(&self, x: i32, y: i32) -> PositionAttempt {
        let mut attempt = PositionAttempt::new(
            (x, y),
            self.settings.position_tolerance_px,
            self.settings.position_attempts,
        );

        while !attempt.is_finished() {
            match attempt.state() {
                PositionState::Attempted(n) => {
                    if n > 0 {
                        debug!(
                            target_x = x,
                            target_y = y,
                            observed = ?attempt.last_observed,
                            "Cursor drifted, retrying"
                        );
                    }
                    if let Err(e) = self.backend.set_cursor_pos(x, y) {
                        warn!(error = %e, x, y, "Set cursor position failed");
                    }
                    attempt.record_set_attempt();
                }
                PositionState::Drifted => {
                    self.send_absolute_move(x, y);
                    attempt.record_fallback();
                }
                PositionState::FallbackSent | PositionState::Verified | PositionState::DriftedFinal => {
                    break;
                }
            }
            sleep(self.settings.mouse_settle()).await;
            attempt.observe(self.read_cursor());
        }

        if attempt.state() == PositionState::DriftedFinal {
            warn!(
                target_x = x,
                target_y = y,
                observed = ?attempt.last_observed,
                "Cursor still off target after fallback"
            );
        }
        attempt
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
    use crate::geometry::ScreenGeometry;
    use crate::input::mock::RecordingBackend;
    use crate::input::PositionOutcome;
    use std::sync::Arc;

    fn dispatcher(backend: Arc<RecordingBackend>) -> InputDispatcher<Arc<RecordingBackend>> {
        InputDispatcher::new(backend, InputSettings::immediate())
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

    #[tokio::test]
    async fn test_tap_uses_scan_code_with_extended_flag() {
        let backend = Arc::new(RecordingBackend::new());
        let d = dispatcher(backend.clone());

        d.tap(VirtualKey::LEFT).await;
        let ks = keys(&backend.events());
        assert_eq!(ks.len(), 2);
        assert_eq!(ks[0].vk, 0);
        assert_eq!(ks[0].scan, RecordingBackend::scan_for(VirtualKey::LEFT));
        assert!(ks[0].flags.scancode && ks[0].flags.extended && !ks[0].flags.key_up);
        assert!(ks[1].flags.key_up && ks[1].flags.extended);
    }

    #[tokio::test]
    async fn test_modifier_not_extended() {
        let backend = Arc::new(RecordingBackend::new());
        let d = dispatcher(backend.clone());

        d.key_down(VirtualKey::CONTROL);
        let ks = keys(&backend.events());
        assert!(ks[0].flags.scancode);
        assert!(!ks[0].flags.extended);
    }

    #[tokio::test]
    async fn test_falls_back_to_virtual_key_without_scan_code() {
        let backend = Arc::new(RecordingBackend::new().without_scan_codes());
        let d = dispatcher(backend.clone());

        d.tap(VirtualKey::HOME).await;
        let ks = keys(&backend.events());
        assert_eq!(ks[0].vk, VirtualKey::HOME.0);
        assert_eq!(ks[0].scan, 0);
        // Extended flag only applies on the scan-code path
        assert!(!ks[0].flags.scancode && !ks[0].flags.extended);
    }

    #[tokio::test]
    async fn test_type_text_unicode_pairs() {
        let backend = Arc::new(RecordingBackend::new());
        let d = dispatcher(backend.clone());

        let report = d.type_text("hé", Duration::ZERO).await;
        let ks = keys(&backend.events());
        assert_eq!(ks.len(), 4);
        assert!(ks.iter().all(|k| k.flags.unicode && k.vk == 0));
        assert_eq!(ks[0].scan, 'h' as u16);
        assert_eq!(ks[2].scan, 'é' as u16);
        assert!(!ks[2].is_up() && ks[3].is_up());
        assert_eq!(report.accepted, 4);
        assert_eq!(backend.send_calls(), 2);
    }

    #[tokio::test]
    async fn test_chord_order() {
        let backend = Arc::new(RecordingBackend::new());
        let d = dispatcher(backend.clone());
        let a = VirtualKey::letter('a').unwrap();
        let b = VirtualKey::letter('b').unwrap();

        d.chord(&[VirtualKey::CONTROL, VirtualKey::SHIFT], &[a, b]).await;
        let seq: Vec<(u16, bool)> = keys(&backend.events())
            .iter()
            .map(|k| (k.scan, k.is_up()))
            .collect();
        let s = RecordingBackend::scan_for;
        assert_eq!(
            seq,
            vec![
                (s(VirtualKey::CONTROL), false),
                (s(VirtualKey::SHIFT), false),
                (s(a), false),
                (s(b), false),
                (s(b), true),
                (s(a), true),
                (s(VirtualKey::SHIFT), true),
                (s(VirtualKey::CONTROL), true),
            ]
        );
    }

    #[tokio::test]
    async fn test_chord_single_key_degenerates_to_tap() {
        let backend = Arc::new(RecordingBackend::new());
        let d = dispatcher(backend.clone());
        let a = VirtualKey::letter('a').unwrap();

        d.chord(&[], &[a]).await;
        let ks = keys(&backend.events());
        assert_eq!(ks.len(), 2);
        assert!(!ks[0].is_up() && ks[1].is_up());
        assert_eq!(ks[0].scan, ks[1].scan);
    }

    #[tokio::test]
    async fn test_pure_modifier_chord() {
        let backend = Arc::new(RecordingBackend::new());
        let d = dispatcher(backend.clone());

        d.chord(&[VirtualKey::LWIN], &[]).await;
        let ks = keys(&backend.events());
        assert_eq!(ks.len(), 2);
        assert!(ks[0].flags.extended);
        assert!(ks[1].is_up());
    }

    #[tokio::test]
    async fn test_mouse_button_pair_without_move() {
        let backend = Arc::new(RecordingBackend::new());
        let d = dispatcher(backend.clone());

        d.mouse_button(MouseButton::Right);
        assert_eq!(
            backend.events(),
            vec![
                InputEvent::Mouse(MouseEvent::Down(MouseButton::Right)),
                InputEvent::Mouse(MouseEvent::Up(MouseButton::Right)),
            ]
        );
        assert_eq!(backend.cursor(), (0, 0));
    }

    #[tokio::test]
    async fn test_rejected_injection_is_reported_not_raised() {
        let backend = Arc::new(RecordingBackend::new().rejecting(5));
        let d = dispatcher(backend.clone());

        let report = d.tap(VirtualKey::RETURN).await;
        assert_eq!(report.requested, 2);
        assert_eq!(report.accepted, 0);
        assert_eq!(report.os_error, Some(5));
    }

    #[tokio::test]
    async fn test_move_cursor_verified_directly() {
        let backend = Arc::new(RecordingBackend::new());
        let d = dispatcher(backend.clone());

        let attempt = d.move_cursor(300, 200).await;
        assert_eq!(attempt.outcome(), PositionOutcome::Verified { fallback_used: false });
        assert_eq!(backend.set_cursor_calls(), 1);
        assert_eq!(backend.absolute_moves(), 0);
    }

    #[tokio::test]
    async fn test_move_cursor_drift_invokes_fallback_once() {
        let backend = Arc::new(RecordingBackend::new().with_drift(10, 10));
        let d = dispatcher(backend.clone());

        let attempt = d.move_cursor(500, 400).await;
        assert_eq!(backend.set_cursor_calls(), 2);
        assert_eq!(backend.absolute_moves(), 1);
        assert_eq!(attempt.outcome(), PositionOutcome::Verified { fallback_used: true });
    }

    #[tokio::test]
    async fn test_move_cursor_drift_everywhere_ends_drifted() {
        let backend = Arc::new(
            RecordingBackend::new()
                .with_drift(10, 10)
                .with_absolute_drift(10, 10)
                .with_screen(ScreenGeometry::new(0, 0, 1920, 1080)),
        );
        let d = dispatcher(backend.clone());

        let attempt = d.move_cursor(500, 400).await;
        assert_eq!(backend.absolute_moves(), 1);
        assert_eq!(attempt.state(), PositionState::DriftedFinal);
        assert!(matches!(attempt.outcome(), PositionOutcome::Drifted { .. }));
    }

    #[tokio::test]
    async fn test_absolute_move_is_normalized() {
        let backend = Arc::new(
            RecordingBackend::new()
                .with_drift(50, 0)
                .with_screen(ScreenGeometry::new(-1920, 0, 3840, 1080)),
        );
        let d = dispatcher(backend.clone());

        d.move_cursor(0, 540).await;
        let moves: Vec<_> = backend
            .events()
            .into_iter()
            .filter_map(|e| match e {
                InputEvent::Mouse(MouseEvent::MoveAbsolute { x, y }) => Some((x, y)),
                _ => None,
            })
            .collect();
        assert_eq!(moves, vec![(32767, 32767)]);
    }
}
