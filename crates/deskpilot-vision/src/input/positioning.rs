//! Cursor placement as a small state machine.
//!
//! ```text
//! Attempted(n) ──within tolerance──▶ Verified
//!      │ n == max attempts, still off
//!      ▼
//!   Drifted ──absolute move sent──▶ FallbackSent ──within──▶ Verified
//!                                        └──────still off──▶ DriftedFinal
//! ```
//!
//! The machine only records observations. The dispatcher performs the OS calls
//! and feeds results back in, which keeps the transitions testable without a
//! desktop.

use serde::Serialize;

/// Where a placement currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PositionState {
    /// `n` set-position calls have been made and the last one was not yet accepted.
    Attempted(u32),
    Verified,
    /// Direct positioning is exhausted; the normalized fallback is next.
    Drifted,
    FallbackSent,
    DriftedFinal,
}

/// Final result of a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PositionOutcome {
    Verified { fallback_used: bool },
    Drifted { observed: Option<(i32, i32)> },
}

/// Ephemeral state for one cursor placement.
#[derive(Debug, Clone, Serialize)]
pub struct PositionAttempt {
    pub target: (i32, i32),
    pub attempts_made: u32,
    pub last_observed: Option<(i32, i32)>,
    pub fallback_sent: bool,
    state: PositionState,
    tolerance: i32,
    max_attempts: u32,
}

impl PositionAttempt {
    /// `max_attempts` counts direct set-position calls, including the first.
    pub fn new(target: (i32, i32), tolerance: i32, max_attempts: u32) -> Self {
        Self {
            target,
            attempts_made: 0,
            last_observed: None,
            fallback_sent: false,
            state: PositionState::Attempted(0),
            tolerance: tolerance.max(0),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            PositionState::Verified | PositionState::DriftedFinal
        )
    }

    /// Whether an observed point is close enough to the target on both axes.
    pub fn within_tolerance(&self, observed: (i32, i32)) -> bool {
        (observed.0 - self.target.0).abs() <= self.tolerance
            && (observed.1 - self.target.1).abs() <= self.tolerance
    }

    /// A direct set-position call was just issued.
    pub fn record_set_attempt(&mut self) {
        self.attempts_made += 1;
        self.state = PositionState::Attempted(self.attempts_made);
    }

    /// The normalized absolute move was just dispatched.
    pub fn record_fallback(&mut self) {
        self.fallback_sent = true;
        self.state = PositionState::FallbackSent;
    }

    /// Feed the read-back position (None when it could not be read).
    pub fn observe(&mut self, observed: Option<(i32, i32)>) -> PositionState {
        self.last_observed = observed;
        let ok = observed.is_some_and(|p| self.within_tolerance(p));

        self.state = match self.state {
            PositionState::Attempted(_) | PositionState::FallbackSent if ok => {
                PositionState::Verified
            }
            PositionState::Attempted(n) if n >= self.max_attempts => PositionState::Drifted,
            PositionState::FallbackSent => PositionState::DriftedFinal,
            other => other,
        };
        self.state
    }

    pub fn outcome(&self) -> PositionOutcome {
        match self.state {
            PositionState::Verified => PositionOutcome::Verified {
                fallback_used: self.fallback_sent,
            },
            _ => PositionOutcome::Drifted {
                observed: self.last_observed,
            },
        }
    }
}
