//! # Control Loop
//!
//! Drives one objective to completion: capture the screen, ask the model for a
//! plan, execute the plan's steps, repeat.
//!
//! ## Turn Lifecycle
//!
//! ```text
//! capture ──► context JSON ──► model ──► parse ──► execute steps ──► (next turn)
//!                                 │         │
//!                         empty: stop   invalid: next turn
//! ```
//!
//! The loop ends when the model returns a plan with no steps and a `done`
//! message, when the iteration budget is spent, when the model returns
//! nothing, or when the cancellation token fires.

use crate::context::{History, TurnContext};
use crate::executor::{ActionExecutor, StepOutcome};
use crate::plan::parse_plan;
use crate::transcript::Transcript;
use crate::Result;
use deskpilot_providers::{InferenceRequest, ModelClient};
use deskpilot_vision::{CoordinateMapper, InputBackend, ScreenCapture, Screenshot};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Observer for human-readable progress. Runs off the loop task; panics
/// inside it are swallowed.
pub type StatusCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Hands status messages to the observer on a blocking thread, in order.
struct StatusRelay {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl StatusRelay {
    fn start(callback: Option<&StatusCallback>) -> Self {
        let Some(callback) = callback else {
            return Self { tx: None };
        };
        let callback = Arc::clone(callback);
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        tokio::task::spawn_blocking(move || {
            while let Some(message) = rx.blocking_recv() {
                if std::panic::catch_unwind(AssertUnwindSafe(|| callback(&message))).is_err() {
                    debug!("Status callback panicked");
                }
            }
        });
        Self { tx: Some(tx) }
    }

    fn send(&self, message: &str) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(message.to_string());
        }
    }
}

/// Loop tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Iteration budget
    pub max_steps: u32,
    /// Pause after each step
    pub step_delay: Duration,
    /// Shorter pause after each step that ran, before `step_delay`
    pub inter_step_delay: Duration,
    pub keyboard_only_mode: bool,
    /// Upper bound on one model call
    pub model_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: 30,
            step_delay: Duration::from_millis(500),
            inter_step_delay: Duration::from_millis(100),
            keyboard_only_mode: false,
            model_timeout: Duration::from_secs(90),
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The model reported completion with this message
    Done(String),
    BudgetExhausted,
    /// The model returned nothing usable (or failed)
    EmptyResponse,
    Cancelled,
}

/// Result of one objective.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub iterations: u32,
    pub reason: StopReason,
    pub history: History,
}

impl RunOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self.reason, StopReason::Done(_))
    }
}

/// The screenshot → plan → act loop.
pub struct Engine<B> {
    config: EngineConfig,
    system_prompt: String,
    capture: Arc<dyn ScreenCapture>,
    model: Arc<dyn ModelClient>,
    executor: ActionExecutor<B>,
    status: Option<StatusCallback>,
    transcript: Transcript,
    screenshot_dir: Option<PathBuf>,
}

impl<B: InputBackend> Engine<B> {
    pub fn new(
        config: EngineConfig,
        system_prompt: impl Into<String>,
        capture: Arc<dyn ScreenCapture>,
        model: Arc<dyn ModelClient>,
        executor: ActionExecutor<B>,
    ) -> Self {
        Self {
            config,
            system_prompt: system_prompt.into(),
            capture,
            model,
            executor,
            status: None,
            transcript: Transcript::disabled(),
            screenshot_dir: None,
        }
    }

    pub fn with_status(mut self, callback: StatusCallback) -> Self {
        self.status = Some(callback);
        self
    }

    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn with_screenshot_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.screenshot_dir = dir;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one objective until done, out of budget, empty, or cancelled.
    ///
    /// Only capture failures and context serialization errors escape; model
    /// and step failures are logged and absorbed by the loop.
    pub async fn run(&self, objective: &str, cancel: &CancellationToken) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let max_steps = self.config.max_steps;
        let mut history = History::new();
        let mut mapper = CoordinateMapper::new();
        let mut iterations: u32 = 0;
        let status = StatusRelay::start(self.status.as_ref());

        info!(%run_id, max_steps, "Starting objective: {}", objective);

        match self.capture.refresh_geometry().await {
            Ok(geometry) => mapper.set_geometry(geometry),
            Err(e) => warn!(error = %e, "Could not read desktop geometry up front"),
        }

        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if iterations >= max_steps {
                warn!(max_steps, "Iteration budget exhausted");
                break StopReason::BudgetExhausted;
            }
            iterations += 1;

            let shot = self.capture.capture().await?;
            mapper.set_geometry(shot.geometry);
            mapper.record_image(shot.image);
            self.save_screenshot(iterations, &shot).await;

            let context = TurnContext::new(
                objective,
                iterations - 1,
                &history,
                self.config.keyboard_only_mode,
                shot.image,
                shot.geometry,
            )
            .to_json()?;

            info!(
                turn = iterations,
                kb = shot.png.len() / 1024,
                "Turn {}: sending screenshot",
                iterations
            );
            status.send("Thinking...");

            let request = InferenceRequest::new(
                self.system_prompt.clone(),
                objective,
                context.clone(),
                shot.png,
            );

            let inference = tokio::time::timeout(self.config.model_timeout, self.model.infer(&request));
            let reply = tokio::select! {
                _ = cancel.cancelled() => None,
                result = inference => Some(match result {
                    Ok(Ok(text)) => text,
                    Ok(Err(e)) => {
                        warn!(model = self.model.name(), error = %e, "Model call failed");
                        String::new()
                    }
                    Err(_) => {
                        warn!(
                            model = self.model.name(),
                            timeout_secs = self.config.model_timeout.as_secs_f64(),
                            "Model call timed out"
                        );
                        String::new()
                    }
                }),
            };
            let Some(text) = reply else {
                break StopReason::Cancelled;
            };

            if let Err(e) = self.transcript.append(&self.system_prompt, &context, &text).await {
                warn!(error = %e, "Transcript write failed");
            }

            if text.trim().is_empty() {
                warn!(turn = iterations, "Empty model response, stopping");
                break StopReason::EmptyResponse;
            }

            let mut plan = match parse_plan(&text) {
                Ok(plan) => plan,
                Err(e) => {
                    warn!(turn = iterations, error = %e, "Plan rejected");
                    continue;
                }
            };

            let remaining = (max_steps - (iterations - 1)).max(1) as usize;
            if plan.steps.len() > remaining {
                warn!(
                    steps = plan.steps.len(),
                    remaining, "Plan exceeds the remaining budget, truncating"
                );
                plan.steps.truncate(remaining);
            }

            if plan.is_complete() {
                let message = plan.done.unwrap_or_default();
                info!(turn = iterations, "Done: {}", message);
                break StopReason::Done(message);
            }

            info!(turn = iterations, steps = plan.steps.len(), "Received plan");

            for step in &plan.steps {
                if cancel.is_cancelled() {
                    return Ok(self.finish(run_id, iterations, StopReason::Cancelled, history));
                }

                info!("[Do] {} :: {}", step.tool, step.justification);
                status.send(&step.justification);

                let ran = AssertUnwindSafe(self.executor.execute_step(step, &mapper))
                    .catch_unwind()
                    .await;
                match ran {
                    Ok(outcome) => {
                        if let StepOutcome::Executed(report) = &outcome {
                            debug!(tool = %step.tool, accepted = report.accepted, "Step executed");
                        }
                        history.record(&step.tool, &step.args);
                        pause(self.config.inter_step_delay, cancel).await;
                    }
                    Err(_) => warn!(tool = %step.tool, "Step panicked; continuing"),
                }
                pause(self.config.step_delay, cancel).await;
            }
        };

        Ok(self.finish(run_id, iterations, reason, history))
    }

    fn finish(&self, run_id: Uuid, iterations: u32, reason: StopReason, history: History) -> RunOutcome {
        info!(%run_id, iterations, reason = ?reason, "Run finished");
        RunOutcome {
            run_id,
            iterations,
            reason,
            history,
        }
    }

    async fn save_screenshot(&self, turn: u32, shot: &Screenshot) {
        let Some(dir) = &self.screenshot_dir else {
            return;
        };
        let path = dir.join(format!("turn_{turn:03}.png"));
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, &shot.png).await
        }
        .await;
        match written {
            Ok(()) => debug!(path = %path.display(), "Screenshot saved"),
            Err(e) => warn!(path = %path.display(), error = %e, "Screenshot save failed"),
        }
    }
}

/// Sleep unless cancelled first.
async fn pause(duration: Duration, cancel: &CancellationToken) {
    if duration.is_zero() {
        return;
    }
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}
