//! Wiring for a single objective: config, prompt, model client, platform
//! collaborators, and the control loop.

use crate::cli::Cli;
use anyhow::{Context, Result};
use colored::Colorize;
use deskpilot_core::{AppConfig, EngineConfig, ModelProvider, RunOutcome, StatusCallback, StopReason};
use deskpilot_providers::{ModelClient, OpenAiResponsesClient, RemoteClient};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run one objective end to end. `Err` means a fatal error (exit 2).
pub async fn execute(cli: &Cli) -> Result<ExitCode> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_to(&mut config);
    if let Some(path) = config.loaded_from() {
        debug!("Configuration loaded from {:?}", path);
    }

    let objective = match cli.objective_text() {
        Some(text) => text,
        None => prompt_objective().context("Failed to read objective from stdin")?,
    };
    let objective = objective.trim().to_string();
    if objective.is_empty() {
        eprintln!("{}", "No objective given.".yellow());
        return Ok(ExitCode::from(1));
    }

    config.validate().context("Invalid configuration")?;
    let system_prompt = read_system_prompt(&config.run.system_prompt_path)?;

    let model = build_model(&config)?;
    info!(provider = model.name(), model = %config.model.model, "Model client ready");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current action");
            on_interrupt.cancel();
        }
    });

    let outcome = drive(&config, system_prompt, model, &objective, &cancel).await?;
    report(&outcome);
    Ok(ExitCode::SUCCESS)
}

#[cfg_attr(not(windows), allow(dead_code))]
fn engine_config(config: &AppConfig) -> EngineConfig {
    EngineConfig {
        max_steps: config.run.max_steps,
        step_delay: config.step_delay(),
        inter_step_delay: config.inter_step_delay(),
        keyboard_only_mode: config.run.keyboard_only_mode,
        model_timeout: config.request_timeout(),
    }
}

fn read_system_prompt(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("System prompt not found at {}", path.display()))
}

fn prompt_objective() -> io::Result<String> {
    print!("{} ", "Enter objective:".bright_white());
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input)
}

fn build_model(config: &AppConfig) -> Result<Arc<dyn ModelClient>> {
    let timeout = config.request_timeout();
    let client: Arc<dyn ModelClient> = match config.provider()? {
        ModelProvider::OpenAi => {
            let key = config.model.api_key.clone().unwrap_or_default();
            Arc::new(
                OpenAiResponsesClient::with_base_url(key, &config.model.base_url, timeout)?
                    .with_model(&config.model.model),
            )
        }
        ModelProvider::Remote => Arc::new(RemoteClient::new(&config.model.remote_url, timeout)?),
    };
    Ok(client)
}

/// Prints progress lines for a human watching the run.
#[cfg_attr(not(windows), allow(dead_code))]
fn status_printer() -> StatusCallback {
    Arc::new(|message: &str| {
        println!("{} {}", "›".bright_cyan(), message);
    })
}

#[cfg(windows)]
async fn drive(
    config: &AppConfig,
    system_prompt: String,
    model: Arc<dyn ModelClient>,
    objective: &str,
    cancel: &CancellationToken,
) -> Result<RunOutcome> {
    use deskpilot_core::{ActionExecutor, Engine, Transcript};
    use deskpilot_vision::{
        Clipboard, InputDispatcher, MemoryClipboard, ScreenCapture, SystemClipboard, Win32Backend,
        Win32Windows, XcapCapture,
    };

    Win32Backend::enable_dpi_awareness();

    let capture: Arc<dyn ScreenCapture> = Arc::new(XcapCapture::new(config.capture.clone()));
    let clipboard: Arc<dyn Clipboard> = match SystemClipboard::new() {
        Ok(clipboard) => Arc::new(clipboard),
        Err(e) => {
            warn!(error = %e, "System clipboard unavailable, paste will not reach other apps");
            Arc::new(MemoryClipboard::new())
        }
    };
    let executor = ActionExecutor::new(
        InputDispatcher::new(Win32Backend::new(), config.input.clone()),
        clipboard,
        Arc::new(Win32Windows),
    );

    let engine = Engine::new(engine_config(config), system_prompt, capture, model, executor)
        .with_status(status_printer())
        .with_transcript(Transcript::new(config.transcript_path().map(Path::to_path_buf)))
        .with_screenshot_dir(config.run.screenshot_dir.clone());

    Ok(engine.run(objective, cancel).await?)
}

#[cfg(not(windows))]
async fn drive(
    _config: &AppConfig,
    _system_prompt: String,
    _model: Arc<dyn ModelClient>,
    _objective: &str,
    _cancel: &CancellationToken,
) -> Result<RunOutcome> {
    anyhow::bail!("No input backend for this platform; deskpilot drives Windows desktops only")
}

fn report(outcome: &RunOutcome) {
    match &outcome.reason {
        StopReason::Done(message) => {
            println!("{} {}", "Done:".bright_green(), message);
        }
        StopReason::BudgetExhausted => {
            println!(
                "{} stopped after {} turns without completion",
                "Budget spent:".bright_yellow(),
                outcome.iterations
            );
        }
        StopReason::EmptyResponse => {
            println!("{} the model returned no plan", "Stopped:".bright_yellow());
        }
        StopReason::Cancelled => {
            println!("{} by user", "Cancelled".bright_yellow());
        }
    }
    debug!(run_id = %outcome.run_id, actions = outcome.history.len(), "Run summary");
}
