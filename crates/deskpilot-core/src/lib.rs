//! # deskpilot Core
//!
//! The planning loop: parse what the model asked for, carry it out on the
//! desktop, and feed the result back on the next turn.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Engine                            │
//! │                                                          │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐  │
//! │  │ Capture  │─►│  Model   │─►│  Plan    │─►│ Executor │  │
//! │  │ (vision) │  │(providers│  │  Parser  │  │          │  │
//! │  └──────────┘  └──────────┘  └──────────┘  └──────────┘  │
//! │        ▲                                        │        │
//! │        └────────── History / Context ◄──────────┘        │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod config;
pub mod context;
pub mod engine;
pub mod executor;
pub mod plan;
pub mod transcript;

pub use action::{Action, ArgError};
pub use config::{AppConfig, ConfigError, ModelProvider};
pub use context::{History, TurnContext};
pub use engine::{Engine, EngineConfig, RunOutcome, StatusCallback, StopReason};
pub use executor::{ActionExecutor, ExecError, StepOutcome};
pub use plan::{parse_plan, ActionPlan, ParseError, Step};
pub use transcript::Transcript;

use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Capture error: {0}")]
    CaptureError(#[from] deskpilot_vision::CaptureError),

    #[error("Provider error: {0}")]
    ProviderError(#[from] deskpilot_providers::ProviderError),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
