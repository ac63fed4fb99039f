//! # deskpilot CLI
//!
//! Reads an objective, then lets the model drive the desktop until it reports
//! completion.
//!
//! Exit codes: 0 when the run ends (done, budget spent, cancelled), 1 when no
//! objective was given, 2 on a fatal error.

mod cli;
mod run;

use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // Enable ANSI colors on Windows
    #[cfg(windows)]
    let _ = colored::control::set_virtual_terminal(true);

    let cli = Cli::parse();

    // RUST_LOG wins over -v/-q
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    if let Some(shell) = cli.completions {
        cli::generate_completions(shell);
        return ExitCode::SUCCESS;
    }

    match run::execute(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}
