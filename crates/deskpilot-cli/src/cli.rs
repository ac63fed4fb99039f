//! # CLI Arguments
//!
//! Command-line argument definitions using clap.

use clap::Parser;
use clap_complete::Shell;
use deskpilot_core::AppConfig;
use std::path::PathBuf;

/// deskpilot - let a vision model drive the desktop toward an objective
#[derive(Parser, Debug, Default)]
#[command(name = "deskpilot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// What to accomplish; words are joined with spaces. Prompted for when absent.
    pub objective: Vec<String>,

    /// Config file (merged over ./deskpilot.toml and the global config)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Provider to use: openai or remote (overrides config)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Maximum planning turns
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Ask the model to navigate with the keyboard only
    #[arg(short, long)]
    pub keyboard_only: bool,

    /// System prompt file
    #[arg(long)]
    pub system_prompt: Option<PathBuf>,

    /// Debug transcript file (empty string disables)
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Save every turn's screenshot into this directory
    #[arg(long)]
    pub screenshot_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress informational output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,
}

impl Cli {
    /// The objective given on the command line, if any words were passed.
    pub fn objective_text(&self) -> Option<String> {
        if self.objective.is_empty() {
            None
        } else {
            Some(self.objective.join(" "))
        }
    }

    /// Default log filter for the chosen verbosity.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    /// Apply flag overrides; flags beat every other source.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.model.model = model.clone();
        }
        if let Some(provider) = &self.provider {
            config.model.provider = provider.clone();
        }
        if let Some(steps) = self.max_steps {
            config.run.max_steps = steps;
        }
        if self.keyboard_only {
            config.run.keyboard_only_mode = true;
        }
        if let Some(path) = &self.system_prompt {
            config.run.system_prompt_path = path.clone();
        }
        if let Some(path) = &self.transcript {
            config.run.transcript_path = Some(path.clone());
        }
        if let Some(dir) = &self.screenshot_dir {
            config.run.screenshot_dir = Some(dir.clone());
        }
    }
}

/// Generate shell completions
pub fn generate_completions(shell: Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "deskpilot", &mut io::stdout());
}
