//! Debug transcript of every model exchange.

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Appends each turn's prompt, context and raw model text to a file.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    path: Option<PathBuf>,
}

impl Transcript {
    /// A transcript writing to `path`; an empty path disables it.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.filter(|p| !p.as_os_str().is_empty()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Format of one turn's entry.
    pub fn entry(system_prompt: &str, context_json: &str, model_text: &str) -> String {
        format!(
            "System Prompt:\n{system_prompt}\nUser Context:\n{context_json}llmText:\n{model_text}\n"
        )
    }

    /// Append one turn. A disabled transcript does nothing.
    pub async fn append(
        &self,
        system_prompt: &str,
        context_json: &str,
        model_text: &str,
    ) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(Self::entry(system_prompt, context_json, model_text).as_bytes())
            .await?;
        file.flush().await
    }
}
