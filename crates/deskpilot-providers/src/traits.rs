//! # Provider Traits
//!
//! The contract every model backend implements.

use crate::Result;
use async_trait::async_trait;
use base64::Engine;

/// Everything a single planning call needs.
#[derive(Debug, Clone, Default)]
pub struct InferenceRequest {
    /// Instruction prompt steering the model
    pub system_prompt: String,
    /// The user's objective, sent verbatim and as base64
    pub objective: String,
    /// Per-turn context object, already serialized
    pub context_json: String,
    /// PNG bytes of the current screenshot
    pub screenshot_png: Vec<u8>,
}

impl InferenceRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        objective: impl Into<String>,
        context_json: impl Into<String>,
        screenshot_png: Vec<u8>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            objective: objective.into(),
            context_json: context_json.into(),
            screenshot_png,
        }
    }

    pub fn objective_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.objective.as_bytes())
    }

    pub fn screenshot_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.screenshot_png)
    }
}

/// A multimodal model that turns a screenshot and context into text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Backend name used in logs (e.g. "openai", "remote")
    fn name(&self) -> &str;

    /// Issue one inference call and return the model's raw text.
    ///
    /// An empty string means the model produced nothing usable.
    async fn infer(&self, request: &InferenceRequest) -> Result<String>;
}

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<String> {
        (**self).infer(request).await
    }
}
