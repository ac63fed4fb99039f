//! Scripted model for tests.

use crate::{InferenceRequest, ModelClient, ProviderError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

enum Script {
    /// Same reply every call
    Repeat(String),
    /// Replies in order; the last one repeats once the queue is drained
    Sequence(VecDeque<String>, String),
    Fail,
}

/// A `ModelClient` that returns canned responses and records every request.
pub struct ScriptedModel {
    script: Mutex<Script>,
    requests: Mutex<Vec<InferenceRequest>>,
    delay: Duration,
}

impl ScriptedModel {
    /// Reply with `text` on every call.
    pub fn always(text: impl Into<String>) -> Self {
        Self::with_script(Script::Repeat(text.into()))
    }

    /// Reply with each response in turn, repeating the last.
    pub fn sequence<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queue: VecDeque<String> = responses.into_iter().map(Into::into).collect();
        let last = queue.pop_back().unwrap_or_default();
        Self::with_script(Script::Sequence(queue, last))
    }

    /// Every call fails with an API error.
    pub fn failing() -> Self {
        Self::with_script(Script::Fail)
    }

    /// Wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with_script(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_reply(&self) -> Result<String> {
        let mut script = self
            .script
            .lock()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        match &mut *script {
            Script::Repeat(text) => Ok(text.clone()),
            Script::Sequence(queue, last) => Ok(queue.pop_front().unwrap_or_else(|| last.clone())),
            Script::Fail => Err(ProviderError::ApiError {
                status: 500,
                message: "scripted failure".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<String> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(request.clone());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.next_reply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequence_repeats_last() {
        let m = ScriptedModel::sequence(["a", "b"]);
        let req = InferenceRequest::default();
        assert_eq!(m.infer(&req).await.unwrap(), "a");
        assert_eq!(m.infer(&req).await.unwrap(), "b");
        assert_eq!(m.infer(&req).await.unwrap(), "b");
        assert_eq!(m.calls(), 3);
    }

    #[tokio::test]
    async fn test_failing() {
        let m = ScriptedModel::failing();
        assert!(m.infer(&InferenceRequest::default()).await.is_err());
        assert_eq!(m.calls(), 1);
    }

    #[test]
    fn test_requests_are_recorded() {
        let m = ScriptedModel::always("{}");
        let req = InferenceRequest::new("sys", "open notepad", "{\"step_num\":0}", vec![1, 2, 3]);
        let reply = tokio_test::assert_ok!(tokio_test::block_on(m.infer(&req)));
        assert_eq!(reply, "{}");

        let seen = m.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].objective, "open notepad");
        assert_eq!(seen[0].screenshot_png, vec![1, 2, 3]);
    }
}
