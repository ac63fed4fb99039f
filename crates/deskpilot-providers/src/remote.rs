//! # Remote Proxy Client
//!
//! Forwards the prepared payload to a trusted server that talks to the real
//! model. The server's body is handed back untouched; envelope unwrapping
//! happens in the plan parser.

use crate::{retry_after, status_error, InferenceRequest, ModelClient, ProviderError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_REMOTE_URL: &str = "http://localhost:8009/";

/// Client for a deskpilot-compatible inference proxy
pub struct RemoteClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemotePayload<'a> {
    system_prompt: &'a str,
    original_user_request: &'a str,
    original_user_request_base64: String,
    user_context_json: &'a str,
    screenshot_png_base64: String,
}

impl RemoteClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(ProviderError::ConfigError("remote endpoint is empty".to_string()));
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.trim().to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ModelClient for RemoteClient {
    fn name(&self) -> &str {
        "remote"
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<String> {
        let payload = RemotePayload {
            system_prompt: &request.system_prompt,
            original_user_request: &request.objective,
            original_user_request_base64: request.objective_base64(),
            user_context_json: &request.context_json,
            screenshot_png_base64: request.screenshot_base64(),
        };
        debug!(endpoint = %self.endpoint, "Remote inference call");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout.as_secs())
                } else {
                    ProviderError::HttpError(e)
                }
            })?;

        let status = response.status();
        let retry = retry_after(response.headers());
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), body, retry));
        }
        Ok(body)
    }
}
