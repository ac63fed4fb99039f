//! # OpenAI Responses Client
//!
//! Multimodal planning calls against the OpenAI `responses` endpoint.

use crate::response::extract_text_or_body;
use crate::{retry_after, status_error, InferenceRequest, ModelClient, ProviderError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
pub const DEFAULT_MODEL: &str = "gpt-4.1";

const CONTEXT_SUFFIX: &str = "\n\nSTRICTLY FOLLOW THE SYSTEM RULES. Return ONLY the raw JSON object.";

/// OpenAI Responses API client
pub struct OpenAiResponsesClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiResponsesClient {
    /// Create a client against the public API with the default model.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, timeout)
    }

    /// Create with a custom base URL (for compatible APIs)
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::ConfigError("OpenAI API key is empty".to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: normalize_base_url(&base_url.into()),
            model: DEFAULT_MODEL.to_string(),
            timeout,
        })
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}responses", self.base_url)
    }

    fn build_body(&self, request: &InferenceRequest) -> ResponsesRequest {
        ResponsesRequest {
            model: self.model.clone(),
            input: vec![
                RoleMessage {
                    role: "system",
                    content: vec![ContentPart::InputText {
                        text: request.system_prompt.clone(),
                    }],
                },
                RoleMessage {
                    role: "user",
                    content: vec![
                        ContentPart::InputText {
                            text: format!("ORIGINAL_USER_REQUEST_UTF8:\n{}", request.objective),
                        },
                        ContentPart::InputText {
                            text: format!("ORIGINAL_USER_REQUEST_BASE64:\n{}", request.objective_base64()),
                        },
                        ContentPart::InputText {
                            text: format!("USER_CONTEXT_JSON:\n{}{}", request.context_json, CONTEXT_SUFFIX),
                        },
                        ContentPart::InputImage {
                            image_url: format!("data:image/png;base64,{}", request.screenshot_base64()),
                        },
                    ],
                },
            ],
        }
    }
}

/// Ensure the base URL ends with exactly one `/`.
pub fn normalize_base_url(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}

#[async_trait]
impl ModelClient for OpenAiResponsesClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn infer(&self, request: &InferenceRequest) -> Result<String> {
        let body = self.build_body(request);
        let url = self.endpoint();
        debug!(model = %self.model, url = %url, "OpenAI responses call");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&body)
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
        let text = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), text, retry));
        }

        Ok(extract_text_or_body(&text))
    }
}

// OpenAI Responses API types

#[derive(Debug, Serialize)]
struct ResponsesRequest {
    model: String,
    input: Vec<RoleMessage>,
}

#[derive(Debug, Serialize)]
struct RoleMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    InputText { text: String },
    InputImage { image_url: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> InferenceRequest {
        InferenceRequest::new("be precise", "open notepad", "{\"step_num\":0}", vec![1, 2, 3])
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("https://api.openai.com/v1"), "https://api.openai.com/v1/");
        assert_eq!(normalize_base_url("https://api.openai.com/v1//"), "https://api.openai.com/v1/");
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            OpenAiResponsesClient::new("  ", Duration::from_secs(5)),
            Err(ProviderError::ConfigError(_))
        ));
    }

    #[test]
    fn test_body_shape() {
        let client = OpenAiResponsesClient::new("sk-test", Duration::from_secs(5))
            .unwrap()
            .with_model("gpt-4.1-mini");
        let body = serde_json::to_value(client.build_body(&request())).unwrap();

        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["input"][0]["role"], "system");
        assert_eq!(body["input"][0]["content"][0]["type"], "input_text");
        assert_eq!(body["input"][0]["content"][0]["text"], "be precise");

        let user = &body["input"][1]["content"];
        assert_eq!(user[0]["text"], "ORIGINAL_USER_REQUEST_UTF8:\nopen notepad");
        assert_eq!(user[1]["text"], "ORIGINAL_USER_REQUEST_BASE64:\nb3BlbiBub3RlcGFk");
        assert!(user[2]["text"].as_str().unwrap().starts_with("USER_CONTEXT_JSON:\n{\"step_num\":0}"));
        assert_eq!(user[3]["type"], "input_image");
        assert_eq!(user[3]["image_url"], "data:image/png;base64,AQID");
    }

    #[tokio::test]
    async fn test_infer_extracts_output_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/responses")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"output":[{"type":"message","content":[{"type":"output_text","text":"{\"steps\":[],\"done\":\"ok\"}"}]}]}"#)
            .create_async()
            .await;

        let client = OpenAiResponsesClient::with_base_url(
            "sk-test",
            format!("{}/v1", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        let text = client.infer(&request()).await.unwrap();

        assert_eq!(text, r#"{"steps":[],"done":"ok"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_infer_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/responses")
            .with_status(429)
            .with_header("retry-after", "7")
            .with_body("slow down")
            .create_async()
            .await;

        let client =
            OpenAiResponsesClient::with_base_url("sk-test", server.url(), Duration::from_secs(5)).unwrap();
        let err = client.infer(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { retry_after: Some(7) }));
    }

    #[tokio::test]
    async fn test_infer_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/responses")
            .with_status(500)
            .with_body("internal")
            .create_async()
            .await;

        let client =
            OpenAiResponsesClient::with_base_url("sk-test", server.url(), Duration::from_secs(5)).unwrap();
        match client.infer(&request()).await {
            Err(ProviderError::ApiError { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
