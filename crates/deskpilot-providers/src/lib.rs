//! # Deskpilot Providers
//!
//! Model clients for the desktop control loop.
//!
//! Every client implements [`ModelClient`]: one multimodal call per planning
//! turn, taking the system prompt, the objective, the per-turn context JSON
//! and a PNG screenshot, and returning the model's text. The text is opaque
//! here; turning it into an action plan is the caller's job.
//!
//! ## Supported Backends
//!
//! - OpenAI Responses API (`POST {base_url}responses`)
//! - A remote proxy that accepts the prepared payload and answers with the
//!   provider body verbatim

pub mod mock;
pub mod openai;
pub mod remote;
pub mod response;
pub mod traits;

pub use openai::OpenAiResponsesClient;
pub use remote::RemoteClient;
pub use response::extract_text;
pub use traits::{InferenceRequest, ModelClient};

use thiserror::Error;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<u64> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Timeout after {0}s")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Map a non-success HTTP status and body to a provider error.
pub(crate) fn status_error(status: u16, body: String, retry_after: Option<u64>) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited { retry_after },
        401 | 403 => ProviderError::AuthError(body),
        _ => ProviderError::ApiError {
            status,
            message: body,
        },
    }
}

/// `Retry-After` header in whole seconds, if present and numeric.
pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(429, String::new(), Some(3)),
            ProviderError::RateLimited { retry_after: Some(3) }
        ));
        assert!(matches!(status_error(401, "no".into(), None), ProviderError::AuthError(_)));
        let err = status_error(500, "boom".into(), None);
        assert_eq!(err.to_string(), "API error: 500 - boom");
    }
}
