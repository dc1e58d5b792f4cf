//! The generative backend boundary.
//!
//! A backend turns a rendered prompt plus an output-shape hint into a raw JSON
//! response. It owns everything transport-related (model choice, auth,
//! retries, timeouts); the flow layer only awaits it once per invocation.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::prompts::RenderedPrompt;

/// Failures of the external generative call itself.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No credentials were configured for the backend.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// The request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered, but the envelope around the content was unusable
    /// (no candidates, blocked prompt, undecodable JSON body).
    #[error("unusable backend response: {0}")]
    InvalidResponse(String),

    /// Retries inside the client were exhausted.
    #[error("backend unavailable after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    /// Any other backend-specific failure.
    #[error("{0}")]
    Other(String),
}

/// An external generative-AI service.
///
/// `output_schema` is a JSON-Schema object describing the expected response
/// shape. Implementations should pass it on as a hint where the service
/// supports structured output; the flow layer validates the response either
/// way.
#[async_trait]
pub trait GenerativeBackend: Send + Sync + fmt::Debug {
    /// Short identifier used in logs, e.g. `gemini/gemini-2.0-flash`.
    fn name(&self) -> &str;

    /// Generate a raw structured response for `prompt`.
    async fn generate(
        &self,
        prompt: &RenderedPrompt,
        output_schema: &Value,
    ) -> Result<Value, BackendError>;
}
