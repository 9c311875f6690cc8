//! Generative-model boundary shared by both pipeline stages.

pub mod fake;
pub mod gemini;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use fake::FakeModel;
pub use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("model API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not parse model API response: {0}")]
    Parse(String),
    #[error("model returned no content")]
    EmptyResponse,
}

/// Which configured model a request should go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Vision,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    InlineImage { mime_type: String, data: String },
}

/// One structured-output request: ordered prompt parts plus the JSON schema the answer must follow.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// Stable prompt name, used for logging and by [`FakeModel`] to pick a canned reply.
    pub name: &'static str,
    pub kind: ModelKind,
    pub parts: Vec<PromptPart>,
    pub output_schema: Value,
    pub temperature: Option<f32>,
}

impl ModelRequest {
    /// Text parts joined together, images left out.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                PromptPart::Text(text) => Some(text.as_str()),
                PromptPart::InlineImage { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn image_count(&self) -> usize {
        self.parts.iter().filter(|part| matches!(part, PromptPart::InlineImage { .. })).count()
    }
}

/// A model that answers a prompt with JSON text matching the request's output schema.
///
/// Implementations make exactly one upstream call per `generate` and never retry.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> Result<String, ModelError>;

    fn provider_name(&self) -> &'static str;
}
