//! The two model-backed pipeline stages.
//!
//! Each flow renders a fixed prompt, makes exactly one model call with a declared
//! output schema, and validates the reply against that schema. Neither flow retries.

pub mod generate_recipes;
pub mod identify_ingredients;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::llm::ModelError;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("model output did not match the expected schema: {0}")]
    ModelOutputInvalid(String),
    #[error(transparent)]
    ModelInvocationFailed(ModelError),
}

impl From<ModelError> for FlowError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::EmptyResponse => FlowError::ModelOutputInvalid(err.to_string()),
            other => FlowError::ModelInvocationFailed(other),
        }
    }
}

/// Parse model text into the flow's output type, tolerating a surrounding markdown fence.
pub(crate) fn parse_output<T: DeserializeOwned>(text: &str) -> Result<T, FlowError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).map_err(|e| FlowError::ModelOutputInvalid(e.to_string()))
}
