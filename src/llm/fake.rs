//! Scripted model for tests and offline runs.
//!
//! Replies are looked up by [`ModelRequest::name`], so a test can script the
//! extraction and generation stages independently and count how often each
//! stage actually reached the model.

use super::{GenerativeModel, ModelError, ModelRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
    Panic(String),
}

#[derive(Debug, Default)]
pub struct FakeModel {
    replies: HashMap<&'static str, Reply>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl FakeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests named `name` with the given raw text.
    pub fn with_response(mut self, name: &'static str, text: impl Into<String>) -> Self {
        self.replies.insert(name, Reply::Text(text.into()));
        self
    }

    /// Fail requests named `name` as if the upstream call broke.
    pub fn with_failure(mut self, name: &'static str, message: impl Into<String>) -> Self {
        self.replies.insert(name, Reply::Fail(message.into()));
        self
    }

    pub fn with_panic(mut self, name: &'static str, message: impl Into<String>) -> Self {
        self.replies.insert(name, Reply::Panic(message.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn calls_for(&self, name: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.name == name).count()
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl GenerativeModel for FakeModel {
    async fn generate(&self, request: ModelRequest) -> Result<String, ModelError> {
        let reply = self.replies.get(request.name).cloned();
        let name = request.name;
        self.requests.lock().push(request);

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(ModelError::Http(message)),
            Some(Reply::Panic(message)) => panic!("{message}"),
            None => Err(ModelError::Http(format!("FakeModel: no response configured for '{name}'"))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ModelKind, PromptPart};
    use serde_json::json;

    fn request(name: &'static str) -> ModelRequest {
        ModelRequest {
            name,
            kind: ModelKind::Text,
            parts: vec![PromptPart::Text("hello".into())],
            output_schema: json!({}),
            temperature: None,
        }
    }

    #[tokio::test]
    async fn replies_by_name_and_counts_calls() {
        let model = FakeModel::new().with_response("a", "{}").with_failure("b", "down");

        assert_eq!(model.generate(request("a")).await.unwrap(), "{}");
        let err = model.generate(request("b")).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP error: down");

        assert_eq!(model.calls(), 2);
        assert_eq!(model.calls_for("a"), 1);
        assert_eq!(model.requests()[1].name, "b");
    }

    #[tokio::test]
    async fn unscripted_name_is_an_error() {
        let model = FakeModel::new();
        assert!(model.generate(request("missing")).await.is_err());
        assert_eq!(model.calls(), 1);
    }
}
