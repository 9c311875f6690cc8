use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use super::{GenerativeModel, ModelError, ModelKind, ModelRequest, PromptPart};
use crate::config::GeminiConfig;
use crate::flows::generate_recipes::GENERATE_RECIPES_PROMPT_NAME;
use crate::flows::identify_ingredients::IDENTIFY_INGREDIENTS_PROMPT_NAME;

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let Value::String(s) = val {
                        if s.len() > 100 && s.is_ascii() {
                            *val = Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...[{} chars total]", &text[..idx], text.len()),
        None => text.to_string(),
    }
}

pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn is_demo(&self) -> bool {
        self.config.is_demo()
    }

    fn model_for(&self, kind: ModelKind) -> &str {
        match kind {
            ModelKind::Vision => &self.config.vision_model,
            ModelKind::Text => &self.config.text_model,
        }
    }

    pub fn build_request_body(request: &ModelRequest) -> Value {
        let parts: Vec<Value> = request
            .parts
            .iter()
            .map(|part| match part {
                PromptPart::Text(text) => json!({ "text": text }),
                PromptPart::InlineImage { mime_type, data } => json!({
                    "inlineData": { "mimeType": mime_type, "data": data }
                }),
            })
            .collect();

        let mut generation_config = json!({
            "responseMimeType": "application/json",
            "responseSchema": request.output_schema,
            "candidateCount": 1
        });
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = json!(temperature);
        }

        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": generation_config
        })
    }

    async fn perform_api_call(&self, request: &ModelRequest) -> Result<String, ModelError> {
        let model = self.model_for(request.kind);
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);

        info!("🔗 [{}] Making request to: {}", request.name, url);

        let request_body = Self::build_request_body(request);
        let mut logged_body = request_body.clone();
        truncate_base64_in_json(&mut logged_body);
        debug!("📤 Request body: {}", serde_json::to_string_pretty(&logged_body).unwrap_or_default());

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ModelError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await.map_err(|e| ModelError::Http(e.to_string()))?;

        if !status.is_success() {
            error!("❌ API Error response: {}", response_text);
            return Err(ModelError::Status { status: status.as_u16(), body: response_text });
        }

        debug!("📥 Raw Gemini API response: {}", preview(&response_text, 1000));

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| ModelError::Parse(e.to_string()))?;

        extract_first_text(&parsed).ok_or(ModelError::EmptyResponse)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: ModelRequest) -> Result<String, ModelError> {
        if self.is_demo() {
            info!("Using demo mode - serving canned '{}' response", request.name);
            return demo_response(request.name);
        }

        info!("Generating '{}' with {} ({} image part(s))...", request.name, self.model_for(request.kind), request.image_count());
        let result = self.perform_api_call(&request).await;
        match &result {
            Ok(text) => info!("✅ '{}' response received: {}", request.name, preview(text, 120)),
            Err(e) => error!("❌ '{}' model call failed: {}", request.name, e),
        }
        result
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

fn demo_response(name: &str) -> Result<String, ModelError> {
    let value = match name {
        IDENTIFY_INGREDIENTS_PROMPT_NAME => json!({
            "ingredients": ["eggs", "milk", "cheddar cheese", "spinach", "tomatoes"]
        }),
        GENERATE_RECIPES_PROMPT_NAME => json!({
            "recipes": [
                {
                    "name": "Spinach and Cheddar Omelette",
                    "ingredients": "eggs, milk, cheddar cheese, spinach",
                    "instructions": "1. Whisk the eggs with a splash of milk.\n2. Wilt the spinach in a hot pan.\n3. Pour in the eggs, sprinkle cheddar and fold once set."
                },
                {
                    "name": "Tomato Scrambled Eggs",
                    "ingredients": "eggs, tomatoes, milk",
                    "instructions": "1. Dice the tomatoes and soften them in a pan.\n2. Beat the eggs with milk.\n3. Add the eggs and stir gently until just set."
                },
                {
                    "name": "Cheesy Spinach Tomato Bake",
                    "ingredients": "spinach, tomatoes, cheddar cheese, eggs",
                    "instructions": "1. Layer spinach and sliced tomatoes in a dish.\n2. Pour over beaten eggs.\n3. Top with cheddar and bake for 15 minutes."
                }
            ]
        }),
        other => return Err(ModelError::Http(format!("demo mode has no response for '{other}'"))),
    };
    Ok(value.to_string())
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(Value),
}

fn extract_first_text(resp: &GeminiResponse) -> Option<String> {
    let text = resp
        .candidates
        .first()?
        .content
        .parts
        .iter()
        .find_map(|part| match part {
            Part::Text { text } => Some(text.trim().to_string()),
            Part::Other(_) => None,
        });
    if text.is_none() {
        info!("⚠️ No text part found in response structure");
    }
    text.filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use pretty_assertions::assert_eq;

    fn request() -> ModelRequest {
        ModelRequest {
            name: IDENTIFY_INGREDIENTS_PROMPT_NAME,
            kind: ModelKind::Vision,
            parts: vec![
                PromptPart::Text("Photo: ".into()),
                PromptPart::InlineImage { mime_type: "image/png".into(), data: "iVBORw0KGgo=".into() },
            ],
            output_schema: json!({ "type": "OBJECT" }),
            temperature: Some(0.2),
        }
    }

    #[test]
    fn request_body_carries_parts_and_schema() {
        let body = GeminiClient::build_request_body(&request());
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "Photo: " },
                        { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } }
                    ]
                }],
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": { "type": "OBJECT" },
                    "candidateCount": 1,
                    "temperature": 0.2f32
                }
            })
        );
    }

    #[test]
    fn truncates_long_inline_data_only() {
        let long = "A".repeat(200);
        let mut value = json!({ "parts": [{ "inlineData": { "data": long } }, { "text": "B".repeat(200) }] });
        truncate_base64_in_json(&mut value);
        let data = value["parts"][0]["inlineData"]["data"].as_str().unwrap();
        assert!(data.ends_with("...[truncated 150 chars]"));
        assert_eq!(value["parts"][1]["text"].as_str().unwrap().len(), 200);
    }

    #[test]
    fn extracts_first_text_part() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [
                { "functionCall": { "name": "x" } },
                { "text": "  {\"ingredients\": [\"egg\"]}\n" }
            ] } }]
        }))
        .unwrap();
        assert_eq!(extract_first_text(&resp).as_deref(), Some("{\"ingredients\": [\"egg\"]}"));

        let empty: GeminiResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert_eq!(extract_first_text(&empty), None);
    }

    #[test]
    fn candidates_without_content_have_no_text() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }, { "content": {} }]
        }))
        .unwrap();
        assert_eq!(resp.candidates.len(), 2);
        assert!(resp.candidates[1].content.parts.is_empty());
        assert_eq!(extract_first_text(&resp), None);
    }

    #[tokio::test]
    async fn demo_mode_serves_canned_answers() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let client = GeminiClient::new(config.gemini).unwrap();
        assert!(client.is_demo());

        let text = client.generate(request()).await.unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["ingredients"].as_array().unwrap().len(), 5);
    }
}
