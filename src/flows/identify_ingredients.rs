//! Vision stage: photo of the fridge in, ingredient names out.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{parse_output, FlowError};
use crate::llm::{GenerativeModel, ModelKind, ModelRequest, PromptPart};
use crate::models::{EncodedImagePayload, IngredientList};

pub const IDENTIFY_INGREDIENTS_PROMPT_NAME: &str = "identify_ingredients";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyIngredientsInput {
    pub photo_data_uri: EncodedImagePayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyIngredientsOutput {
    pub ingredients: IngredientList,
}

pub fn output_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "ingredients": {
                "type": "ARRAY",
                "description": "A list of ingredients identified in the photo.",
                "items": { "type": "STRING" }
            }
        },
        "required": ["ingredients"]
    })
}

fn render_prompt(photo: &EncodedImagePayload) -> Result<Vec<PromptPart>, FlowError> {
    let (mime_type, data) = photo.parts().map_err(|e| FlowError::InvalidInput(e.to_string()))?;
    Ok(vec![
        PromptPart::Text(
            "You are an expert at identifying ingredients in a photo. \
             Please analyze the image and extract a list of the ingredients.\n\nPhoto: "
                .to_string(),
        ),
        PromptPart::InlineImage { mime_type: mime_type.to_string(), data: data.to_string() },
        PromptPart::Text("\n\nReturn a simple list of ingredients.".to_string()),
    ])
}

pub async fn identify_ingredients(
    model: &dyn GenerativeModel,
    input: IdentifyIngredientsInput,
) -> Result<IdentifyIngredientsOutput, FlowError> {
    let request = ModelRequest {
        name: IDENTIFY_INGREDIENTS_PROMPT_NAME,
        kind: ModelKind::Vision,
        parts: render_prompt(&input.photo_data_uri)?,
        output_schema: output_schema(),
        temperature: Some(0.2),
    };

    let text = model.generate(request).await?;
    let mut output: IdentifyIngredientsOutput = parse_output(&text)?;

    // Blank names are not ingredients.
    output.ingredients = output
        .ingredients
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    info!(count = output.ingredients.len(), provider = model.provider_name(), "Identified ingredients");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_image;
    use crate::llm::FakeModel;
    use crate::models::UploadedImage;
    use pretty_assertions::assert_eq;

    fn input() -> IdentifyIngredientsInput {
        let image = UploadedImage::new("image/png", b"\x89PNG fake".to_vec());
        IdentifyIngredientsInput { photo_data_uri: encode_image(Some(&image)).unwrap() }
    }

    #[tokio::test]
    async fn returns_listed_ingredients() {
        let model = FakeModel::new()
            .with_response(IDENTIFY_INGREDIENTS_PROMPT_NAME, r#"{"ingredients": ["egg", " milk ", "", "flour"]}"#);

        let output = identify_ingredients(&model, input()).await.unwrap();
        assert_eq!(output.ingredients, vec!["egg", "milk", "flour"]);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn sends_image_between_instruction_parts() {
        let model = FakeModel::new().with_response(IDENTIFY_INGREDIENTS_PROMPT_NAME, r#"{"ingredients": []}"#);
        identify_ingredients(&model, input()).await.unwrap();

        let request = &model.requests()[0];
        assert_eq!(request.kind, ModelKind::Vision);
        assert_eq!(request.image_count(), 1);
        assert!(matches!(&request.parts[1], PromptPart::InlineImage { mime_type, .. } if mime_type == "image/png"));
        assert!(request.prompt_text().contains("identifying ingredients"));
        assert_eq!(request.output_schema, output_schema());
    }

    #[tokio::test]
    async fn missing_field_is_output_invalid() {
        let model = FakeModel::new().with_response(IDENTIFY_INGREDIENTS_PROMPT_NAME, r#"{"items": ["egg"]}"#);
        let err = identify_ingredients(&model, input()).await.unwrap_err();
        assert!(matches!(err, FlowError::ModelOutputInvalid(_)));
    }

    #[tokio::test]
    async fn transport_failure_is_invocation_failure() {
        let model = FakeModel::new().with_failure(IDENTIFY_INGREDIENTS_PROMPT_NAME, "quota exceeded");
        let err = identify_ingredients(&model, input()).await.unwrap_err();
        assert!(matches!(err, FlowError::ModelInvocationFailed(_)));
        assert_eq!(err.to_string(), "HTTP error: quota exceeded");
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_never_reaches_model() {
        let model = FakeModel::new();
        let input = IdentifyIngredientsInput {
            photo_data_uri: EncodedImagePayload { data_uri: "not a data uri".into() },
        };
        let err = identify_ingredients(&model, input).await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
        assert_eq!(model.calls(), 0);
    }
}
