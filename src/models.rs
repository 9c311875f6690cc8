use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A photo as it arrived from the user, before any encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub mime_type: String,
    pub bytes: Bytes,
}

impl UploadedImage {
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self { mime_type: mime_type.into(), bytes: bytes.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Inline `data:<mime>;base64,<payload>` form of an [`UploadedImage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImagePayload {
    pub data_uri: String,
}

/// Ingredient names in the order the model listed them.
pub type IngredientList = Vec<String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub ingredients: String,
    pub instructions: String,
}

impl Recipe {
    /// Instruction lines with blank lines dropped, ready for display.
    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.instructions.lines().map(str::trim).filter(|line| !line.is_empty())
    }
}

/// Outcome of the extraction handler: `{ "ingredients": [...] }` or `{ "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdentifyResult {
    Ingredients { ingredients: IngredientList },
    Error { error: String },
}

impl IdentifyResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { error: message.into() }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { error } => Some(error),
            Self::Ingredients { .. } => None,
        }
    }
}

/// Outcome of the generation handler: `{ "recipes": [...] }` or `{ "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipeResult {
    Recipes { recipes: Vec<Recipe> },
    Error { error: String },
}

impl RecipeResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { error: message.into() }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { error } => Some(error),
            Self::Recipes { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRecipesRequest {
    #[serde(default)]
    pub ingredients: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn identify_result_serializes_to_one_field() {
        let ok = IdentifyResult::Ingredients { ingredients: vec!["egg".into(), "milk".into()] };
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({ "ingredients": ["egg", "milk"] }));

        let err = IdentifyResult::error("nope");
        assert_eq!(serde_json::to_value(&err).unwrap(), json!({ "error": "nope" }));
    }

    #[test]
    fn recipe_result_deserializes_either_shape() {
        let parsed: RecipeResult = serde_json::from_value(json!({
            "recipes": [{ "name": "Omelette", "ingredients": "egg, milk", "instructions": "Whisk.\nCook." }]
        }))
        .unwrap();
        assert!(matches!(parsed, RecipeResult::Recipes { ref recipes } if recipes.len() == 1));

        let parsed: RecipeResult = serde_json::from_value(json!({ "error": "boom" })).unwrap();
        assert_eq!(parsed.error_message(), Some("boom"));
    }

    #[test]
    fn steps_skip_blank_lines() {
        let recipe = Recipe {
            name: "Pancakes".into(),
            ingredients: "egg, milk, flour".into(),
            instructions: "1. Mix everything.\n\n  2. Fry in a pan.  \n".into(),
        };
        assert_eq!(recipe.steps().collect::<Vec<_>>(), vec!["1. Mix everything.", "2. Fry in a pan."]);
    }

    #[test]
    fn generate_request_defaults_to_empty_list() {
        let parsed: GenerateRecipesRequest = serde_json::from_str("{}").unwrap();
        assert!(parsed.ingredients.is_empty());
    }
}
