//! Text stage: ingredient list in, three quick recipe suggestions out.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{parse_output, FlowError};
use crate::llm::{GenerativeModel, ModelKind, ModelRequest, PromptPart};
use crate::models::Recipe;

pub const GENERATE_RECIPES_PROMPT_NAME: &str = "generate_recipes";
pub const SUGGESTION_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRecipesInput {
    /// Comma-separated ingredient names.
    pub ingredients: String,
}

impl GenerateRecipesInput {
    pub fn from_list(ingredients: &[String]) -> Self {
        Self { ingredients: ingredients.join(", ") }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRecipesOutput {
    pub recipes: Vec<Recipe>,
}

pub fn output_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "recipes": {
                "type": "ARRAY",
                "description": "An array of recipe suggestions based on the available ingredients.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING", "description": "The name of the recipe." },
                        "ingredients": { "type": "STRING", "description": "The ingredients required for the recipe." },
                        "instructions": { "type": "STRING", "description": "The step-by-step instructions for the recipe." }
                    },
                    "required": ["name", "ingredients", "instructions"]
                }
            }
        },
        "required": ["recipes"]
    })
}

pub fn render_prompt(ingredients: &str) -> String {
    format!(
        r#"You are a recipe suggestion AI. Given a list of ingredients, you will suggest simple recipes that can be made with those ingredients.

Ingredients: {ingredients}

Please provide {SUGGESTION_COUNT} recipe suggestions.
Each recipe must have a name, the required ingredients from the provided list, and step-by-step instructions.
The ingredients field in the output should only contain ingredients from the input. Do not suggest ingredients which are not present in the input.
Recipes must be simple, and able to be prepared in under 30 minutes."#
    )
}

pub async fn generate_recipes(
    model: &dyn GenerativeModel,
    input: GenerateRecipesInput,
) -> Result<GenerateRecipesOutput, FlowError> {
    let request = ModelRequest {
        name: GENERATE_RECIPES_PROMPT_NAME,
        kind: ModelKind::Text,
        parts: vec![PromptPart::Text(render_prompt(&input.ingredients))],
        output_schema: output_schema(),
        temperature: Some(0.7),
    };

    let text = model.generate(request).await?;
    let output: GenerateRecipesOutput = parse_output(&text)?;

    // The count is a prompt instruction, not a hard rule.
    if !output.recipes.is_empty() && output.recipes.len() != SUGGESTION_COUNT {
        warn!(count = output.recipes.len(), "Model returned an unexpected number of recipes");
    }
    for recipe in &output.recipes {
        let steps = recipe.steps().count();
        if steps == 0 {
            warn!(recipe = %recipe.name, "Recipe came back without instructions");
        } else {
            debug!(recipe = %recipe.name, steps, "Recipe suggestion");
        }
    }
    info!(count = output.recipes.len(), provider = model.provider_name(), "Generated recipes");
    Ok(output)
}
