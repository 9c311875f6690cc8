//! Server-side entry points for the two pipeline stages.
//!
//! Every failure, including a panic inside a flow, comes back as an
//! `{ "error": "..." }` result. Nothing escapes as an `Err` or an unwind.

use async_trait::async_trait;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::encoder::{encode_image, EncodeError};
use crate::flows::generate_recipes::{generate_recipes, GenerateRecipesInput};
use crate::flows::identify_ingredients::{identify_ingredients, IdentifyIngredientsInput};
use crate::flows::FlowError;
use crate::llm::GenerativeModel;
use crate::models::{IdentifyResult, IngredientList, Recipe, RecipeResult, UploadedImage};

pub const NO_INGREDIENTS_PROVIDED: &str = "No ingredients were provided to generate recipes.";
pub const NO_INGREDIENTS_FOUND: &str = "Could not identify any ingredients. Please try a different photo.";
pub const NO_RECIPES_GENERATED: &str = "Could not generate any recipes with the given ingredients.";
const GENERIC_CAUSE: &str = "An unexpected error occurred.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Generation,
}

impl Stage {
    fn nothing_found(self) -> &'static str {
        match self {
            Stage::Extraction => NO_INGREDIENTS_FOUND,
            Stage::Generation => NO_RECIPES_GENERATED,
        }
    }

    fn unexpected_prefix(self) -> &'static str {
        match self {
            Stage::Extraction => "An unexpected error occurred while analyzing the image",
            Stage::Generation => "An unexpected error occurred while generating recipes",
        }
    }
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("model output invalid: {0}")]
    ModelOutputInvalid(String),
    #[error("{0}")]
    ModelInvocationFailed(String),
    #[error("model returned no items")]
    EmptyResult,
}

impl ActionError {
    pub fn user_message(&self, stage: Stage) -> String {
        match self {
            ActionError::InvalidInput(message) => message.clone(),
            ActionError::ModelOutputInvalid(_) | ActionError::EmptyResult => stage.nothing_found().to_string(),
            ActionError::ModelInvocationFailed(cause) => format!("{}: {}", stage.unexpected_prefix(), cause),
        }
    }
}

impl From<EncodeError> for ActionError {
    fn from(err: EncodeError) -> Self {
        ActionError::InvalidInput(err.to_string())
    }
}

impl From<FlowError> for ActionError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::InvalidInput(message) => ActionError::InvalidInput(message),
            FlowError::ModelOutputInvalid(message) => ActionError::ModelOutputInvalid(message),
            FlowError::ModelInvocationFailed(cause) => ActionError::ModelInvocationFailed(cause.to_string()),
        }
    }
}

/// The two handlers as the client orchestrator sees them.
#[async_trait]
pub trait RecipeActions: Send + Sync {
    async fn identify_ingredients(&self, image: Option<UploadedImage>) -> IdentifyResult;

    async fn generate_recipes(&self, ingredients: &[String]) -> RecipeResult;
}

/// Stateless handlers backed by a generative model. Cheap to clone and safe to call concurrently.
#[derive(Clone)]
pub struct Actions {
    model: Arc<dyn GenerativeModel>,
}

impl Actions {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    async fn try_identify(&self, image: Option<UploadedImage>) -> Result<IngredientList, ActionError> {
        let photo_data_uri = encode_image(image.as_ref())?;
        let model = Arc::clone(&self.model);
        let output = contained(async move {
            identify_ingredients(model.as_ref(), IdentifyIngredientsInput { photo_data_uri }).await
        })
        .await??;

        if output.ingredients.is_empty() {
            return Err(ActionError::EmptyResult);
        }
        Ok(output.ingredients)
    }

    async fn try_generate(&self, ingredients: &[String]) -> Result<Vec<Recipe>, ActionError> {
        if ingredients.is_empty() {
            return Err(ActionError::InvalidInput(NO_INGREDIENTS_PROVIDED.to_string()));
        }
        let input = GenerateRecipesInput::from_list(ingredients);
        let model = Arc::clone(&self.model);
        let output = contained(async move { generate_recipes(model.as_ref(), input).await }).await??;

        if output.recipes.is_empty() {
            return Err(ActionError::EmptyResult);
        }
        Ok(output.recipes)
    }
}

#[async_trait]
impl RecipeActions for Actions {
    async fn identify_ingredients(&self, image: Option<UploadedImage>) -> IdentifyResult {
        let span = info_span!("identify_ingredients", request_id = %Uuid::new_v4());
        async move {
            match self.try_identify(image).await {
                Ok(ingredients) => {
                    info!(count = ingredients.len(), "Extraction succeeded");
                    IdentifyResult::Ingredients { ingredients }
                }
                Err(e) => {
                    warn!(error = %e, "Extraction failed");
                    IdentifyResult::error(e.user_message(Stage::Extraction))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn generate_recipes(&self, ingredients: &[String]) -> RecipeResult {
        let span = info_span!("generate_recipes", request_id = %Uuid::new_v4());
        async move {
            match self.try_generate(ingredients).await {
                Ok(recipes) => {
                    info!(count = recipes.len(), "Generation succeeded");
                    RecipeResult::Recipes { recipes }
                }
                Err(e) => {
                    warn!(error = %e, "Generation failed");
                    RecipeResult::error(e.user_message(Stage::Generation))
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Run a flow on its own task so that a panic inside it becomes an error value.
async fn contained<F, T>(flow: F) -> Result<T, ActionError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(flow.in_current_span()).await.map_err(|e| {
        let cause = if e.is_panic() { panic_message(e.into_panic()) } else { e.to_string() };
        ActionError::ModelInvocationFailed(cause)
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        GENERIC_CAUSE.to_string()
    }
}
