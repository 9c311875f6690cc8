//! Client-side workflow: pick a photo, scan it, then automatically ask for recipes.
//!
//! [`OrchestratorState::apply`] is the whole state machine. It is a pure
//! transition function that returns the follow-up call (if any) as an
//! [`Effect`]. [`Orchestrator`] runs those effects against a [`RecipeActions`]
//! backend and publishes every new state on a watch channel for the UI.
//!
//! Every submission gets a fresh sequence number. A resolution is applied only
//! while its sequence is still current, so a reset (or a newer submission)
//! makes any in-flight call's eventual answer a no-op.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::actions::{RecipeActions, NO_INGREDIENTS_FOUND, NO_RECIPES_GENERATED};
use crate::encoder::encode_image;
use crate::models::{IdentifyResult, IngredientList, Recipe, RecipeResult, UploadedImage};

const GENERATION_FALLBACK: &str = "Failed to generate recipes.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExtractionPhase {
    #[default]
    NotStarted,
    Pending,
    Succeeded(IngredientList),
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GenerationPhase {
    #[default]
    Idle,
    Running,
    Succeeded(Vec<Recipe>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    FileSelected(UploadedImage),
    Submitted,
    ExtractionResolved { sequence: u64, result: IdentifyResult },
    GenerationResolved { sequence: u64, result: RecipeResult },
    Reset,
}

/// Calls the state machine asks its driver to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CallExtraction { sequence: u64, image: Option<UploadedImage> },
    CallGeneration { sequence: u64, ingredients: IngredientList },
}

/// Destructive alert the presentation layer shows for a failed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct OrchestratorState {
    pub image_preview: Option<String>,
    pub selected_file: Option<UploadedImage>,
    pub extraction: ExtractionPhase,
    pub generation: GenerationPhase,
    sequence: u64,
}

// The sequence counter is bookkeeping; two states that render the same are equal.
impl PartialEq for OrchestratorState {
    fn eq(&self, other: &Self) -> bool {
        self.image_preview == other.image_preview
            && self.selected_file == other.selected_file
            && self.extraction == other.extraction
            && self.generation == other.generation
    }
}

impl Eq for OrchestratorState {}

impl OrchestratorState {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_extraction_pending(&self) -> bool {
        self.extraction == ExtractionPhase::Pending
    }

    pub fn is_generating(&self) -> bool {
        self.generation == GenerationPhase::Running
    }

    pub fn is_busy(&self) -> bool {
        self.is_extraction_pending() || self.is_generating()
    }

    pub fn is_initial(&self) -> bool {
        *self == Self::default()
    }

    pub fn ingredients(&self) -> Option<&[String]> {
        match &self.extraction {
            ExtractionPhase::Succeeded(items) => Some(items),
            _ => None,
        }
    }

    pub fn recipes(&self) -> &[Recipe] {
        match &self.generation {
            GenerationPhase::Succeeded(recipes) => recipes,
            _ => &[],
        }
    }

    pub fn alert(&self) -> Option<Alert> {
        if let ExtractionPhase::Failed(message) = &self.extraction {
            return Some(Alert { title: "Error Identifying Ingredients", message: message.clone() });
        }
        if let GenerationPhase::Failed(message) = &self.generation {
            return Some(Alert { title: "Error Generating Recipes", message: message.clone() });
        }
        None
    }

    pub fn apply(&mut self, event: Event) -> Option<Effect> {
        match event {
            Event::FileSelected(file) => {
                self.image_preview = encode_image(Some(&file)).ok().map(|payload| payload.data_uri);
                self.selected_file = Some(file);
                None
            }
            Event::Submitted => {
                if self.is_busy() {
                    debug!("Ignoring submit while a stage is pending");
                    return None;
                }
                self.sequence += 1;
                self.extraction = ExtractionPhase::Pending;
                self.generation = GenerationPhase::Idle;
                Some(Effect::CallExtraction { sequence: self.sequence, image: self.selected_file.clone() })
            }
            Event::ExtractionResolved { sequence, result } => {
                if sequence != self.sequence || !self.is_extraction_pending() {
                    debug!(sequence, current = self.sequence, "Discarding stale extraction result");
                    return None;
                }
                match result {
                    IdentifyResult::Ingredients { ingredients } if !ingredients.is_empty() => {
                        self.extraction = ExtractionPhase::Succeeded(ingredients.clone());
                        self.generation = GenerationPhase::Running;
                        Some(Effect::CallGeneration { sequence, ingredients })
                    }
                    IdentifyResult::Ingredients { .. } => {
                        self.extraction = ExtractionPhase::Failed(NO_INGREDIENTS_FOUND.to_string());
                        None
                    }
                    IdentifyResult::Error { error } => {
                        self.extraction = ExtractionPhase::Failed(error);
                        None
                    }
                }
            }
            Event::GenerationResolved { sequence, result } => {
                if sequence != self.sequence || !self.is_generating() {
                    debug!(sequence, current = self.sequence, "Discarding stale generation result");
                    return None;
                }
                self.generation = match result {
                    RecipeResult::Recipes { recipes } if !recipes.is_empty() => GenerationPhase::Succeeded(recipes),
                    RecipeResult::Recipes { .. } => GenerationPhase::Failed(NO_RECIPES_GENERATED.to_string()),
                    RecipeResult::Error { error } if error.is_empty() => {
                        GenerationPhase::Failed(GENERATION_FALLBACK.to_string())
                    }
                    RecipeResult::Error { error } => GenerationPhase::Failed(error),
                };
                None
            }
            Event::Reset => {
                *self = Self { sequence: self.sequence + 1, ..Self::default() };
                None
            }
        }
    }
}

/// Drives [`OrchestratorState`] against a backend. Share it behind an `Arc` so
/// the UI can reset while a submission is in flight.
pub struct Orchestrator {
    actions: Arc<dyn RecipeActions>,
    state: Mutex<OrchestratorState>,
    updates: watch::Sender<OrchestratorState>,
}

impl Orchestrator {
    pub fn new(actions: Arc<dyn RecipeActions>) -> Self {
        let (updates, _) = watch::channel(OrchestratorState::default());
        Self { actions, state: Mutex::new(OrchestratorState::default()), updates }
    }

    pub fn snapshot(&self) -> OrchestratorState {
        self.state.lock().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.updates.subscribe()
    }

    fn dispatch(&self, event: Event) -> Option<Effect> {
        let mut state = self.state.lock();
        let effect = state.apply(event);
        self.updates.send_replace(state.clone());
        effect
    }

    pub fn select_file(&self, file: UploadedImage) {
        self.dispatch(Event::FileSelected(file));
    }

    pub fn reset(&self) {
        info!("Resetting orchestrator");
        self.dispatch(Event::Reset);
    }

    /// Scan the selected photo and, if that finds ingredients, fetch recipes.
    /// Returns once the submission has settled or been superseded.
    pub async fn submit(&self) {
        let mut next = self.dispatch(Event::Submitted);
        while let Some(effect) = next {
            next = self.run(effect).await;
        }
    }

    async fn run(&self, effect: Effect) -> Option<Effect> {
        match effect {
            Effect::CallExtraction { sequence, image } => {
                info!(sequence, "Requesting ingredient extraction");
                let result = self.actions.identify_ingredients(image).await;
                self.dispatch(Event::ExtractionResolved { sequence, result })
            }
            Effect::CallGeneration { sequence, ingredients } => {
                info!(sequence, count = ingredients.len(), "Requesting recipe generation");
                let result = self.actions.generate_recipes(&ingredients).await;
                self.dispatch(Event::GenerationResolved { sequence, result })
            }
        }
    }
}
