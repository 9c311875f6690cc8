use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    actions::RecipeActions,
    encoder::sniff_mime_type,
    models::{GenerateRecipesRequest, IdentifyResult, RecipeResult, UploadedImage},
};

/// Multipart field the upload form uses for the photo.
pub const IMAGE_FIELD: &str = "image";

#[derive(Clone)]
pub struct AppState {
    pub actions: Arc<dyn RecipeActions>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/ingredients", post(identify_ingredients))
        .route("/api/recipes", post(generate_recipes))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn identify_ingredients(State(state): State<AppState>, multipart: Multipart) -> Json<IdentifyResult> {
    let image = match read_image_field(multipart).await {
        Ok(image) => image,
        Err(message) => return Json(IdentifyResult::error(message)),
    };
    tracing::info!(
        "🚀 Scanning upload ({} bytes, {})",
        image.as_ref().map_or(0, |i| i.bytes.len()),
        image.as_ref().map_or("no file", |i| i.mime_type.as_str())
    );
    let result = state.actions.identify_ingredients(image).await;
    if let Some(error) = result.error_message() {
        tracing::warn!("⚠️ Scan returned an error: {}", error);
    }
    Json(result)
}

pub async fn generate_recipes(
    State(state): State<AppState>,
    Json(body): Json<GenerateRecipesRequest>,
) -> Json<RecipeResult> {
    tracing::info!("🚀 Generating recipes for {} ingredient(s)", body.ingredients.len());
    let result = state.actions.generate_recipes(&body.ingredients).await;
    if let Some(error) = result.error_message() {
        tracing::warn!("⚠️ Recipe generation returned an error: {}", error);
    }
    Json(result)
}

/// Pull the photo out of the form. A missing field is `Ok(None)`; the action decides what that means.
async fn read_image_field(mut multipart: Multipart) -> Result<Option<UploadedImage>, String> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!("Multipart read error: {}", e);
                return Err(format!("Failed to read the upload: {}", e.body_text()));
            }
        };
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let declared = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!("Field read error: {}", e);
            format!("Failed to read the upload: {}", e.body_text())
        })?;

        // Browsers send octet-stream when they cannot tell; fall back to the magic bytes.
        let undeclared = matches!(declared.as_deref(), None | Some("") | Some("application/octet-stream"));
        let mime_type = if undeclared {
            sniff_mime_type(&bytes).map(str::to_owned).or(declared).unwrap_or_default()
        } else {
            declared.unwrap_or_default()
        };
        return Ok(Some(UploadedImage::new(mime_type, bytes)));
    }
}
