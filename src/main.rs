use fridge_chef::{
    actions::Actions,
    config::AppConfig,
    llm::GeminiClient,
    routes::{self, AppState},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env()?;
    if config.gemini.is_demo() {
        tracing::warn!("GEMINI_API_KEY not set, serving canned demo responses");
    } else {
        tracing::info!(
            vision_model = %config.gemini.vision_model,
            text_model = %config.gemini.text_model,
            "Using Gemini at {}", config.gemini.base_url
        );
    }

    let gemini = GeminiClient::new(config.gemini.clone())?;
    let state = AppState {
        actions: Arc::new(Actions::new(Arc::new(gemini))),
    };
    let app = routes::router(state, config.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
