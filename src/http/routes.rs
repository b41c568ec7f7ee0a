use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::path::Path;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Create the HTTP router with all routes
pub fn create_router(state: AppState, recordings_dir: impl AsRef<Path>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Transcription requests
        .route("/transcribe", post(handlers::transcribe))
        .route("/diarize", post(handlers::diarize))
        // History
        .route("/transcriptions", get(handlers::list_transcriptions))
        .route(
            "/transcriptions/clear",
            delete(handlers::clear_transcriptions),
        )
        .route(
            "/transcriptions/:id",
            delete(handlers::delete_transcription),
        )
        // Stored audio blobs
        .nest_service("/recordings", ServeDir::new(recordings_dir))
        // Request logging + browser clients
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
