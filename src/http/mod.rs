//! HTTP API for transcription requests and history management:
//! - POST /transcribe - Transcribe one uploaded audio clip
//! - POST /diarize - Transcribe with speaker-turn labeling
//! - GET /transcriptions - List history with usage totals
//! - DELETE /transcriptions/:id - Delete one record and its audio
//! - DELETE /transcriptions/clear - Delete everything
//! - GET /health - Configured-capability check

mod handlers;
mod routes;
mod state;

pub use handlers::{
    ClearResponse, DeleteResponse, HealthResponse, HealthServices, ListResponse,
    TranscriptionPayload, TranscriptionResponse,
};
pub use routes::create_router;
pub use state::AppState;
