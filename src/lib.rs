pub mod audio;
pub mod capture;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod labeling;
pub mod pricing;
pub mod service;
pub mod storage;
pub mod store;
pub mod stt;

pub use audio::{AudioFrame, AudioInput, CaptureError, CpalInputFactory, InputConfig, InputFactory};
pub use capture::{CaptureController, CapturePhase, CapturedAudio, LevelBand, LevelMeter};
pub use client::{SubmitOptions, TranscriptionClient, TranscriptionRequestError};
pub use config::Config;
pub use conversation::{ConversationSummary, ConversationTurn};
pub use error::ServiceError;
pub use http::{create_router, AppState};
pub use service::{AudioUpload, DiarizeOptions, TranscriptionService};
pub use storage::{BlobStorage, FsBlobStorage};
pub use store::{JsonFileStore, TranscriptionRecord, TranscriptionStore};
