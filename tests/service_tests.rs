// Tests for the transcription service orchestration: validation order,
// labeling fallback, cost computation, and best-effort storage.

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use voznota::error::ServiceError;
use voznota::labeling::{LabelingOutcome, SpeakerLabeler};
use voznota::service::{AudioUpload, DiarizeOptions, TranscriptionService};
use voznota::storage::BlobStorage;
use voznota::store::{JsonFileStore, TranscriptionStore};
use voznota::stt::{SpeechToText, Transcript};

struct MockStt {
    calls: Arc<AtomicUsize>,
    text: String,
    duration: f64,
}

#[async_trait::async_trait]
impl SpeechToText for MockStt {
    async fn transcribe(&self, _audio: Vec<u8>, _mime: &str, _name: &str) -> Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Transcript {
            text: self.text.clone(),
            duration_seconds: self.duration,
        })
    }
}

enum LabelerScript {
    Succeed { text: String, tokens: u64 },
    ReturnEmpty { tokens: u64 },
    Fail,
}

struct MockLabeler {
    script: LabelerScript,
}

#[async_trait::async_trait]
impl SpeakerLabeler for MockLabeler {
    async fn label(&self, _transcript: &str, _labels: &[String]) -> Result<LabelingOutcome> {
        match &self.script {
            LabelerScript::Succeed { text, tokens } => Ok(LabelingOutcome {
                text: Some(text.clone()),
                tokens: *tokens,
            }),
            LabelerScript::ReturnEmpty { tokens } => Ok(LabelingOutcome {
                text: None,
                tokens: *tokens,
            }),
            LabelerScript::Fail => anyhow::bail!("model unavailable"),
        }
    }
}

struct MockStorage {
    fail_put: bool,
    fail_delete: bool,
    deletes: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl BlobStorage for MockStorage {
    async fn put(&self, filename: &str, _bytes: &[u8]) -> Result<String> {
        if self.fail_put {
            anyhow::bail!("storage offline");
        }
        Ok(format!("http://localhost:3000/recordings/{}", filename))
    }

    async fn delete(&self, _url: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete {
            anyhow::bail!("storage offline");
        }
        Ok(())
    }
}

struct Fixture {
    service: TranscriptionService,
    stt_calls: Arc<AtomicUsize>,
    storage_deletes: Arc<AtomicUsize>,
    store: Arc<JsonFileStore>,
    _dir: TempDir,
}

fn fixture(
    transcript: &str,
    duration: f64,
    labeler: LabelerScript,
    fail_put: bool,
    fail_delete: bool,
) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let stt_calls = Arc::new(AtomicUsize::new(0));
    let storage_deletes = Arc::new(AtomicUsize::new(0));
    let store = Arc::new(JsonFileStore::new(dir.path().join("store.json")));

    let service = TranscriptionService::new(
        Some(Arc::new(MockStt {
            calls: Arc::clone(&stt_calls),
            text: transcript.to_string(),
            duration,
        })),
        Some(Arc::new(MockLabeler { script: labeler })),
        Some(Arc::new(MockStorage {
            fail_put,
            fail_delete,
            deletes: Arc::clone(&storage_deletes),
        })),
        Arc::clone(&store) as Arc<dyn TranscriptionStore>,
    );

    Fixture {
        service,
        stt_calls,
        storage_deletes,
        store,
        _dir: dir,
    }
}

fn wav_upload() -> AudioUpload {
    AudioUpload {
        bytes: vec![0u8; 128],
        mime_type: "audio/wav".to_string(),
    }
}

#[tokio::test]
async fn rejects_non_audio_upload_before_invoking_stt() {
    let fx = fixture("hi", 10.0, LabelerScript::Fail, false, false);
    let upload = AudioUpload {
        bytes: vec![1, 2, 3],
        mime_type: "text/plain".to_string(),
    };

    let err = fx.service.transcribe(upload).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
    assert_eq!(fx.stt_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejects_empty_upload() {
    let fx = fixture("hi", 10.0, LabelerScript::Fail, false, false);
    let upload = AudioUpload {
        bytes: Vec::new(),
        mime_type: "audio/wav".to_string(),
    };

    let err = fx.service.transcribe(upload).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn unconfigured_stt_is_service_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("store.json")));
    let service = TranscriptionService::new(None, None, None, store);

    let err = service.transcribe(wav_upload()).await.unwrap_err();
    assert!(matches!(err, ServiceError::ServiceUnavailable(_)));
}

#[tokio::test]
async fn plain_transcription_persists_with_duration_cost() {
    let fx = fixture("hello there", 90.0, LabelerScript::Fail, false, false);

    let record = fx.service.transcribe(wav_upload()).await.unwrap();
    assert_eq!(record.text, "hello there");
    assert_eq!(record.tokens_expended, 0);
    assert!(record.original_text.is_none());
    assert!(record.speaker_count.is_none());
    // 90s -> 2 started minutes at 0.006/min
    assert!((record.usd_expended - 0.012).abs() < 1e-9);
    assert!(record.audio_url.contains("/recordings/"));

    let listed = fx.store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, record.id);
}

#[tokio::test]
async fn diarized_cost_adds_labeling_tokens() {
    let fx = fixture(
        "raw words",
        90.0,
        LabelerScript::Succeed {
            text: "Speaker 1: raw\nSpeaker 2: words".to_string(),
            tokens: 4000,
        },
        false,
        false,
    );

    let record = fx
        .service
        .diarize(wav_upload(), DiarizeOptions::default())
        .await
        .unwrap();

    // base 2min x 0.006 = 0.012, labeling 4000/1000 x 0.03 = 0.12
    assert!((record.usd_expended - 0.132).abs() < 1e-9);
    assert_eq!(record.tokens_expended, 4000);
    assert_eq!(record.original_text.as_deref(), Some("raw words"));
    assert_eq!(record.speaker_count, Some(2));
}

#[tokio::test]
async fn labeler_failure_falls_back_to_raw_transcript() {
    let fx = fixture("raw words", 30.0, LabelerScript::Fail, false, false);

    let record = fx
        .service
        .diarize(wav_upload(), DiarizeOptions::default())
        .await
        .unwrap();

    assert_eq!(record.text, "raw words");
    assert_eq!(record.tokens_expended, 0);
    assert_eq!(record.speaker_count, Some(0));
}

#[tokio::test]
async fn empty_labeler_output_falls_back_but_keeps_token_charge() {
    let fx = fixture(
        "raw words",
        30.0,
        LabelerScript::ReturnEmpty { tokens: 250 },
        false,
        false,
    );

    let record = fx
        .service
        .diarize(wav_upload(), DiarizeOptions::default())
        .await
        .unwrap();

    assert_eq!(record.text, "raw words");
    assert_eq!(record.tokens_expended, 250);
}

#[tokio::test]
async fn speaker_count_counts_only_labels_present_in_output() {
    let fx = fixture(
        "raw",
        10.0,
        LabelerScript::Succeed {
            text: "ana: hola\nLUIS: bien".to_string(),
            tokens: 10,
        },
        false,
        false,
    );

    let options = DiarizeOptions {
        expected_speakers: Some(3),
        speaker_names: vec!["Ana".to_string(), "Luis".to_string(), "Pedro".to_string()],
    };
    let record = fx.service.diarize(wav_upload(), options).await.unwrap();

    assert_eq!(record.speaker_count, Some(2));
}

#[tokio::test]
async fn storage_upload_failure_degrades_to_empty_audio_url() {
    let fx = fixture("hi", 10.0, LabelerScript::Fail, true, false);

    let record = fx.service.transcribe(wav_upload()).await.unwrap();
    assert_eq!(record.audio_url, "");

    // Still persisted despite the storage failure
    assert_eq!(fx.store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_removes_record_even_when_blob_delete_fails() {
    let fx = fixture("hi", 10.0, LabelerScript::Fail, false, true);

    let record = fx.service.transcribe(wav_upload()).await.unwrap();
    fx.service.delete(&record.id).await.unwrap();

    assert_eq!(fx.storage_deletes.load(Ordering::SeqCst), 1);
    assert!(fx.store.get(&record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_of_unknown_id_is_not_found() {
    let fx = fixture("hi", 10.0, LabelerScript::Fail, false, false);

    let err = fx.service.delete("does-not-exist").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn clear_all_survives_individual_blob_failures() {
    let fx = fixture("hi", 10.0, LabelerScript::Fail, false, true);

    for _ in 0..3 {
        fx.service.transcribe(wav_upload()).await.unwrap();
    }

    let deleted = fx.service.clear_all().await.unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(fx.storage_deletes.load(Ordering::SeqCst), 3);
    assert!(fx.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn list_aggregates_tokens_and_cost() {
    let fx = fixture(
        "raw",
        60.0,
        LabelerScript::Succeed {
            text: "Speaker 1: raw".to_string(),
            tokens: 1000,
        },
        false,
        false,
    );

    fx.service.transcribe(wav_upload()).await.unwrap();
    fx.service
        .diarize(wav_upload(), DiarizeOptions::default())
        .await
        .unwrap();

    let page = fx.service.list().await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.total_tokens, 1000);
    // 0.006 (plain) + 0.006 + 0.03 (diarized)
    assert!((page.total_cost - 0.042).abs() < 1e-9);
    // Newest first
    assert!(page.records[0].created_at >= page.records[1].created_at);
}
