use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use voznota::capture::{CaptureController, LevelMeter};
use voznota::client::{SubmitOptions, TranscriptionClient};
use voznota::labeling::{ChatLabeler, ChatLabelerConfig};
use voznota::storage::FsBlobStorage;
use voznota::store::JsonFileStore;
use voznota::stt::{WhisperClient, WhisperConfig};
use voznota::{
    conversation, AppState, Config, CpalInputFactory, InputConfig, TranscriptionRecord,
    TranscriptionService,
};

#[derive(Parser)]
#[command(name = "voznota", about = "Voice recording and transcription service")]
struct Cli {
    /// Config file base name (environment variables override)
    #[arg(long, default_value = "config/voznota", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the transcription HTTP server
    Serve,

    /// Record from the microphone and submit for transcription
    Record {
        /// Server base URL
        #[arg(long, default_value = "http://localhost:3000")]
        server: String,

        /// Request speaker-turn labeling
        #[arg(long)]
        diarize: bool,

        /// Expected number of speakers (diarize mode)
        #[arg(long)]
        speakers: Option<usize>,

        /// Comma-separated speaker display names (diarize mode)
        #[arg(long, value_delimiter = ',')]
        names: Vec<String>,

        /// Open the mic for a level check before recording starts
        #[arg(long)]
        test: bool,
    },

    /// List transcription history
    List {
        #[arg(long, default_value = "http://localhost:3000")]
        server: String,
    },

    /// Delete one transcription
    Delete {
        id: String,
        #[arg(long, default_value = "http://localhost:3000")]
        server: String,
    },

    /// Delete all transcriptions
    Clear {
        #[arg(long, default_value = "http://localhost:3000")]
        server: String,
    },

    /// Check server health
    Health {
        #[arg(long, default_value = "http://localhost:3000")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve => serve(&cli.config).await,
        Command::Record {
            server,
            diarize,
            speakers,
            names,
            test,
        } => record(&server, diarize, speakers, names, test).await,
        Command::List { server } => list(&server).await,
        Command::Delete { id, server } => delete(&server, &id).await,
        Command::Clear { server } => clear(&server).await,
        Command::Health { server } => health(&server).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let cfg = Config::load(config_path)?;
    cfg.validate()?;

    info!("{} starting", cfg.service.name);

    let stt: Option<Arc<dyn voznota::stt::SpeechToText>> = Some(Arc::new(WhisperClient::new(
        WhisperConfig {
            api_key: cfg.openai.api_key.clone(),
            model: cfg.openai.whisper_model.clone(),
            language: cfg.openai.language.clone(),
        },
    )?));

    let labeler: Option<Arc<dyn voznota::labeling::SpeakerLabeler>> =
        Some(Arc::new(ChatLabeler::new(ChatLabelerConfig {
            api_key: cfg.openai.api_key.clone(),
            model: cfg.openai.chat_model.clone(),
        })?));

    let storage: Option<Arc<dyn voznota::storage::BlobStorage>> = Some(Arc::new(
        FsBlobStorage::new(&cfg.storage.recordings_path, &cfg.service.public_url),
    ));

    let store = Arc::new(JsonFileStore::new(&cfg.storage.store_path));

    let service = Arc::new(TranscriptionService::new(stt, labeler, storage, store));
    let state = AppState::new(service);
    let router = voznota::create_router(state, &cfg.storage.recordings_path);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn record(
    server: &str,
    diarize: bool,
    speakers: Option<usize>,
    names: Vec<String>,
    test: bool,
) -> Result<()> {
    let mut controller = CaptureController::new(Box::new(CpalInputFactory), InputConfig::default());
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    if test {
        controller.start_testing().await?;
        spawn_level_display(&mut controller);
        println!("Mic check: speak to see levels. Press Enter to start recording.");
        stdin.next_line().await?;
        controller.start_recording().await?;
    } else {
        controller.start_recording().await?;
        spawn_level_display(&mut controller);
    }

    println!("Recording... press Enter to stop.");
    stdin.next_line().await?;

    let captured = controller.stop_recording().await?.clone();
    println!(
        "Captured {} ({} KiB). Transcribing...",
        format_time(captured.duration_seconds as u64),
        captured.bytes.len() / 1024
    );

    let client = TranscriptionClient::new(server);
    let options = SubmitOptions {
        diarize,
        expected_speakers: speakers,
        speaker_names: names,
    };

    match client.submit(&captured, &options).await {
        Ok(record) => {
            controller.discard();
            print_record(&record);
            Ok(())
        }
        Err(e) => {
            // The clip is still captured; a retry would not need re-recording
            warn!("Submission failed: {}", e);
            anyhow::bail!("{}", e)
        }
    }
}

/// Forward live frames into a level meter and print the volume bar.
fn spawn_level_display(controller: &mut CaptureController) {
    let Some(mut monitor) = controller.take_monitor() else {
        return;
    };

    tokio::spawn(async move {
        let mut meter = LevelMeter::new();
        meter.activate();
        let mut window: Vec<i16> = Vec::new();

        while let Some(frame) = monitor.recv().await {
            window.extend_from_slice(&frame.samples);
            let keep = voznota::capture::WINDOW;
            if window.len() > keep * 4 {
                window.drain(..window.len() - keep);
            }

            if let Some(level) = meter.process(&window) {
                let percent = (level.volume * 100.0).round() as u32;
                let bar_len = (level.volume * 40.0).round() as usize;
                eprint!(
                    "\rlevel [{:<40}] {:>3}% {:?}      ",
                    "#".repeat(bar_len.min(40)),
                    percent,
                    level.volume_band()
                );
            }
        }
        // Stream closed: capture became inactive, stop drawing
        meter.deactivate();
        eprintln!();
    });
}

fn print_record(record: &TranscriptionRecord) {
    println!();
    println!("id:       {}", record.id);
    println!("created:  {}", record.created_at.to_rfc3339());
    println!("duration: {}", format_time(record.duration_seconds as u64));
    println!(
        "cost:     ${:.4} ({} tokens)",
        record.usd_expended, record.tokens_expended
    );
    if !record.audio_url.is_empty() {
        println!("audio:    {}", record.audio_url);
    }
    println!();

    if conversation::is_multi_speaker(&record.text) {
        let turns = conversation::parse(&record.text);
        let speakers = conversation::distinct_speakers(&turns);

        for turn in &turns {
            match &turn.speaker {
                Some(label) => {
                    let index = speakers
                        .iter()
                        .position(|s| s.eq_ignore_ascii_case(label))
                        .unwrap_or(0);
                    println!(
                        "[{}] {}: {}",
                        conversation::speaker_color(index),
                        label,
                        turn.content
                    );
                }
                None => println!("    {}", turn.content),
            }
        }

        let summary = conversation::summarize(&turns);
        println!();
        println!(
            "{} speaker(s): {}",
            summary.speaker_count,
            summary.speakers.join(", ")
        );
    } else {
        println!("{}", record.text);
    }
}

async fn list(server: &str) -> Result<()> {
    let page = TranscriptionClient::new(server).list().await?;
    println!(
        "{} transcription(s), {} tokens, ${:.4} total",
        page.total, page.total_tokens, page.total_cost
    );
    for t in &page.transcriptions {
        let preview: String = t.text.chars().take(60).collect();
        println!(
            "{}  {}  {}  {}",
            t.id,
            t.timestamp.to_rfc3339(),
            format_time(t.duration as u64),
            preview
        );
    }
    Ok(())
}

async fn delete(server: &str, id: &str) -> Result<()> {
    let response = TranscriptionClient::new(server).delete(id).await?;
    println!("{}", response.message);
    Ok(())
}

async fn clear(server: &str) -> Result<()> {
    let response = TranscriptionClient::new(server).clear().await?;
    println!("{}", response.message);
    Ok(())
}

async fn health(server: &str) -> Result<()> {
    let response = TranscriptionClient::new(server).health().await?;
    println!(
        "status: {} (speech-to-text: {}, object storage: {})",
        response.status, response.services.speech_to_text, response.services.object_storage
    );
    Ok(())
}

fn format_time(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
