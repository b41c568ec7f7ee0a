use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub openai: OpenAiConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
    /// Public base URL used to build audio links (defaults to local dev URL)
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    /// Credential shared by the speech-to-text and labeling capabilities.
    /// Empty means "not configured" and is reported by `missing_required()`.
    #[serde(default)]
    pub api_key: String,
    pub whisper_model: String,
    pub chat_model: String,
    /// Transcription language hint passed to Whisper (e.g. "en", "es")
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory where uploaded audio blobs are kept and served from
    pub recordings_path: String,
    /// JSON file backing the transcription history
    pub store_path: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VOZNOTA").separator("__"))
            .set_default("service.name", "voznota")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 3000)?
            .set_default("service.public_url", "http://localhost:3000")?
            .set_default("openai.whisper_model", "whisper-1")?
            .set_default("openai.chat_model", "gpt-4")?
            .set_default("storage.recordings_path", "recordings")?
            .set_default("storage.store_path", "data/transcriptions.json")?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Names of required options that are missing. Checked before serving
    /// so a misconfigured deployment fails fast instead of on first request.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.openai.api_key.is_empty() {
            missing.push("VOZNOTA_OPENAI__API_KEY");
        }
        missing
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            anyhow::bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }
        Ok(())
    }
}
