//! Layered application configuration.
//!
//! Sources, lowest priority first: `config/default`, `config/{APP_ENV}`,
//! `config/local`, `APP__SECTION__KEY` environment variables, and finally the
//! conventional provider variables (`GEMINI_API_KEY`, `SERPAPI_KEY`, ...).

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use crate::{Error, Result};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub http: HttpConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub wolfram: WolframConfig,
    pub data_analysis: DataAnalysisConfig,
    pub translation: TranslationConfig,
    pub huggingface: HuggingFaceConfig,
    pub speech: SpeechConfig,
    pub latex_ocr: LatexOcrConfig,
    pub image_generation: ImageGenerationConfig,
    pub video_generation: VideoGenerationConfig,
    pub slides: SlidesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            allowed_origins: vec!["*".into()],
            max_upload_bytes: 200 * 1024 * 1024,
        }
    }
}

/// Fixed local directories for uploaded and generated files.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: String,
    pub charts_dir: String,
    pub output_dir: String,
    pub slides_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".into(),
            charts_dir: "charts".into(),
            output_dir: "output".into(),
            slides_dir: "slides".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    /// Default per-call timeout for outbound requests.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// One of `gemini`, `openai`, `anthropic`.
    pub provider: String,
    pub model: String,
    pub gemini_api_key: Option<Secret<String>>,
    pub openai_api_key: Option<Secret<String>>,
    pub anthropic_api_key: Option<Secret<String>>,
    /// Number of past turns included in conversation context.
    pub history_window: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".into(),
            model: "gemini-2.5-flash".into(),
            gemini_api_key: None,
            openai_api_key: None,
            anthropic_api_key: None,
            history_window: 3,
        }
    }
}

impl LlmConfig {
    /// Environment variable the provider client reads its key from.
    pub fn provider_key_var(&self) -> &'static str {
        match self.provider.to_lowercase().as_str() {
            "openai" => "OPENAI_API_KEY",
            "anthropic" => "ANTHROPIC_API_KEY",
            _ => "GEMINI_API_KEY",
        }
    }

    /// Key for the configured provider, if any.
    pub fn provider_key(&self) -> Option<&Secret<String>> {
        match self.provider.to_lowercase().as_str() {
            "openai" => self.openai_api_key.as_ref(),
            "anthropic" => self.anthropic_api_key.as_ref(),
            _ => self.gemini_api_key.as_ref(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// `duckduckgo` or `serpapi`.
    pub default_engine: String,
    pub serpapi_key: Option<Secret<String>>,
    pub serpapi_url: String,
    pub duckduckgo_url: String,
    pub region: String,
    pub safesearch: String,
    pub time_limit: Option<String>,
    pub serpapi_timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_engine: "duckduckgo".into(),
            serpapi_key: None,
            serpapi_url: "https://serpapi.com/search".into(),
            duckduckgo_url: "https://html.duckduckgo.com/html/".into(),
            region: "vn-vi".into(),
            safesearch: "moderate".into(),
            time_limit: Some("y".into()),
            serpapi_timeout_secs: 10,
            retry: RetryConfig::default(),
        }
    }
}

/// Fixed-count, fixed-delay retry limits for search backends.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub empty_delay_ms: u64,
    pub error_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            empty_delay_ms: 1000,
            error_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WolframConfig {
    pub app_id: Option<Secret<String>>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for WolframConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            base_url: "https://api.wolframalpha.com/v2/query".into(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataAnalysisConfig {
    pub max_csv_size_mb: u64,
}

impl Default for DataAnalysisConfig {
    fn default() -> Self {
        Self { max_csv_size_mb: 100 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TranslationConfig {
    pub base_url: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://translate.googleapis.com/translate_a/single".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HuggingFaceConfig {
    pub api_token: Option<Secret<String>>,
    pub base_url: String,
    pub summarization_model: String,
    pub vqa_model: String,
    pub ocr_model: String,
    pub asr_model: String,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: "https://api-inference.huggingface.co/models".into(),
            summarization_model: "facebook/bart-large-cnn".into(),
            vqa_model: "Salesforce/blip-vqa-base".into(),
            ocr_model: "microsoft/trocr-base-printed".into(),
            asr_model: "openai/whisper-large-v3".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SpeechConfig {
    pub openai_base_url: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub stt_model: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            openai_base_url: "https://api.openai.com/v1".into(),
            tts_model: "tts-1".into(),
            tts_voice: "alloy".into(),
            stt_model: "whisper-1".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LatexOcrConfig {
    pub api_url: String,
}

impl Default for LatexOcrConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8502/predict/".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ImageGenerationConfig {
    pub clipdrop_api_key: Option<Secret<String>>,
    pub base_url: String,
}

impl Default for ImageGenerationConfig {
    fn default() -> Self {
        Self {
            clipdrop_api_key: None,
            base_url: "https://clipdrop-api.co".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VideoGenerationConfig {
    pub base_url: String,
    pub model: String,
    pub image_model: String,
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
}

impl Default for VideoGenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "veo-3.1-generate-preview".into(),
            image_model: "gemini-2.5-flash-image".into(),
            poll_interval_secs: 10,
            max_wait_secs: 300,
        }
    }
}

impl VideoGenerationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SlidesConfig {
    pub default_num_slides: usize,
    /// Extracted text beyond this is not sent to the LLM.
    pub max_prompt_chars: usize,
}

impl Default for SlidesConfig {
    fn default() -> Self {
        Self {
            default_num_slides: 10,
            max_prompt_chars: 15000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub filter: String,
    pub json_logs: bool,
    pub enable_metrics: bool,
    /// OTLP collector; `OTEL_EXPORTER_OTLP_ENDPOINT` takes precedence.
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,ai_agent=debug".into(),
            json_logs: false,
            enable_metrics: true,
            otlp_endpoint: None,
            service_name: "ai-agent-server".into(),
        }
    }
}

fn env_secret(name: &str) -> Option<Secret<String>> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(Secret::new)
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map APP__SERVER__PORT=8000 to server.port
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        let mut cfg: Self = s
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Apply the conventional, unprefixed environment variables.
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = env_secret("GEMINI_API_KEY") {
            self.llm.gemini_api_key = Some(key);
        }
        if let Some(key) = env_secret("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(key);
        }
        if let Some(key) = env_secret("ANTHROPIC_API_KEY") {
            self.llm.anthropic_api_key = Some(key);
        }
        if let Some(id) = env_secret("WOLFRAM_APP_ID") {
            self.wolfram.app_id = Some(id);
        }
        if let Some(key) = env_secret("SERPAPI_KEY") {
            self.search.serpapi_key = Some(key);
        }
        if let Ok(engine) = std::env::var("SEARCH_ENGINE") {
            self.search.default_engine = engine.to_lowercase();
        }
        if let Some(key) = env_secret("CLIPDROP_API_KEY") {
            self.image_generation.clipdrop_api_key = Some(key);
        }
        if let Some(token) = env_secret("HF_API_TOKEN") {
            self.huggingface.api_token = Some(token);
        }
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Check that required keys are present.
    ///
    /// A missing key for the active LLM provider is fatal. Optional services
    /// only produce warnings, and a SerpAPI default without a key falls back
    /// to DuckDuckGo.
    pub fn validate(&mut self) -> Result<()> {
        let has_llm_key = self
            .llm
            .provider_key()
            .map(|k| !k.expose_secret().is_empty())
            .unwrap_or(false);
        if !has_llm_key {
            return Err(Error::Config(format!(
                "{} is required for the '{}' LLM provider",
                self.llm.provider_key_var(),
                self.llm.provider
            )));
        }

        if self.video_generation.poll_interval_secs == 0 {
            return Err(Error::Config(
                "video_generation.poll_interval_secs must be at least 1".into(),
            ));
        }

        if self.wolfram.app_id.is_none() {
            tracing::warn!("WOLFRAM_APP_ID not set. Wolfram|Alpha features will be disabled.");
        }

        if self.search.default_engine == "serpapi" && self.search.serpapi_key.is_none() {
            tracing::warn!("SERPAPI_KEY not set. Falling back to DuckDuckGo.");
            self.search.default_engine = "duckduckgo".into();
        }

        Ok(())
    }
}
