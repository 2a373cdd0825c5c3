//! Speech adapters: OpenAI text-to-speech, speech-to-text with a Whisper /
//! Hugging Face fallback chain, and Hugging Face Whisper ASR.

use base64::Engine as _;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use ai_agent_core::{config::SpeechConfig, Error, Result};

use crate::http::{build_client, ensure_success, transport_error, unix_timestamp};
use crate::huggingface::{first_field, HuggingFaceClient};
use crate::storage::FileStore;

const OPENAI: &str = "OpenAI";

pub const VOICES: [&str; 6] = ["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

// =============================================================================
// Audio format detection
// =============================================================================

/// Supported audio formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Mp4,
    Wav,
    Webm,
    Ogg,
    Flac,
}

impl AudioFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Mp4 => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Webm => "audio/webm",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Flac => "audio/flac",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Mp4 => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Webm => "webm",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
        }
    }

    /// Detect format from magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        if data.starts_with(b"RIFF") && data.len() >= 12 && &data[8..12] == b"WAVE" {
            return Some(AudioFormat::Wav);
        }
        if data.starts_with(b"OggS") {
            return Some(AudioFormat::Ogg);
        }
        if data.starts_with(b"fLaC") {
            return Some(AudioFormat::Flac);
        }
        if data.starts_with(b"ID3") || data.starts_with(&[0xFF, 0xFB]) || data.starts_with(&[0xFF, 0xFA]) || data.starts_with(&[0xFF, 0xF3]) {
            return Some(AudioFormat::Mp3);
        }
        if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            return Some(AudioFormat::Webm);
        }
        if data.len() >= 8 && &data[4..8] == b"ftyp" {
            return Some(AudioFormat::Mp4);
        }

        None
    }
}

// =============================================================================
// Language normalization
// =============================================================================

/// Locale form of a language hint: `vi` -> `vi-VN`, `en-US` unchanged.
pub fn to_locale(language: &str) -> String {
    if language.contains('-') {
        return language.to_string();
    }
    match language {
        "vi" => "vi-VN".into(),
        "en" => "en-US".into(),
        "zh" => "zh-CN".into(),
        "ja" => "ja-JP".into(),
        "ko" => "ko-KR".into(),
        "fr" => "fr-FR".into(),
        "de" => "de-DE".into(),
        "es" => "es-ES".into(),
        other => format!("{}-{}", other, other.to_uppercase()),
    }
}

/// Short form of a language hint: `vi-VN` -> `vi`.
pub fn to_short_code(language: &str) -> String {
    language.split('-').next().unwrap_or(language).to_lowercase()
}

// =============================================================================
// Text to speech
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SpeechAudio {
    pub file_name: String,
    pub url: String,
    pub voice: String,
    pub size_bytes: usize,
}

pub struct TextToSpeechTool {
    client: reqwest::Client,
    api_key: Option<Secret<String>>,
    config: SpeechConfig,
    store: FileStore,
}

impl TextToSpeechTool {
    pub fn new(config: &SpeechConfig, api_key: Option<Secret<String>>, store: FileStore, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            api_key,
            config: config.clone(),
            store,
        }
    }

    pub async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<SpeechAudio> {
        if text.trim().is_empty() {
            return Err(Error::invalid_request("Text must not be empty"));
        }
        let voice = voice.filter(|v| !v.is_empty()).unwrap_or(&self.config.tts_voice);
        if !VOICES.contains(&voice) {
            return Err(Error::invalid_request(format!(
                "Unknown voice '{}'. Available: {}",
                voice,
                VOICES.join(", ")
            )));
        }
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::not_configured("OPENAI_API_KEY"))?;

        let response = self
            .client
            .post(format!("{}/audio/speech", self.config.openai_base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&json!({
                "model": self.config.tts_model,
                "voice": voice,
                "input": text,
                "response_format": "mp3"
            }))
            .send()
            .await
            .map_err(|e| transport_error(OPENAI, e))?;
        let audio = ensure_success(OPENAI, response)
            .await?
            .bytes()
            .await
            .map_err(|e| transport_error(OPENAI, e))?;

        let file_name = format!("tts_{}.mp3", unix_timestamp());
        self.store.save_output(&file_name, &audio).await?;
        tracing::info!(file = %file_name, voice = %voice, bytes = audio.len(), "Speech synthesized");

        Ok(SpeechAudio {
            url: format!("/output/{}", file_name),
            file_name,
            voice: voice.to_string(),
            size_bytes: audio.len(),
        })
    }
}

// =============================================================================
// Speech to text
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SttMethod {
    Auto,
    Whisper,
    HuggingFace,
}

impl SttMethod {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "whisper" => Ok(Self::Whisper),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(Error::invalid_request(format!(
                "Unknown method '{}'. Use auto, whisper or huggingface",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Transcription {
    pub text: String,
    pub method: String,
    pub language: String,
    pub translated: bool,
}

pub struct SpeechToTextTool {
    client: reqwest::Client,
    api_key: Option<Secret<String>>,
    config: SpeechConfig,
    huggingface: HuggingFaceClient,
    hf_model: String,
}

impl SpeechToTextTool {
    pub fn new(
        config: &SpeechConfig,
        api_key: Option<Secret<String>>,
        huggingface: HuggingFaceClient,
        hf_model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: build_client(timeout),
            api_key,
            config: config.clone(),
            huggingface,
            hf_model: hf_model.into(),
        }
    }

    pub fn whisper_available(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        file_name: &str,
        method: SttMethod,
        language: Option<&str>,
        translate_to_english: bool,
    ) -> Result<Transcription> {
        if audio.is_empty() {
            return Err(Error::invalid_request("Audio file is empty"));
        }
        let short = language.filter(|l| !l.is_empty()).map(to_short_code);

        match method {
            SttMethod::Whisper => {
                self.whisper(audio, file_name, short.as_deref(), translate_to_english)
                    .await
            }
            SttMethod::HuggingFace => self.huggingface(audio, language).await,
            SttMethod::Auto => {
                if self.whisper_available() {
                    match self
                        .whisper(audio.clone(), file_name, short.as_deref(), translate_to_english)
                        .await
                    {
                        Ok(result) => return Ok(result),
                        Err(e) => {
                            tracing::warn!(error = %e, "Whisper failed, falling back to Hugging Face");
                        }
                    }
                }
                self.huggingface(audio, language).await
            }
        }
    }

    async fn whisper(
        &self,
        audio: Vec<u8>,
        file_name: &str,
        language: Option<&str>,
        translate: bool,
    ) -> Result<Transcription> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::not_configured("OPENAI_API_KEY"))?;
        let mime = AudioFormat::detect(&audio)
            .map(|f| f.mime_type())
            .unwrap_or("application/octet-stream");

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| Error::internal(e.to_string()))?;
        let mut form = reqwest::multipart::Form::new()
            .text("model", self.config.stt_model.clone())
            .part("file", part);

        let endpoint = if translate {
            "translations"
        } else {
            if let Some(lang) = language {
                form = form.text("language", lang.to_string());
            }
            "transcriptions"
        };

        tracing::info!(endpoint, language = ?language, "Transcribing with Whisper");
        let response = self
            .client
            .post(format!("{}/audio/{}", self.config.openai_base_url, endpoint))
            .bearer_auth(api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(OPENAI, e))?;
        let body: serde_json::Value = ensure_success(OPENAI, response)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(OPENAI, format!("Invalid response: {}", e)))?;

        Ok(Transcription {
            text: first_field(&body, "text").unwrap_or_default(),
            method: "whisper".into(),
            language: language.unwrap_or("auto").to_string(),
            translated: translate,
        })
    }

    async fn huggingface(&self, audio: Vec<u8>, language: Option<&str>) -> Result<Transcription> {
        let content_type = AudioFormat::detect(&audio)
            .map(|f| f.mime_type())
            .unwrap_or("application/octet-stream");
        tracing::info!(model = %self.hf_model, "Transcribing with Hugging Face");
        let body = self.huggingface.post_bytes(&self.hf_model, audio, content_type).await?;
        let text = first_field(&body, "text")
            .ok_or_else(|| Error::upstream("Hugging Face", "Response contained no text"))?;

        Ok(Transcription {
            text,
            method: "huggingface".into(),
            language: language
                .filter(|l| !l.is_empty())
                .map(to_locale)
                .unwrap_or_else(|| "auto".into()),
            translated: false,
        })
    }
}

// =============================================================================
// ASR
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsrTask {
    Transcribe,
    Translate,
}

impl AsrTask {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "" | "transcribe" => Ok(Self::Transcribe),
            "translate" => Ok(Self::Translate),
            other => Err(Error::invalid_request(format!(
                "Unknown task '{}'. Use transcribe or translate",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcribe => "transcribe",
            Self::Translate => "translate",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AsrResult {
    pub transcription: String,
    pub language: String,
    pub task: String,
    pub model: String,
}

pub struct AsrTool {
    huggingface: HuggingFaceClient,
    model: String,
}

impl AsrTool {
    pub fn new(huggingface: HuggingFaceClient, model: impl Into<String>) -> Self {
        Self {
            huggingface,
            model: model.into(),
        }
    }

    pub async fn transcribe(&self, audio: &[u8], language: Option<&str>, task: AsrTask) -> Result<AsrResult> {
        if audio.is_empty() {
            return Err(Error::invalid_request("Audio file is empty"));
        }
        let body = asr_request_body(audio, language, task);
        let response = self.huggingface.post_json(&self.model, &body).await?;
        let transcription = first_field(&response, "text")
            .ok_or_else(|| Error::upstream("Hugging Face", "Response contained no text"))?;

        tracing::info!(model = %self.model, task = task.as_str(), chars = transcription.len(), "ASR completed");
        Ok(AsrResult {
            transcription,
            language: language
                .filter(|l| !l.is_empty())
                .map(String::from)
                .unwrap_or_else(|| "auto-detected".into()),
            task: task.as_str().to_string(),
            model: self.model.clone(),
        })
    }
}

fn asr_request_body(audio: &[u8], language: Option<&str>, task: AsrTask) -> serde_json::Value {
    let mut generate = json!({ "task": task.as_str() });
    if let Some(lang) = language.filter(|l| !l.is_empty()) {
        generate["language"] = json!(to_short_code(lang));
    }
    json!({
        "inputs": base64::engine::general_purpose::STANDARD.encode(audio),
        "parameters": { "generate_kwargs": generate }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_agent_core::config::HuggingFaceConfig;

    #[test]
    fn test_audio_format_detection() {
        let wav = b"RIFF\x00\x00\x00\x00WAVEfmt ";
        assert_eq!(AudioFormat::detect(wav), Some(AudioFormat::Wav));

        let ogg = b"OggS\x00\x02";
        assert_eq!(AudioFormat::detect(ogg), Some(AudioFormat::Ogg));

        assert_eq!(AudioFormat::detect(&[0xFF, 0xFB, 0x90, 0x00]), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::detect(b"ID3\x04\x00"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::detect(b"\x00\x00\x00\x20ftypM4A "), Some(AudioFormat::Mp4));
        assert_eq!(AudioFormat::detect(b"abc"), None);
    }

    #[test]
    fn test_audio_format_mime_type() {
        assert_eq!(AudioFormat::Mp3.mime_type(), "audio/mpeg");
        assert_eq!(AudioFormat::Wav.mime_type(), "audio/wav");
    }

    #[test]
    fn test_language_normalization() {
        assert_eq!(to_locale("vi"), "vi-VN");
        assert_eq!(to_locale("ko"), "ko-KR");
        assert_eq!(to_locale("it"), "it-IT");
        assert_eq!(to_locale("pt-BR"), "pt-BR");
        assert_eq!(to_short_code("en-US"), "en");
        assert_eq!(to_short_code("vi"), "vi");
    }

    #[test]
    fn test_parse_method_and_task() {
        assert_eq!(SttMethod::parse("").unwrap(), SttMethod::Auto);
        assert_eq!(SttMethod::parse("Whisper").unwrap(), SttMethod::Whisper);
        assert!(SttMethod::parse("google").is_err());
        assert_eq!(AsrTask::parse("translate").unwrap(), AsrTask::Translate);
        assert!(AsrTask::parse("summarize").is_err());
    }

    #[test]
    fn test_asr_body_carries_task_and_language() {
        let body = asr_request_body(b"abc", Some("vi-VN"), AsrTask::Translate);
        assert_eq!(body["inputs"], "YWJj");
        assert_eq!(body["parameters"]["generate_kwargs"]["task"], "translate");
        assert_eq!(body["parameters"]["generate_kwargs"]["language"], "vi");
    }

    #[tokio::test]
    async fn test_tts_validates_before_calling_out() {
        let dir = tempfile::tempdir().unwrap();
        let tool = TextToSpeechTool::new(
            &SpeechConfig::default(),
            None,
            FileStore::under(dir.path()),
            Duration::from_secs(1),
        );
        assert!(tool.synthesize("", None).await.unwrap_err().is_client_error());
        assert!(tool.synthesize("hi", Some("robot")).await.unwrap_err().is_client_error());
        assert!(matches!(
            tool.synthesize("hi", None).await.unwrap_err(),
            Error::NotConfigured(_)
        ));
    }

    #[tokio::test]
    async fn test_auto_without_any_keys_reports_huggingface_not_configured() {
        let hf = HuggingFaceClient::new(&HuggingFaceConfig::default(), Duration::from_secs(1));
        let tool = SpeechToTextTool::new(&SpeechConfig::default(), None, hf, "openai/whisper-large-v3", Duration::from_secs(1));
        let err = tool
            .transcribe(b"OggS\x00\x02".to_vec(), "a.ogg", SttMethod::Auto, Some("vi"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConfigured(ref k) if k == "HF_API_TOKEN"));
    }
}
