//! Text translation and language detection.
//!
//! `TranslationBackend` is the seam; `GoogleTranslateBackend` talks to the
//! public `client=gtx` endpoint. The detected source language comes from the
//! backend and is not guaranteed to be stable across calls.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ai_agent_core::{config::TranslationConfig, Error, Result};

use crate::http::{build_client, ensure_success, transport_error};

const SERVICE: &str = "Google Translate";

/// Language codes accepted by the backend, with English names.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("af", "afrikaans"),
    ("sq", "albanian"),
    ("am", "amharic"),
    ("ar", "arabic"),
    ("hy", "armenian"),
    ("az", "azerbaijani"),
    ("eu", "basque"),
    ("be", "belarusian"),
    ("bn", "bengali"),
    ("bs", "bosnian"),
    ("bg", "bulgarian"),
    ("ca", "catalan"),
    ("ceb", "cebuano"),
    ("ny", "chichewa"),
    ("zh-cn", "chinese (simplified)"),
    ("zh-tw", "chinese (traditional)"),
    ("co", "corsican"),
    ("hr", "croatian"),
    ("cs", "czech"),
    ("da", "danish"),
    ("nl", "dutch"),
    ("en", "english"),
    ("eo", "esperanto"),
    ("et", "estonian"),
    ("tl", "filipino"),
    ("fi", "finnish"),
    ("fr", "french"),
    ("fy", "frisian"),
    ("gl", "galician"),
    ("ka", "georgian"),
    ("de", "german"),
    ("el", "greek"),
    ("gu", "gujarati"),
    ("ht", "haitian creole"),
    ("ha", "hausa"),
    ("haw", "hawaiian"),
    ("iw", "hebrew"),
    ("he", "hebrew"),
    ("hi", "hindi"),
    ("hmn", "hmong"),
    ("hu", "hungarian"),
    ("is", "icelandic"),
    ("ig", "igbo"),
    ("id", "indonesian"),
    ("ga", "irish"),
    ("it", "italian"),
    ("ja", "japanese"),
    ("jw", "javanese"),
    ("kn", "kannada"),
    ("kk", "kazakh"),
    ("km", "khmer"),
    ("ko", "korean"),
    ("ku", "kurdish (kurmanji)"),
    ("ky", "kyrgyz"),
    ("lo", "lao"),
    ("la", "latin"),
    ("lv", "latvian"),
    ("lt", "lithuanian"),
    ("lb", "luxembourgish"),
    ("mk", "macedonian"),
    ("mg", "malagasy"),
    ("ms", "malay"),
    ("ml", "malayalam"),
    ("mt", "maltese"),
    ("mi", "maori"),
    ("mr", "marathi"),
    ("mn", "mongolian"),
    ("my", "myanmar (burmese)"),
    ("ne", "nepali"),
    ("no", "norwegian"),
    ("or", "odia"),
    ("ps", "pashto"),
    ("fa", "persian"),
    ("pl", "polish"),
    ("pt", "portuguese"),
    ("pa", "punjabi"),
    ("ro", "romanian"),
    ("ru", "russian"),
    ("sm", "samoan"),
    ("gd", "scots gaelic"),
    ("sr", "serbian"),
    ("st", "sesotho"),
    ("sn", "shona"),
    ("sd", "sindhi"),
    ("si", "sinhala"),
    ("sk", "slovak"),
    ("sl", "slovenian"),
    ("so", "somali"),
    ("es", "spanish"),
    ("su", "sundanese"),
    ("sw", "swahili"),
    ("sv", "swedish"),
    ("tg", "tajik"),
    ("ta", "tamil"),
    ("te", "telugu"),
    ("th", "thai"),
    ("tr", "turkish"),
    ("uk", "ukrainian"),
    ("ur", "urdu"),
    ("ug", "uyghur"),
    ("uz", "uzbek"),
    ("vi", "vietnamese"),
    ("cy", "welsh"),
    ("xh", "xhosa"),
    ("yi", "yiddish"),
    ("yo", "yoruba"),
    ("zu", "zulu"),
];

/// English name for a language code, or the code itself when unknown.
pub fn language_name(code: &str) -> String {
    let lowered = code.to_lowercase();
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == lowered)
        .map(|(_, n)| n.to_string())
        .unwrap_or_else(|| code.to_string())
}

fn is_supported(code: &str) -> bool {
    let lowered = code.to_lowercase();
    LANGUAGES.iter().any(|(c, _)| *c == lowered)
}

/// What a backend returns for one translation.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendTranslation {
    pub text: String,
    pub source_code: String,
    pub pronunciation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendDetection {
    pub code: String,
    pub confidence: Option<f64>,
}

#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<BackendTranslation>;

    async fn detect(&self, text: &str) -> Result<BackendDetection>;
}

#[derive(Debug, Clone, Serialize)]
pub struct Translation {
    pub original_text: String,
    pub translated_text: String,
    pub source_language_code: String,
    pub source_language_name: String,
    pub target_language_code: String,
    pub target_language_name: String,
    pub pronunciation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectedLanguage {
    pub language_code: String,
    pub language_name: String,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportedLanguages {
    pub languages: BTreeMap<String, String>,
    pub count: usize,
}

pub struct TranslationTool {
    backend: Arc<dyn TranslationBackend>,
}

impl TranslationTool {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self { backend }
    }

    pub fn google(config: &TranslationConfig, timeout: Duration) -> Self {
        Self::new(Arc::new(GoogleTranslateBackend::new(config, timeout)))
    }

    pub async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<Translation> {
        if text.trim().is_empty() {
            return Err(Error::invalid_request("Text to translate must not be empty"));
        }
        let source = if source_lang.trim().is_empty() { "auto" } else { source_lang };
        if source != "auto" && !is_supported(source) {
            return Err(Error::invalid_request(format!("Unsupported source language: {}", source)));
        }
        if !is_supported(target_lang) {
            return Err(Error::invalid_request(format!(
                "Unsupported target language: {}",
                target_lang
            )));
        }

        let result = self.backend.translate(text, source, target_lang).await?;
        tracing::info!(
            source = %result.source_code,
            target = %target_lang,
            chars = text.chars().count(),
            "Text translated"
        );

        Ok(Translation {
            original_text: text.to_string(),
            translated_text: result.text,
            source_language_name: language_name(&result.source_code),
            source_language_code: result.source_code,
            target_language_code: target_lang.to_string(),
            target_language_name: language_name(target_lang),
            pronunciation: result.pronunciation,
        })
    }

    pub async fn detect_language(&self, text: &str) -> Result<DetectedLanguage> {
        if text.trim().is_empty() {
            return Err(Error::invalid_request("Text must not be empty"));
        }
        let detection = self.backend.detect(text).await?;
        Ok(DetectedLanguage {
            language_name: language_name(&detection.code),
            language_code: detection.code,
            confidence: detection.confidence,
        })
    }

    pub fn supported_languages(&self) -> SupportedLanguages {
        let languages: BTreeMap<String, String> = LANGUAGES
            .iter()
            .map(|(c, n)| (c.to_string(), n.to_string()))
            .collect();
        SupportedLanguages {
            count: languages.len(),
            languages,
        }
    }
}

// =============================================================================
// Google Translate (gtx)
// =============================================================================

pub struct GoogleTranslateBackend {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslateBackend {
    pub fn new(config: &TranslationConfig, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: config.base_url.clone(),
        }
    }

    async fn query(&self, text: &str, source: &str, target: &str) -> Result<Value> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("dt", "rm"),
                ("dt", "ld"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = ensure_success(SERVICE, response).await?;
        response
            .json()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("Invalid response: {}", e)))
    }
}

#[async_trait]
impl TranslationBackend for GoogleTranslateBackend {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<BackendTranslation> {
        let body = self.query(text, source, target).await?;
        parse_gtx_translation(&body, source)
    }

    async fn detect(&self, text: &str) -> Result<BackendDetection> {
        let body = self.query(text, "auto", "en").await?;
        let code = detected_source(&body)
            .ok_or_else(|| Error::upstream(SERVICE, "Response contained no detected language"))?;
        Ok(BackendDetection {
            code,
            confidence: detection_confidence(&body),
        })
    }
}

/// Parse a gtx response: `[[[translated, original, ..], .., [null, null, romanized, ..]], null, "src", ..]`.
pub fn parse_gtx_translation(body: &Value, requested_source: &str) -> Result<BackendTranslation> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| Error::upstream(SERVICE, "Unexpected response shape"))?;

    let mut text = String::new();
    let mut pronunciation = None;
    for segment in segments {
        match segment.get(0) {
            Some(Value::String(part)) => text.push_str(part),
            Some(Value::Null) => {
                pronunciation = segment
                    .get(2)
                    .and_then(Value::as_str)
                    .or_else(|| segment.get(3).and_then(Value::as_str))
                    .map(String::from);
            }
            _ => {}
        }
    }

    let source_code = detected_source(body).unwrap_or_else(|| requested_source.to_string());
    Ok(BackendTranslation {
        text,
        source_code,
        pronunciation,
    })
}

fn detected_source(body: &Value) -> Option<String> {
    body.get(2).and_then(Value::as_str).map(|s| s.to_lowercase())
}

fn detection_confidence(body: &Value) -> Option<f64> {
    body.get(8)
        .and_then(|ld| ld.get(2))
        .and_then(|c| c.get(0))
        .and_then(Value::as_f64)
        .or_else(|| body.get(6).and_then(Value::as_f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Detects Vietnamese whenever the text contains a Vietnamese letter.
    struct FixedBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TranslationBackend for FixedBackend {
        async fn translate(&self, text: &str, source: &str, _target: &str) -> Result<BackendTranslation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let code = if source != "auto" {
                source.to_string()
            } else if text.contains('ư') || text.contains('à') {
                "vi".to_string()
            } else {
                "en".to_string()
            };
            Ok(BackendTranslation {
                text: format!("[{}]", text),
                source_code: code,
                pronunciation: None,
            })
        }

        async fn detect(&self, _text: &str) -> Result<BackendDetection> {
            Ok(BackendDetection {
                code: "vi".into(),
                confidence: Some(0.98),
            })
        }
    }

    fn tool() -> TranslationTool {
        TranslationTool::new(Arc::new(FixedBackend {
            calls: AtomicUsize::new(0),
        }))
    }

    #[tokio::test]
    async fn test_auto_detection_is_consistent_for_same_input() {
        let tool = tool();
        let first = tool.translate("Xin chào thế giới, bạn khỏe không? Tôi là người Việt", "auto", "en").await.unwrap();
        let second = tool.translate("Xin chào thế giới, bạn khỏe không? Tôi là người Việt", "auto", "en").await.unwrap();
        assert_eq!(first.source_language_code, second.source_language_code);
        assert_eq!(first.source_language_code, "vi");
        assert_eq!(first.source_language_name, "vietnamese");
        assert_eq!(first.target_language_name, "english");
    }

    #[tokio::test]
    async fn test_rejects_unknown_target_and_empty_text() {
        let tool = tool();
        assert!(tool.translate("hello", "auto", "xx").await.unwrap_err().is_client_error());
        assert!(tool.translate("   ", "auto", "en").await.unwrap_err().is_client_error());
    }

    #[tokio::test]
    async fn test_detect_language() {
        let detected = tool().detect_language("Chào bạn").await.unwrap();
        assert_eq!(detected.language_code, "vi");
        assert_eq!(detected.language_name, "vietnamese");
        assert_eq!(detected.confidence, Some(0.98));
    }

    #[test]
    fn test_supported_languages() {
        let langs = tool().supported_languages();
        assert_eq!(langs.count, langs.languages.len());
        assert_eq!(langs.languages.get("ja").map(String::as_str), Some("japanese"));
    }

    #[test]
    fn test_parse_gtx_response() {
        let body = json!([
            [
                ["Hello ", "Xin chào ", null, null, 10],
                ["world", "thế giới", null, null, 10],
                [null, null, null, "Xin chào thế giới"]
            ],
            null,
            "vi",
            null, null, null,
            0.97,
            [],
            [["vi"], null, [0.97], ["vi"]]
        ]);
        let parsed = parse_gtx_translation(&body, "auto").unwrap();
        assert_eq!(parsed.text, "Hello world");
        assert_eq!(parsed.source_code, "vi");
        assert_eq!(parsed.pronunciation.as_deref(), Some("Xin chào thế giới"));
        assert_eq!(detection_confidence(&body), Some(0.97));
    }

    #[test]
    fn test_language_name_falls_back_to_code() {
        assert_eq!(language_name("EN"), "english");
        assert_eq!(language_name("tlh"), "tlh");
    }
}
