//! Slide decks drafted from a topic alone.
//!
//! The caller picks the model. The reply must be a JSON outline; unlike the
//! document path there is no fallback, so a bad reply fails the request.
//! With an [`Illustrator`] configured, up to 60% of the requested slides get
//! a generated picture in the bottom-right corner.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ai_agent_core::{
    traits::{strip_code_fence, LlmClient},
    Error, Result,
};

use super::{Deck, DeckSlide, Picture, Placement, SlideGenerationTool, SlideImage, MAX_SLIDES};
use crate::http::unix_timestamp;
use crate::image_generation::ImageGenerationTool;
use crate::storage::safe_prompt_fragment;

/// Source of slide pictures.
#[async_trait]
pub trait Illustrator: Send + Sync {
    /// Encoded image bytes for `prompt`.
    async fn illustrate(&self, prompt: &str) -> Result<Vec<u8>>;
}

#[async_trait]
impl Illustrator for ImageGenerationTool {
    async fn illustrate(&self, prompt: &str) -> Result<Vec<u8>> {
        let generated = self.text_to_image(prompt).await?;
        Ok(tokio::fs::read(&generated.image_path).await?)
    }
}

#[derive(Debug, Deserialize)]
struct TopicOutline {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    slides: Vec<TopicSlide>,
}

#[derive(Debug, Deserialize)]
struct TopicSlide {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: Vec<String>,
    #[serde(default)]
    image_prompt: Option<String>,
}

/// A deck drafted from a topic.
#[derive(Debug, Clone, Serialize)]
pub struct TopicDeck {
    pub output_path: String,
    pub file_name: String,
    pub title: String,
    /// Content slides plus the title slide.
    pub num_slides: usize,
    pub num_images: usize,
    pub model: String,
}

impl SlideGenerationTool {
    /// Draft a deck about `topic` with `llm` and write it as `.pptx`.
    pub async fn create_presentation_slides(
        &self,
        llm: &dyn LlmClient,
        topic: &str,
        num_slides: usize,
    ) -> Result<TopicDeck> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(Error::invalid_request("Topic must not be empty"));
        }
        if num_slides == 0 || num_slides > MAX_SLIDES {
            return Err(Error::invalid_request(format!(
                "num_slides must be between 1 and {}",
                MAX_SLIDES
            )));
        }

        let response = llm.complete(&topic_prompt(topic, num_slides)).await?;
        let outline = parse_topic_outline(&response.content)
            .ok_or_else(|| Error::tool_execution("Model reply was not a valid slide outline"))?;

        let title = outline
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| topic.to_string());
        let budget = image_budget(num_slides, outline.slides.len());

        let mut slides = Vec::with_capacity(outline.slides.len());
        for (idx, slide) in outline.slides.into_iter().enumerate() {
            let generated = slides.iter().filter(|s: &&DeckSlide| s.picture.is_some()).count();
            let picture = if generated < budget && wants_image(idx, slide.image_prompt.as_deref()) {
                self.picture_for(&slide).await
            } else {
                None
            };
            slides.push(DeckSlide {
                title: slide.title,
                bullets: slide.content,
                picture,
            });
        }

        let deck = Deck {
            title: title.clone(),
            subtitle: "Auto-generated presentation".into(),
            slides,
        };
        let num_slides = deck.num_slides();
        let num_images = deck.num_images();
        let file_name = format!(
            "presentation_{}_{}.pptx",
            safe_prompt_fragment(topic, 30),
            unix_timestamp()
        );
        let path = self.write_deck(deck, &file_name).await?;
        tracing::info!(file = %file_name, num_slides, num_images, "Topic deck written");

        Ok(TopicDeck {
            output_path: path.display().to_string(),
            file_name,
            title,
            num_slides,
            num_images,
            model: llm.model_name().to_string(),
        })
    }

    /// Generated picture for one slide; failures leave the slide text only.
    async fn picture_for(&self, slide: &TopicSlide) -> Option<Picture> {
        let illustrator = self.illustrator.as_ref()?;
        let prompt = match slide.image_prompt.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => format!("{}, professional illustration, high quality", slide.title),
        };
        match illustrator.illustrate(&prompt).await {
            Ok(data) => match SlideImage::from_bytes(data) {
                Some(image) => Some(Picture {
                    image,
                    placement: Placement::Corner,
                }),
                None => {
                    tracing::warn!(slide = %slide.title, "Generated image is not a supported format");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(slide = %slide.title, error = %e, "Slide image generation failed");
                None
            }
        }
    }
}

/// At most 60% of the requested slides, and never more than were drafted.
fn image_budget(requested: usize, drafted: usize) -> usize {
    (requested * 3 / 5).min(drafted)
}

/// Slides with their own image prompt, and every other slide from the first.
fn wants_image(idx: usize, image_prompt: Option<&str>) -> bool {
    image_prompt.is_some_and(|p| !p.trim().is_empty()) || idx % 2 == 0
}

fn topic_prompt(topic: &str, num_slides: usize) -> String {
    format!(
        r#"Create a presentation about: {topic}

Requirements:
- Create {num_slides} slides
- Each slide has a title and detailed content
- Content must be logical and coherent
- Use bullet points
- Add an "image_prompt" field to some slides to illustrate them (in English, detailed description)
- Use this JSON format:
{{
  "title": "Presentation title",
  "slides": [
    {{
      "title": "Slide title",
      "content": ["Point 1", "Point 2", "Point 3"],
      "image_prompt": "detailed image description in English (optional)"
    }}
  ]
}}

Return only the JSON, no other text."#
    )
}

fn parse_topic_outline(reply: &str) -> Option<TopicOutline> {
    let outline: TopicOutline = serde_json::from_str(strip_code_fence(reply)).ok()?;
    if outline.slides.is_empty() {
        return None;
    }
    Some(outline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_agent_core::config::SlidesConfig;
    use ai_agent_core::mocks::MockLlm;
    use image::{ImageFormat, RgbImage};
    use std::io::{Cursor, Read};
    use std::sync::{Arc, Mutex};

    struct MockIllustrator {
        prompts: Mutex<Vec<String>>,
        fail_on: Option<usize>,
    }

    impl MockIllustrator {
        fn new(fail_on: Option<usize>) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                fail_on,
            })
        }
    }

    #[async_trait]
    impl Illustrator for MockIllustrator {
        async fn illustrate(&self, prompt: &str) -> Result<Vec<u8>> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            if self.fail_on == Some(prompts.len()) {
                return Err(Error::Upstream {
                    service: "Clipdrop".into(),
                    message: "quota exceeded".into(),
                });
            }
            let mut out = Cursor::new(Vec::new());
            RgbImage::new(16, 9).write_to(&mut out, ImageFormat::Png).unwrap();
            Ok(out.into_inner())
        }
    }

    const OUTLINE: &str = r#"```json
{"title": "Rust in Production", "slides": [
  {"title": "Why Rust", "content": ["Memory safety", "Speed"]},
  {"title": "Ownership", "content": ["Moves"], "image_prompt": "a crab guarding a box"},
  {"title": "Tooling", "content": ["cargo", "clippy"]},
  {"title": "Adoption", "content": ["Linux kernel"]},
  {"title": "Summary", "content": ["Try it"]}
]}
```"#;

    fn tool(dir: &std::path::Path) -> SlideGenerationTool {
        SlideGenerationTool::new(Arc::new(MockLlm::constant("")), dir, &SlidesConfig::default())
    }

    #[tokio::test]
    async fn test_topic_deck_with_images() {
        let dir = tempfile::tempdir().unwrap();
        let illustrator = MockIllustrator::new(None);
        let tool = tool(dir.path()).with_illustrator(illustrator.clone());
        let llm = MockLlm::constant(OUTLINE);

        let deck = tool
            .create_presentation_slides(&llm, "Rust in production", 5)
            .await
            .unwrap();

        assert_eq!(deck.title, "Rust in Production");
        assert_eq!(deck.num_slides, 6);
        assert_eq!(deck.num_images, 3);
        assert!(deck.file_name.starts_with("presentation_Rust_in_production_"));
        assert!(llm.prompts()[0].contains("Create 5 slides"));

        // Slide 0 (even), slide 1 (own prompt), slide 2 (even); then the budget is spent.
        let prompts = illustrator.prompts.lock().unwrap().clone();
        assert_eq!(
            prompts,
            vec![
                "Why Rust, professional illustration, high quality",
                "a crab guarding a box",
                "Tooling, professional illustration, high quality",
            ]
        );

        let bytes = std::fs::read(dir.path().join(&deck.file_name)).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut slide = String::new();
        archive
            .by_name("ppt/slides/slide2.xml")
            .unwrap()
            .read_to_string(&mut slide)
            .unwrap();
        assert!(slide.contains("<a:t>Memory safety</a:t>"));
        assert!(slide.contains(r#"<a:off x="6400800" y="4114800"/>"#));
        assert!(archive.by_name("ppt/media/image3.png").is_ok());
    }

    #[tokio::test]
    async fn test_failed_image_leaves_slide_text_only() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool(dir.path()).with_illustrator(MockIllustrator::new(Some(1)));

        let deck = tool
            .create_presentation_slides(&MockLlm::constant(OUTLINE), "Rust", 5)
            .await
            .unwrap();
        assert_eq!(deck.num_images, 3);
        assert_eq!(deck.num_slides, 6);
    }

    #[tokio::test]
    async fn test_without_illustrator_deck_is_text_only() {
        let dir = tempfile::tempdir().unwrap();
        let reply = r#"{"slides": [{"title": "Only", "content": ["One point"]}]}"#;

        let deck = tool(dir.path())
            .create_presentation_slides(&MockLlm::constant(reply), "Borrow checker", 1)
            .await
            .unwrap();
        assert_eq!(deck.title, "Borrow checker");
        assert_eq!(deck.num_slides, 2);
        assert_eq!(deck.num_images, 0);
    }

    #[tokio::test]
    async fn test_invalid_topic_requests() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool(dir.path());
        let llm = MockLlm::constant("I cannot help with that.");

        let err = tool.create_presentation_slides(&llm, "Rust", 3).await.unwrap_err();
        assert!(err.to_string().contains("not a valid slide outline"));
        assert!(tool
            .create_presentation_slides(&llm, "  ", 3)
            .await
            .unwrap_err()
            .is_client_error());
        assert!(tool
            .create_presentation_slides(&llm, "Rust", 0)
            .await
            .unwrap_err()
            .is_client_error());
        assert!(tool
            .create_presentation_slides(&MockLlm::failing(), "Rust", 3)
            .await
            .is_err());
    }

    #[test]
    fn test_image_selection() {
        assert_eq!(image_budget(5, 5), 3);
        assert_eq!(image_budget(1, 1), 0);
        assert_eq!(image_budget(10, 4), 4);
        assert!(wants_image(0, None));
        assert!(!wants_image(1, None));
        assert!(!wants_image(3, Some("  ")));
        assert!(wants_image(3, Some("a diagram")));
    }
}
