//! Slide deck generation.
//!
//! From uploaded documents: text and images are extracted, the LLM drafts a
//! JSON outline, and the outline is written as a `.pptx` deck with uploaded
//! images placed beside the slides that ask for one. Any LLM or parse
//! failure falls back to a fixed outline built from word chunks of the
//! source text.
//!
//! From a topic: see [`topic`].

pub mod extract;
pub mod render;
pub mod topic;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use ai_agent_core::{
    config::SlidesConfig,
    traits::{strip_code_fence, LlmClient},
    Error, Result,
};

use crate::http::unix_timestamp;
pub use extract::{extract_content, ExtractedContent, SourceDocument};
pub use render::{render_pptx, Deck, DeckSlide, Picture, Placement, SlideImage};
pub use topic::{Illustrator, TopicDeck};

pub const MAX_SLIDES: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideOutline {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

fn default_title() -> String {
    "Document Summary".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    #[serde(default)]
    pub slide_number: usize,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Vec<String>,
    #[serde(default)]
    pub needs_image: bool,
    #[serde(default)]
    pub image_description: Option<String>,
}

/// A rendered deck.
#[derive(Debug, Clone, Serialize)]
pub struct SlideDeck {
    pub output_path: String,
    pub file_name: String,
    pub num_slides: usize,
    /// Readable images found among the uploads.
    pub num_images: usize,
    pub title: String,
}

pub struct SlideGenerationTool {
    llm: Arc<dyn LlmClient>,
    slides_dir: PathBuf,
    max_prompt_chars: usize,
    illustrator: Option<Arc<dyn Illustrator>>,
}

impl SlideGenerationTool {
    pub fn new(llm: Arc<dyn LlmClient>, slides_dir: impl Into<PathBuf>, config: &SlidesConfig) -> Self {
        Self {
            llm,
            slides_dir: slides_dir.into(),
            max_prompt_chars: config.max_prompt_chars,
            illustrator: None,
        }
    }

    /// Image source for topic decks. Without one, topic decks are text only.
    pub fn with_illustrator(mut self, illustrator: Arc<dyn Illustrator>) -> Self {
        self.illustrator = Some(illustrator);
        self
    }

    pub async fn create_slides(&self, documents: Vec<SourceDocument>, num_slides: usize) -> Result<SlideDeck> {
        if documents.is_empty() {
            return Err(Error::invalid_request("No files uploaded"));
        }
        if num_slides == 0 || num_slides > MAX_SLIDES {
            return Err(Error::invalid_request(format!(
                "num_slides must be between 1 and {}",
                MAX_SLIDES
            )));
        }

        let content = tokio::task::spawn_blocking(move || extract_content(&documents))
            .await
            .map_err(|e| Error::internal(format!("Extraction task failed: {}", e)))?;
        if !content.has_text {
            return Err(Error::invalid_request(
                "No text could be extracted from the uploaded files",
            ));
        }

        let outline = self.outline(&content.text, num_slides).await;
        tracing::info!(title = %outline.title, slides = outline.slides.len(), "Slide outline ready");

        let num_images = content.images.len();
        let deck = document_deck(&outline, content.images);
        let num_slides = deck.num_slides();
        let file_name = format!("presentation_{}.pptx", unix_timestamp());
        let path = self.write_deck(deck, &file_name).await?;

        Ok(SlideDeck {
            output_path: path.display().to_string(),
            file_name,
            num_slides,
            num_images,
            title: outline.title,
        })
    }

    /// Render `deck` into the slides directory off the async runtime.
    async fn write_deck(&self, deck: Deck, file_name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.slides_dir).await?;
        let path = self.slides_dir.join(file_name);
        let target = path.clone();
        tokio::task::spawn_blocking(move || render_pptx(&deck, &target))
            .await
            .map_err(|e| Error::internal(format!("Render task failed: {}", e)))??;
        Ok(path)
    }

    /// LLM-drafted outline, or the fallback outline when drafting fails.
    pub async fn outline(&self, text: &str, num_slides: usize) -> SlideOutline {
        let excerpt: String = text.chars().take(self.max_prompt_chars).collect();
        let prompt = outline_prompt(&excerpt, num_slides);

        match self.llm.complete(&prompt).await {
            Ok(response) => match parse_outline(&response.content) {
                Some(outline) => outline,
                None => {
                    tracing::warn!("LLM outline was not valid JSON, using fallback outline");
                    default_outline(text, num_slides)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "LLM outline request failed, using fallback outline");
                default_outline(text, num_slides)
            }
        }
    }
}

/// Title slide from the outline title, then one slide per outline slide
/// after the first. Uploaded images go, in order, beside the slides that ask
/// for one until they run out.
pub fn document_deck(outline: &SlideOutline, images: Vec<SlideImage>) -> Deck {
    let mut images = images.into_iter();
    let slides = outline
        .slides
        .iter()
        .skip(1)
        .map(|slide| DeckSlide {
            title: slide.title.clone(),
            bullets: slide.content.clone(),
            picture: if slide.needs_image {
                images.next().map(|image| Picture {
                    image,
                    placement: Placement::Beside,
                })
            } else {
                None
            },
        })
        .collect();
    Deck {
        title: outline.title.clone(),
        subtitle: "Auto-generated presentation".into(),
        slides,
    }
}

fn outline_prompt(content: &str, num_slides: usize) -> String {
    format!(
        r#"You are an expert presentation designer. Analyze the following content from multiple documents and create a structured outline for a {n}-slide presentation.

Content:
{content}

Instructions:
1. Create exactly {n} slides (including title slide)
2. Each slide should have a clear, concise title (max 8 words) and 3-5 bullet points summarizing key information
3. Suggest whether an image would be relevant
4. Organize content logically and focus on the most important information

Return your response as a JSON object with this structure:
{{
  "title": "Main presentation title",
  "slides": [
    {{
      "slide_number": 1,
      "title": "Slide title",
      "content": ["Bullet point 1", "Bullet point 2", "Bullet point 3"],
      "needs_image": false,
      "image_description": "Description of what image would fit"
    }}
  ]
}}

IMPORTANT: Return ONLY the JSON object, no additional text or markdown formatting."#,
        n = num_slides,
        content = content
    )
}

/// Parse an outline reply, tolerating markdown fences. Outlines without
/// slides are rejected.
pub fn parse_outline(reply: &str) -> Option<SlideOutline> {
    let outline: SlideOutline = serde_json::from_str(strip_code_fence(reply)).ok()?;
    if outline.slides.is_empty() {
        return None;
    }
    Some(outline)
}

/// Title slide plus `num_slides - 1` sections of evenly chunked words.
pub fn default_outline(text: &str, num_slides: usize) -> SlideOutline {
    let words: Vec<&str> = text.split_whitespace().collect();
    let chunk_size = if num_slides > 1 {
        words.len() / (num_slides - 1)
    } else {
        words.len()
    };

    let mut slides = vec![Slide {
        slide_number: 1,
        title: "Document Summary".into(),
        content: vec!["Generated from uploaded documents".into()],
        needs_image: false,
        image_description: None,
    }];

    for i in 1..num_slides {
        let start = ((i - 1) * chunk_size).min(words.len());
        let end = (start + chunk_size).min(words.len());
        let chunk = words[start..end].join(" ");
        let preview: String = chunk.chars().take(100).collect();
        slides.push(Slide {
            slide_number: i + 1,
            title: format!("Section {}", i),
            content: vec![format!("{}...", preview)],
            needs_image: false,
            image_description: None,
        });
    }

    SlideOutline {
        title: "Document Presentation".into(),
        slides,
    }
}
