#![deny(unused)]
//! Tool adapters for the AI agent server.
//!
//! This crate provides:
//! - Web search (DuckDuckGo, SerpAPI) with retries, and Wolfram|Alpha
//! - CSV analysis and chart rendering
//! - Translation, summarization, speech, vision and LaTeX OCR adapters
//! - Image, video and slide generation
//! - The tool registry and the conversation agent on top of it

pub mod agent;
pub mod data_analysis;
pub mod http;
pub mod huggingface;
pub mod image_generation;
pub mod latex_ocr;
pub mod registry;
pub mod slides;
pub mod speech;
pub mod storage;
pub mod summarization;
pub mod tools;
pub mod translation;
pub mod video_generation;
pub mod vision;
pub mod web_search;
pub mod wolfram;

pub use agent::{AgentReply, ConversationAgent};
pub use data_analysis::DataAnalysisTool;
pub use huggingface::HuggingFaceClient;
pub use image_generation::ImageGenerationTool;
pub use latex_ocr::LatexOcrTool;
pub use registry::DefaultToolRegistry;
pub use slides::SlideGenerationTool;
pub use speech::{AsrTool, SpeechToTextTool, TextToSpeechTool};
pub use storage::FileStore;
pub use summarization::SummarizationTool;
pub use tools::{register_tools, ToolSet};
pub use translation::TranslationTool;
pub use video_generation::{VeoRestApi, VideoGenerationTool};
pub use vision::VisionTool;
pub use web_search::WebSearchTool;
pub use wolfram::WolframTool;
