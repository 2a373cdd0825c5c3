//! Shared application state.
//!
//! Every adapter is constructed once here and handed to the handlers through
//! `Arc<AppState>`.

use std::sync::Arc;
use std::time::Duration;

use ai_agent_core::{
    traits::{GroundedSearch, LlmClient, ToolRegistry},
    AppConfig, Result,
};
use ai_agent_model_gateway::GeminiRestClient;
use ai_agent_skills::{
    register_tools, AsrTool, ConversationAgent, DataAnalysisTool, DefaultToolRegistry, FileStore,
    HuggingFaceClient, ImageGenerationTool, LatexOcrTool, SlideGenerationTool, SpeechToTextTool,
    SummarizationTool, TextToSpeechTool, ToolSet, TranslationTool, VeoRestApi, VideoGenerationTool,
    VisionTool, WebSearchTool, WolframTool,
};

pub struct AppState {
    pub config: AppConfig,
    pub store: FileStore,
    pub llm: Arc<dyn LlmClient>,
    pub search: Arc<WebSearchTool>,
    /// Gemini search grounding; present only with a Gemini key.
    pub grounded: Option<Arc<dyn GroundedSearch>>,
    pub wolfram: Arc<WolframTool>,
    pub data: Arc<DataAnalysisTool>,
    pub translation: Arc<TranslationTool>,
    pub summarization: Arc<SummarizationTool>,
    pub tts: Arc<TextToSpeechTool>,
    pub stt: Arc<SpeechToTextTool>,
    pub asr: Arc<AsrTool>,
    pub vision: Arc<VisionTool>,
    pub latex: Arc<LatexOcrTool>,
    pub image_gen: Arc<ImageGenerationTool>,
    pub video: Arc<VideoGenerationTool>,
    pub slides: Arc<SlideGenerationTool>,
    pub registry: Arc<dyn ToolRegistry>,
    pub agent: Arc<ConversationAgent>,
}

impl AppState {
    /// Build every adapter from configuration around the given LLM and
    /// search service, and register the agent tools.
    pub async fn new(config: AppConfig, llm: Arc<dyn LlmClient>, search: Arc<WebSearchTool>) -> Result<Self> {
        let timeout = Duration::from_secs(config.http.timeout_secs);
        let store = FileStore::new(&config.storage);
        let gemini_key = config.llm.gemini_api_key.clone();
        let openai_key = config.llm.openai_api_key.clone();

        let gemini = gemini_key.clone().map(|key| {
            let client = GeminiRestClient::new(key, timeout)
                .with_image_model(&config.video_generation.image_model);
            if config.llm.provider.eq_ignore_ascii_case("gemini") {
                client.with_text_model(&config.llm.model)
            } else {
                client
            }
        });
        let grounded = gemini
            .clone()
            .map(|client| Arc::new(client) as Arc<dyn GroundedSearch>);

        let hf = HuggingFaceClient::new(&config.huggingface, timeout);
        let wolfram = Arc::new(WolframTool::new(&config.wolfram));
        let data = Arc::new(DataAnalysisTool::new(
            &config.data_analysis,
            store.charts_dir.clone(),
            llm.clone(),
        ));
        let translation = Arc::new(TranslationTool::google(&config.translation, timeout));
        let summarization = Arc::new(SummarizationTool::new(
            hf.clone(),
            config.huggingface.summarization_model.clone(),
        ));
        let tts = Arc::new(TextToSpeechTool::new(
            &config.speech,
            openai_key.clone(),
            store.clone(),
            timeout,
        ));
        let stt = Arc::new(SpeechToTextTool::new(
            &config.speech,
            openai_key,
            hf.clone(),
            config.huggingface.asr_model.clone(),
            timeout,
        ));
        let asr = Arc::new(AsrTool::new(hf.clone(), config.huggingface.asr_model.clone()));
        let vision = Arc::new(VisionTool::new(
            hf,
            config.huggingface.vqa_model.clone(),
            config.huggingface.ocr_model.clone(),
        ));
        let latex = Arc::new(LatexOcrTool::new(&config.latex_ocr, timeout));
        let image_gen = Arc::new(ImageGenerationTool::new(
            &config.image_generation,
            store.clone(),
            timeout,
        ));

        let veo = Arc::new(VeoRestApi::new(&config.video_generation, gemini_key, timeout));
        let mut video = VideoGenerationTool::new(veo, &config.video_generation, store.clone());
        if let Some(client) = gemini {
            video = video.with_image_client(client);
        }

        let mut slides = SlideGenerationTool::new(llm.clone(), store.slides_dir.clone(), &config.slides);
        if image_gen.is_configured() {
            slides = slides.with_illustrator(image_gen.clone());
        }

        let registry: Arc<dyn ToolRegistry> = Arc::new(DefaultToolRegistry::new());
        register_tools(
            registry.as_ref(),
            ToolSet {
                search: search.clone(),
                wolfram: wolfram.clone(),
                data: data.clone(),
                translation: translation.clone(),
                summarization: summarization.clone(),
                store: store.clone(),
            },
        )
        .await?;
        let agent = Arc::new(ConversationAgent::new(
            llm.clone(),
            registry.clone(),
            config.llm.history_window,
        ));

        Ok(Self {
            config,
            store,
            llm,
            search,
            grounded,
            wolfram,
            data,
            translation,
            summarization,
            tts,
            stt,
            asr,
            vision,
            latex,
            image_gen,
            video: Arc::new(video),
            slides: Arc::new(slides),
            registry,
            agent,
        })
    }

    /// Replace the grounded search provider.
    pub fn with_grounded(mut self, grounded: Arc<dyn GroundedSearch>) -> Self {
        self.grounded = Some(grounded);
        self
    }

    /// Replace the video generation service.
    pub fn with_video(mut self, video: VideoGenerationTool) -> Self {
        self.video = Arc::new(video);
        self
    }
}
