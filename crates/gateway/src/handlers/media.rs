//! Speech, vision, OCR and generation routes.
//!
//! Every route answers with the `{success, data|error}` envelope.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use ai_agent_core::{types::ToolEnvelope, Error, Result};
use ai_agent_skills::image_generation::GeneratedImage;
use ai_agent_skills::latex_ocr::LatexResult;
use ai_agent_skills::slides::{SlideDeck, SourceDocument, MAX_SLIDES};
use ai_agent_skills::speech::{AsrResult, AsrTask, SpeechAudio, SttMethod, Transcription};
use ai_agent_skills::video_generation::GeneratedVideo;
use ai_agent_skills::vision::{validate_image, VisionTask};

use super::MultipartForm;
use crate::error::{envelope, ApiError, ApiResult};
use crate::state::AppState;

type Envelope<T> = ApiResult<Json<ToolEnvelope<T>>>;

// =============================================================================
// Speech
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: Option<String>,
}

pub async fn text_to_speech(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SpeechRequest>,
) -> Envelope<SpeechAudio> {
    envelope(state.tts.synthesize(&payload.text, payload.voice.as_deref()).await)
}

pub async fn speech_to_text(State(state): State<Arc<AppState>>, multipart: Multipart) -> Envelope<Transcription> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = form.take_file(&["file", "audio"])?;
    let method = SttMethod::parse(form.field("method").unwrap_or("auto"))?;

    envelope(
        state
            .stt
            .transcribe(
                file.data.to_vec(),
                &file.file_name,
                method,
                form.field("language"),
                form.flag("translate_to_english"),
            )
            .await,
    )
}

pub async fn asr_transcribe(State(state): State<Arc<AppState>>, multipart: Multipart) -> Envelope<AsrResult> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = form.take_file(&["file", "audio"])?;
    let task = AsrTask::parse(form.field("task").unwrap_or("transcribe"))?;

    envelope(state.asr.transcribe(&file.data, form.field("language"), task).await)
}

// =============================================================================
// Images
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    pub file_name: String,
    pub image_path: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub size_bytes: usize,
}

pub async fn upload_image(State(state): State<Arc<AppState>>, multipart: Multipart) -> Envelope<UploadedImage> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = form.take_file(&["file", "image"])?;
    let info = validate_image(&file.data)?;
    let path = state.store.save_upload(&file.file_name, &file.data).await?;

    tracing::info!(path = %path.display(), width = info.width, height = info.height, "Image uploaded");
    envelope(Ok(UploadedImage {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        image_path: path.display().to_string(),
        width: info.width,
        height: info.height,
        format: info.format,
        size_bytes: info.size_bytes,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VisionRequest {
    pub image_path: String,
    #[serde(default = "default_vision_task")]
    pub task: String,
    #[serde(default)]
    pub question: Option<String>,
}

fn default_vision_task() -> String {
    "vqa".into()
}

pub async fn vision(State(state): State<Arc<AppState>>, Json(payload): Json<VisionRequest>) -> Envelope<Value> {
    let task = VisionTask::parse(&payload.task)?;
    let path = state.store.resolve_upload(&payload.image_path).await?;

    let result = match task {
        VisionTask::Vqa => {
            let question = payload.question.as_deref().unwrap_or_default();
            to_value(state.vision.answer_question(&path, question).await)
        }
        VisionTask::Ocr => to_value(state.vision.extract_text(&path).await),
    };
    envelope(result)
}

fn to_value<T: Serialize>(result: Result<T>) -> Result<Value> {
    result.and_then(|data| serde_json::to_value(data).map_err(Error::from))
}

pub async fn latex_ocr(State(state): State<Arc<AppState>>, multipart: Multipart) -> Envelope<LatexResult> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = form.take_file(&["file", "image"])?;
    envelope(state.latex.image_to_latex(file.data.to_vec(), &file.file_name).await)
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

pub async fn text_to_image(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PromptRequest>,
) -> Envelope<GeneratedImage> {
    envelope(state.image_gen.text_to_image(&payload.prompt).await)
}

// =============================================================================
// Video
// =============================================================================

pub async fn text_to_video(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PromptRequest>,
) -> Envelope<GeneratedVideo> {
    envelope(state.video.text_to_video(&payload.prompt).await)
}

#[derive(Debug, Deserialize)]
pub struct ImageToVideoRequest {
    pub image_path: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "default_video_mode")]
    pub mode: String,
}

fn default_video_mode() -> String {
    "single".into()
}

pub async fn image_to_video(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ImageToVideoRequest>,
) -> Envelope<GeneratedVideo> {
    let path = state.store.resolve_upload(&payload.image_path).await?;
    envelope(
        state
            .video
            .image_to_video(&path, payload.prompt.as_deref(), &payload.mode)
            .await,
    )
}

#[derive(Debug, Deserialize)]
pub struct ReferenceImagesRequest {
    pub image_paths: Vec<String>,
    pub prompt: String,
}

pub async fn reference_images_to_video(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ReferenceImagesRequest>,
) -> Envelope<GeneratedVideo> {
    let mut paths: Vec<PathBuf> = Vec::with_capacity(payload.image_paths.len());
    for image in &payload.image_paths {
        paths.push(state.store.resolve_upload(image).await?);
    }
    let refs: Vec<&std::path::Path> = paths.iter().map(PathBuf::as_path).collect();
    envelope(state.video.reference_images_to_video(&refs, &payload.prompt).await)
}

pub async fn prompt_to_image_to_video(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PromptRequest>,
) -> Envelope<GeneratedVideo> {
    envelope(state.video.prompt_to_image_to_video(&payload.prompt).await)
}

// =============================================================================
// Slides
// =============================================================================

pub async fn create_slides(State(state): State<Arc<AppState>>, multipart: Multipart) -> Envelope<SlideDeck> {
    let form = MultipartForm::read(multipart).await?;
    let num_slides = match form.field("num_slides") {
        Some(raw) => raw.parse::<usize>().map_err(|_| {
            ApiError::bad_request(format!("num_slides must be a number between 1 and {}", MAX_SLIDES))
        })?,
        None => state.config.slides.default_num_slides,
    };

    let documents: Vec<SourceDocument> = form
        .files
        .into_iter()
        .filter(|f| matches!(f.field.as_str(), "files" | "files[]" | "file"))
        .map(|f| SourceDocument {
            file_name: f.file_name,
            data: f.data.to_vec(),
        })
        .collect();

    tracing::info!(files = documents.len(), num_slides, "Creating slides");
    envelope(state.slides.create_slides(documents, num_slides).await)
}
