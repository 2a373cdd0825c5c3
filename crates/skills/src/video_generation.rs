//! Veo video generation through the Gemini REST long-running operation API.
//!
//! A job is started with `predictLongRunning` and polled until `done`. The
//! polling loop sleeps `poll_interval` (at least one second) between checks and
//! gives up once `max_wait` has elapsed on the runtime clock.

use async_trait::async_trait;
use base64::Engine as _;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use ai_agent_core::{config::VideoGenerationConfig, Error, Result};
use ai_agent_model_gateway::GeminiRestClient;

use crate::http::{build_client, ensure_success, transport_error, unix_timestamp};
use crate::storage::{safe_prompt_fragment, FileStore};

const SERVICE: &str = "Veo";
const DEFAULT_IMAGE_PROMPT: &str = "Create a video from this image";
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// State of a long-running video job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Done { video_uri: String },
    Failed(String),
}

/// Long-running video operation endpoints.
#[async_trait]
pub trait VideoJobApi: Send + Sync {
    /// Submit a job and return the operation name.
    async fn start(&self, instance: Value) -> Result<String>;

    async fn poll(&self, operation: &str) -> Result<JobStatus>;

    async fn download(&self, uri: &str) -> Result<Vec<u8>>;
}

// =============================================================================
// Gemini REST implementation
// =============================================================================

pub struct VeoRestApi {
    client: reqwest::Client,
    api_key: Option<Secret<String>>,
    base_url: String,
    model: String,
}

impl VeoRestApi {
    pub fn new(config: &VideoGenerationConfig, api_key: Option<Secret<String>>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .ok_or_else(|| Error::not_configured("GEMINI_API_KEY"))
    }
}

#[async_trait]
impl VideoJobApi for VeoRestApi {
    async fn start(&self, instance: Value) -> Result<String> {
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, self.model);
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.key()?)
            .json(&json!({ "instances": [instance] }))
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let body: Value = ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("Invalid response: {}", e)))?;

        body.get("name")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| Error::upstream(SERVICE, "Response contained no operation name"))
    }

    async fn poll(&self, operation: &str) -> Result<JobStatus> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, operation))
            .header("x-goog-api-key", self.key()?)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let body: Value = ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("Invalid response: {}", e)))?;
        Ok(parse_operation(&body))
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(uri)
            .header("x-goog-api-key", self.key()?)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let bytes = ensure_success(SERVICE, response)
            .await?
            .bytes()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        Ok(bytes.to_vec())
    }
}

/// Map an operation resource to a `JobStatus`.
pub fn parse_operation(body: &Value) -> JobStatus {
    if !body.get("done").and_then(Value::as_bool).unwrap_or(false) {
        return JobStatus::Pending;
    }
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return JobStatus::Failed(message.to_string());
    }
    match body
        .pointer("/response/generateVideoResponse/generatedSamples/0/video/uri")
        .and_then(Value::as_str)
    {
        Some(uri) => JobStatus::Done {
            video_uri: uri.to_string(),
        },
        None => JobStatus::Failed("Operation finished without a video".into()),
    }
}

// =============================================================================
// Tool
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedVideo {
    pub video_path: String,
    pub file_name: String,
    pub generation_time: u64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_image_path: Option<String>,
}

enum WaitOutcome {
    Finished { uri: String, elapsed: u64 },
    TimedOut,
}

pub struct VideoGenerationTool {
    api: Arc<dyn VideoJobApi>,
    images: Option<GeminiRestClient>,
    store: FileStore,
    poll_interval: Duration,
    max_wait: Duration,
}

impl VideoGenerationTool {
    pub fn new(api: Arc<dyn VideoJobApi>, config: &VideoGenerationConfig, store: FileStore) -> Self {
        Self {
            api,
            images: None,
            store,
            poll_interval: config.poll_interval().max(MIN_POLL_INTERVAL),
            max_wait: config.max_wait(),
        }
    }

    /// Enable the prompt-to-image-to-video flow.
    pub fn with_image_client(mut self, images: GeminiRestClient) -> Self {
        self.images = Some(images);
        self
    }

    pub async fn text_to_video(&self, prompt: &str) -> Result<GeneratedVideo> {
        if prompt.trim().is_empty() {
            return Err(Error::invalid_request("Prompt must not be empty"));
        }
        let file_name = format!(
            "video_{}_{}.mp4",
            safe_prompt_fragment(prompt, 30),
            unix_timestamp()
        );
        self.run(
            json!({ "prompt": prompt }),
            file_name,
            format!("Video generated successfully from prompt: {}", prompt),
        )
        .await
    }

    pub async fn image_to_video(&self, image_path: &Path, prompt: Option<&str>, mode: &str) -> Result<GeneratedVideo> {
        if mode != "single" {
            return Err(Error::invalid_request(
                "Invalid mode. Use /reference-images-to-video for multiple images.",
            ));
        }
        let image = encoded_image(image_path).await?;
        let prompt = prompt
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_IMAGE_PROMPT);
        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        let file_name = format!("video_from_{}_{}.mp4", stem, unix_timestamp());
        let display_name = image_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(stem);

        self.run(
            json!({ "prompt": prompt, "image": image }),
            file_name,
            format!("Video generated successfully from image: {}", display_name),
        )
        .await
    }

    pub async fn reference_images_to_video(&self, image_paths: &[&Path], prompt: &str) -> Result<GeneratedVideo> {
        if image_paths.is_empty() {
            return Err(Error::invalid_request("No images provided"));
        }
        if prompt.trim().is_empty() {
            return Err(Error::invalid_request("Prompt is required for reference images mode"));
        }

        let mut references = Vec::with_capacity(image_paths.len());
        for path in image_paths {
            references.push(json!({
                "image": encoded_image(path).await?,
                "referenceType": "asset"
            }));
        }

        let file_name = format!("video_reference_{}.mp4", unix_timestamp());
        self.run(
            json!({ "prompt": prompt, "referenceImages": references }),
            file_name,
            format!(
                "Video generated successfully from {} reference images",
                image_paths.len()
            ),
        )
        .await
    }

    /// Generate an image for the prompt, then animate it.
    pub async fn prompt_to_image_to_video(&self, prompt: &str) -> Result<GeneratedVideo> {
        if prompt.trim().is_empty() {
            return Err(Error::invalid_request("Prompt is required"));
        }
        let images = self
            .images
            .as_ref()
            .ok_or_else(|| Error::not_configured("GEMINI_API_KEY"))?;

        let safe = safe_prompt_fragment(prompt, 30);
        let png = images.generate_image(prompt).await?;
        let image_name = format!("generated_image_{}_{}.png", safe, unix_timestamp());
        let image_path = self.store.save_output(&image_name, &png).await?;
        tracing::info!(file = %image_name, "Intermediate image generated");

        let image = json!({
            "bytesBase64Encoded": base64::engine::general_purpose::STANDARD.encode(&png),
            "mimeType": image_mime(&png),
        });
        let file_name = format!("video_from_prompt_{}_{}.mp4", safe, unix_timestamp());
        let image_display = image_path.display().to_string();

        match self
            .run(
                json!({ "prompt": prompt, "image": image }),
                file_name,
                format!("Video generated successfully from prompt: {}", prompt),
            )
            .await
        {
            Ok(mut video) => {
                video.generated_image_path = Some(image_display);
                Ok(video)
            }
            Err(Error::Timeout(msg)) => Err(Error::Timeout(format!(
                "{}. Generated image saved at: {}",
                msg, image_display
            ))),
            Err(e) => Err(e),
        }
    }

    async fn run(&self, instance: Value, file_name: String, message: String) -> Result<GeneratedVideo> {
        let operation = self.api.start(instance).await?;
        tracing::info!(operation = %operation, "Video generation started");

        let (uri, elapsed) = match self.wait(&operation).await? {
            WaitOutcome::Finished { uri, elapsed } => (uri, elapsed),
            WaitOutcome::TimedOut => {
                tracing::warn!(operation = %operation, max_wait = ?self.max_wait, "Video generation timed out");
                return Err(Error::Timeout(format!(
                    "Video generation timeout after {} seconds",
                    self.max_wait.as_secs()
                )));
            }
        };

        let video = self.api.download(&uri).await?;
        let path = self.store.save_output(&file_name, &video).await?;
        tracing::info!(file = %file_name, elapsed_secs = elapsed, bytes = video.len(), "Video saved");

        Ok(GeneratedVideo {
            video_path: path.display().to_string(),
            file_name,
            generation_time: elapsed,
            message,
            generated_image_path: None,
        })
    }

    async fn wait(&self, operation: &str) -> Result<WaitOutcome> {
        let started = Instant::now();
        loop {
            if started.elapsed() >= self.max_wait {
                return Ok(WaitOutcome::TimedOut);
            }
            tokio::time::sleep(self.poll_interval).await;

            match self.api.poll(operation).await? {
                JobStatus::Pending => {
                    tracing::debug!(
                        operation = %operation,
                        elapsed_secs = started.elapsed().as_secs(),
                        "Video still generating"
                    );
                }
                JobStatus::Done { video_uri } => {
                    return Ok(WaitOutcome::Finished {
                        uri: video_uri,
                        elapsed: started.elapsed().as_secs(),
                    })
                }
                JobStatus::Failed(message) => {
                    return Err(Error::upstream(SERVICE, format!("Video generation failed: {}", message)))
                }
            }
        }
    }
}

async fn encoded_image(path: &Path) -> Result<Value> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|_| Error::not_found(format!("Image file not found: {}", path.display())))?;
    Ok(json!({
        "bytesBase64Encoded": base64::engine::general_purpose::STANDARD.encode(&data),
        "mimeType": image_mime(&data),
    }))
}

fn image_mime(data: &[u8]) -> &'static str {
    match image::guess_format(data) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::WebP) => "image/webp",
        Ok(image::ImageFormat::Gif) => "image/gif",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedJobs {
        statuses: Mutex<Vec<JobStatus>>,
        polls: Mutex<usize>,
        instances: Mutex<Vec<Value>>,
    }

    impl ScriptedJobs {
        fn new(statuses: Vec<JobStatus>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                polls: Mutex::new(0),
                instances: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VideoJobApi for ScriptedJobs {
        async fn start(&self, instance: Value) -> Result<String> {
            self.instances.lock().unwrap().push(instance);
            Ok("operations/op-1".into())
        }

        async fn poll(&self, _operation: &str) -> Result<JobStatus> {
            *self.polls.lock().unwrap() += 1;
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                Ok(statuses.remove(0))
            } else {
                Ok(statuses.first().cloned().unwrap_or(JobStatus::Pending))
            }
        }

        async fn download(&self, _uri: &str) -> Result<Vec<u8>> {
            Ok(b"mp4-bytes".to_vec())
        }
    }

    fn tool(api: Arc<ScriptedJobs>, dir: &Path) -> VideoGenerationTool {
        VideoGenerationTool::new(api, &VideoGenerationConfig::default(), FileStore::under(dir))
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_finishing_job_times_out_after_max_wait() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(ScriptedJobs::new(vec![JobStatus::Pending]));
        let tool = tool(api.clone(), dir.path());

        let start = tokio::time::Instant::now();
        let err = tool.text_to_video("a slow sunrise").await.unwrap_err();

        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(err.to_string(), "Timeout: Video generation timeout after 300 seconds");
        assert_eq!(*api.polls.lock().unwrap(), 30);
        assert_eq!(start.elapsed(), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_poll_interval_still_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(ScriptedJobs::new(vec![JobStatus::Pending]));
        let config = VideoGenerationConfig {
            poll_interval_secs: 0,
            max_wait_secs: 5,
            ..Default::default()
        };
        let tool = VideoGenerationTool::new(api.clone(), &config, FileStore::under(dir.path()));

        let err = tool.text_to_video("a slow sunrise").await.unwrap_err();
        assert_eq!(err.to_string(), "Timeout: Video generation timeout after 5 seconds");
        assert_eq!(*api.polls.lock().unwrap(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_job_is_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(ScriptedJobs::new(vec![
            JobStatus::Pending,
            JobStatus::Done {
                video_uri: "https://example.test/v.mp4".into(),
            },
        ]));
        let tool = tool(api.clone(), dir.path());

        let video = tool.text_to_video("A cat, dancing!").await.unwrap();
        assert_eq!(video.generation_time, 20);
        assert!(video.file_name.starts_with("video_A_cat_dancing_"));
        let saved = tokio::fs::read(dir.path().join("output").join(&video.file_name)).await.unwrap();
        assert_eq!(saved, b"mp4-bytes");
        assert_eq!(api.instances.lock().unwrap()[0]["prompt"], "A cat, dancing!");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_is_upstream_error() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(ScriptedJobs::new(vec![JobStatus::Failed("quota".into())]));
        let err = tool(api, dir.path()).text_to_video("x").await.unwrap_err();
        assert!(err.is_adapter_failure());
        assert!(err.to_string().contains("quota"));
    }

    #[tokio::test]
    async fn test_reference_images_validation() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(ScriptedJobs::new(vec![JobStatus::Pending]));
        let tool = tool(api, dir.path());

        assert!(tool.reference_images_to_video(&[], "prompt").await.unwrap_err().is_client_error());
        let path = dir.path().join("a.png");
        assert!(tool
            .reference_images_to_video(&[path.as_path()], " ")
            .await
            .unwrap_err()
            .is_client_error());
    }

    #[tokio::test]
    async fn test_image_to_video_rejects_reference_mode() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(ScriptedJobs::new(vec![JobStatus::Pending]));
        let err = tool(api, dir.path())
            .image_to_video(Path::new("a.png"), None, "reference")
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_prompt_to_image_requires_image_client() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(ScriptedJobs::new(vec![JobStatus::Pending]));
        let err = tool(api, dir.path()).prompt_to_image_to_video("sunset").await.unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
    }

    #[test]
    fn test_parse_operation() {
        assert_eq!(parse_operation(&json!({ "name": "op", "done": false })), JobStatus::Pending);
        assert_eq!(
            parse_operation(&json!({
                "done": true,
                "response": { "generateVideoResponse": { "generatedSamples": [
                    { "video": { "uri": "https://files/v1" } }
                ] } }
            })),
            JobStatus::Done {
                video_uri: "https://files/v1".into()
            }
        );
        assert_eq!(
            parse_operation(&json!({ "done": true, "error": { "message": "blocked" } })),
            JobStatus::Failed("blocked".into())
        );
    }
}
