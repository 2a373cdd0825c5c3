//! Axum-based HTTP server for the gateway.

use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Request},
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use ai_agent_core::{config::ServerConfig, Error, Result};
use ai_agent_governance::track_request;

use crate::handlers::{chat, data, language, local_llm, media, tools};
use crate::state::AppState;

/// Gateway server.
pub struct GatewayServer {
    config: ServerConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
}

impl GatewayServer {
    pub fn new(state: AppState) -> Self {
        Self {
            config: state.config.server.clone(),
            state: Arc::new(state),
            metrics_handle: None,
        }
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let store = &self.state.store;

        let mut router = Router::new()
            .route("/", get(crate::handlers::root))
            .route("/health", get(crate::handlers::health))
            // Chat
            .route("/chat", post(chat::chat))
            .route("/smart-chat", post(chat::smart_chat))
            .route("/agent/chat", post(chat::agent_chat))
            .route("/agent/history/:session_id", delete(chat::clear_agent_history))
            // Search, math, CSV
            .route("/search", post(data::search))
            .route("/math", post(data::math))
            .route("/upload-csv", post(data::upload_csv))
            .route("/analyze-data", post(data::analyze_data))
            .route("/charts", get(data::list_charts))
            .route("/charts/:filename", get(data::get_chart))
            .route("/clear-data", delete(data::clear_data))
            // Language
            .route("/translate", post(language::translate))
            .route("/detect-language", post(language::detect_language))
            .route("/languages", get(language::languages))
            .route("/summarize", post(language::summarize))
            // Speech, vision, generation
            .route("/text-to-speech", post(media::text_to_speech))
            .route("/speech-to-text", post(media::speech_to_text))
            .route("/api/asr/transcribe", post(media::asr_transcribe))
            .route("/upload-image", post(media::upload_image))
            .route("/vision", post(media::vision))
            .route("/latex-ocr", post(media::latex_ocr))
            .route("/text-to-image", post(media::text_to_image))
            .route("/text-to-video", post(media::text_to_video))
            .route("/image-to-video", post(media::image_to_video))
            .route("/reference-images-to-video", post(media::reference_images_to_video))
            .route("/prompt-to-image-to-video", post(media::prompt_to_image_to_video))
            .route("/create-slides", post(media::create_slides))
            // Model playground
            .route("/local-llm", post(local_llm::local_llm))
            .route("/local-llm/slides", post(local_llm::create_topic_slides))
            // Tool registry
            .route("/tools", get(tools::list_tools))
            .route("/tools/:name", post(tools::execute_tool))
            .nest_service("/output", ServeDir::new(&store.output_dir))
            .nest_service("/slides", ServeDir::new(&store.slides_dir))
            .with_state(self.state.clone());

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        router
            .layer(middleware::from_fn(track_metrics))
            .layer(DefaultBodyLimit::max(self.config.max_upload_bytes))
            .layer(self.cors_layer())
            .layer(TraceLayer::new_for_http())
    }

    fn cors_layer(&self) -> CorsLayer {
        let origins = &self.config.allowed_origins;
        let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()))
        };
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(Any)
            .allow_headers(Any)
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::gateway(format!("Failed to bind: {}", e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::gateway(format!("Server error: {}", e)))?;

        Ok(())
    }
}

/// Record count and latency per matched route.
async fn track_metrics(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let response = next.run(req).await;
    track_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
