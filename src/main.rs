#![deny(unused)]
//! AI agent server.
//!
//! One HTTP service in front of web search, Wolfram|Alpha, CSV analysis,
//! translation, speech, vision, and media generation adapters.

use std::sync::Arc;
use std::time::Duration;

use ai_agent_core::AppConfig;
use ai_agent_gateway::{AppState, GatewayServer};
use ai_agent_skills::{http::build_client, WebSearchTool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load()?;
    ai_agent_governance::configure_tracing(&config.logging)?;

    tracing::info!("Starting AI Agent server v{}", env!("CARGO_PKG_VERSION"));
    config.validate()?;

    // =========================================================================
    // Services
    // =========================================================================
    let llm = ai_agent_model_gateway::create_llm_client(&config.llm);
    tracing::info!(provider = %config.llm.provider, model = %llm.model_name(), "LLM client ready");

    let http = build_client(Duration::from_secs(config.http.timeout_secs));
    let search = Arc::new(WebSearchTool::from_config(&config.search, http));
    tracing::info!(default_engine = %config.search.default_engine, "Web search ready");

    let state = AppState::new(config.clone(), llm, search).await?;
    state.store.ensure_dirs().await?;

    // =========================================================================
    // Gateway
    // =========================================================================
    let mut server = GatewayServer::new(state);
    if config.logging.enable_metrics {
        let handle = ai_agent_governance::setup_metrics_recorder()?;
        server = server.with_metrics(handle);
    }

    println!();
    println!("AI Agent API v{}", env!("CARGO_PKG_VERSION"));
    println!("  Server:  http://{}:{}", config.server.host, config.server.port);
    println!("  Health:  GET  /health");
    println!("  Chat:    POST /chat, /smart-chat, /agent/chat");
    println!("  Tools:   GET  /tools");
    println!();

    server.run().await?;
    Ok(())
}
