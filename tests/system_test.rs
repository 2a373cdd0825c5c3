use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

use ai_agent_core::config::StorageConfig;
use ai_agent_core::mocks::{MockLlm, ScriptedSearchBackend};
use ai_agent_core::types::{SearchEngine, SearchResult};
use ai_agent_core::AppConfig;
use ai_agent_gateway::{AppState, GatewayServer};
use ai_agent_skills::web_search::RetryPolicy;
use ai_agent_skills::WebSearchTool;

// =============================================================================
// Helpers
// =============================================================================

fn config_in(dir: &std::path::Path) -> AppConfig {
    let path = |name: &str| dir.join(name).display().to_string();
    let mut config = AppConfig::default();
    config.storage = StorageConfig {
        upload_dir: path("uploads"),
        charts_dir: path("charts"),
        output_dir: path("output"),
        slides_dir: path("slides"),
    };
    config
}

async fn start_test_server(
    dir: &std::path::Path,
    llm: Arc<MockLlm>,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let search = WebSearchTool::new(SearchEngine::DuckDuckGo, RetryPolicy::default()).with_backend(
        Arc::new(ScriptedSearchBackend::always(vec![SearchResult::new(
            "Tokio",
            "https://tokio.rs",
            "An asynchronous runtime for Rust",
        )])),
    );
    let state = AppState::new(config_in(dir), llm, Arc::new(search)).await?;
    state.store.ensure_dirs().await?;
    let app = GatewayServer::new(state).build_router();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Ok((addr, handle))
}

// =============================================================================
// System Tests
// =============================================================================

#[tokio::test]
async fn test_system_agent_drives_csv_tools() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let llm = Arc::new(MockLlm::new(vec![
        "Loading it now. [LOAD_CSV: sales.csv]".into(),
        "Here is the chart: [CREATE_CHART: type=line, x=month, y=sales, title=Sales]".into(),
    ]));
    let (addr, _handle) = start_test_server(dir.path(), llm.clone()).await?;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"month,sales\n1,10\n2,20\n3,15\n".to_vec())
            .file_name("sales.csv"),
    );
    let resp = client
        .post(format!("http://{}/upload-csv", addr))
        .multipart(form)
        .send()
        .await?;
    assert_eq!(resp.status(), 200);

    let first: Value = client
        .post(format!("http://{}/agent/chat", addr))
        .json(&json!({ "message": "load my sales file", "session_id": "s1" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(first["tools_used"], json!(["csv_load"]));
    assert!(!first["response"].as_str().unwrap().contains("[LOAD_CSV"));

    let second: Value = client
        .post(format!("http://{}/agent/chat", addr))
        .json(&json!({ "message": "plot it", "session_id": "s1" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(second["tools_used"], json!(["create_chart"]));
    assert!(second["response"].as_str().unwrap().contains("Chart created:"));

    // The second prompt carries the first turn as context.
    assert!(llm.prompts()[1].contains("User: load my sales file"));

    let charts: Value = client
        .get(format!("http://{}/charts", addr))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(charts["charts"].as_array().unwrap().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_system_serves_generated_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (addr, _handle) = start_test_server(dir.path(), Arc::new(MockLlm::constant("hi"))).await?;
    std::fs::write(dir.path().join("output").join("tts_1.mp3"), b"ID3 fake audio")?;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{}/output/tts_1.mp3", addr))
        .send()
        .await?;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await?.as_ref(), b"ID3 fake audio");

    let missing = client
        .get(format!("http://{}/slides/none.pptx", addr))
        .send()
        .await?;
    assert_eq!(missing.status(), 404);

    Ok(())
}
