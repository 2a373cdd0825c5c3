//! Conversation agent.
//!
//! The LLM answers in prose and may embed bracketed tool commands such as
//! `[WOLFRAM: integrate x^2]`. Each command is executed through the tool
//! registry and replaced by the tool output before the reply is returned.

use dashmap::DashMap;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::ops::Range;
use std::sync::{Arc, OnceLock};

use ai_agent_core::{
    traits::{LlmClient, ToolRegistry},
    types::ConversationHistory,
    Error, Result,
};

pub const SYSTEM_PROMPT: &str = "You are a smart AI agent with several capabilities:

1. WEB SEARCH: search the internet with the command:
   [SEARCH: <search query>]

2. MATH: run complex calculations with Wolfram Alpha:
   [WOLFRAM: <calculation or math question>]

3. CSV DATA ANALYSIS: analyze CSV files and create charts:
   - [LOAD_CSV: <file path>] - load a CSV file
   - [CSV_INFO] - show column details
   - [CSV_ANALYZE: <column name>] - analyze one column
   - [CREATE_CHART: type=<kind>, x=<x column>, y=<y column>, title=<title>] - create a chart
     Chart kinds: bar, line, scatter, histogram, pie, box, heatmap

When the user asks for information or calculations, use the tools above.
Answer in a friendly and professional way.";

/// A tool command embedded in an LLM reply.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentCommand {
    Search(String),
    Wolfram(String),
    LoadCsv(String),
    CsvInfo,
    CsvAnalyze(String),
    CreateChart {
        kind: String,
        x: Option<String>,
        y: Option<String>,
        title: Option<String>,
    },
}

impl AgentCommand {
    /// Registry tool name and arguments for this command.
    pub fn tool_call(&self) -> (&'static str, Value) {
        match self {
            Self::Search(query) => ("web_search", json!({ "query": query })),
            Self::Wolfram(query) => ("wolfram_alpha", json!({ "query": query })),
            Self::LoadCsv(path) => ("csv_load", json!({ "path": path })),
            Self::CsvInfo => ("csv_info", json!({})),
            Self::CsvAnalyze(column) => ("csv_analyze", json!({ "column": column })),
            Self::CreateChart { kind, x, y, title } => (
                "create_chart",
                json!({ "chart_type": kind, "x_col": x, "y_col": y, "title": title }),
            ),
        }
    }
}

fn command_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(SEARCH|WOLFRAM|LOAD_CSV|CSV_ANALYZE|CREATE_CHART):([^\]]*)\]|\[CSV_INFO\]")
            .expect("static regex")
    })
}

/// Every command in `text`, with its byte range, in order of appearance.
pub fn parse_commands(text: &str) -> Vec<(Range<usize>, AgentCommand)> {
    command_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let command = match caps.get(1).map(|m| m.as_str()) {
                None => AgentCommand::CsvInfo,
                Some(kind) => {
                    let arg = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
                    match kind {
                        "SEARCH" => AgentCommand::Search(arg.to_string()),
                        "WOLFRAM" => AgentCommand::Wolfram(arg.to_string()),
                        "LOAD_CSV" => AgentCommand::LoadCsv(arg.to_string()),
                        "CSV_ANALYZE" => AgentCommand::CsvAnalyze(arg.to_string()),
                        _ => parse_chart_args(arg),
                    }
                }
            };
            Some((whole.range(), command))
        })
        .collect()
}

/// `type=bar, x=month, y=sales, title=Monthly sales`; `type` defaults to bar.
fn parse_chart_args(args: &str) -> AgentCommand {
    let mut kind = "bar".to_string();
    let (mut x, mut y, mut title) = (None, None, None);
    for pair in args.split(',') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "type" => kind = value,
            "x" => x = Some(value),
            "y" => y = Some(value),
            "title" => title = Some(value),
            _ => {}
        }
    }
    AgentCommand::CreateChart { kind, x, y, title }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReply {
    pub session_id: String,
    pub response: String,
    pub tools_used: Vec<String>,
}

pub struct ConversationAgent {
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolRegistry>,
    histories: DashMap<String, ConversationHistory>,
    window: usize,
}

impl ConversationAgent {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<dyn ToolRegistry>, window: usize) -> Self {
        Self {
            llm,
            tools,
            histories: DashMap::new(),
            window,
        }
    }

    pub async fn chat(&self, message: &str, session_id: Option<&str>) -> Result<AgentReply> {
        if message.trim().is_empty() {
            return Err(Error::invalid_request("Message must not be empty"));
        }
        let session_id = session_id
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let prompt = self.build_prompt(&session_id, message);
        let raw = self.llm.complete(&prompt).await?.content;
        let (response, tools_used) = self.execute_commands(&raw).await;

        self.histories
            .entry(session_id.clone())
            .or_default()
            .push(message, response.clone());

        tracing::info!(session = %session_id, tools = ?tools_used, "Agent turn completed");
        Ok(AgentReply {
            session_id,
            response,
            tools_used,
        })
    }

    fn build_prompt(&self, session_id: &str, message: &str) -> String {
        match self.histories.get(session_id) {
            Some(history) if !history.is_empty() => {
                format!("{}\n\nUser: {}", history.context_text(self.window), message)
            }
            _ => format!("{}\n\nUser: {}", SYSTEM_PROMPT, message),
        }
    }

    async fn execute_commands(&self, text: &str) -> (String, Vec<String>) {
        let commands = parse_commands(text);
        if commands.is_empty() {
            return (text.to_string(), Vec::new());
        }

        let mut out = String::with_capacity(text.len());
        let mut used = Vec::with_capacity(commands.len());
        let mut cursor = 0;
        for (range, command) in commands {
            out.push_str(&text[cursor..range.start]);
            cursor = range.end;

            let (tool, args) = command.tool_call();
            used.push(tool.to_string());
            let rendered = match self.tools.execute(tool, args).await {
                Ok(output) => output.content,
                Err(e) => format!("Error: {}", e),
            };
            match command {
                AgentCommand::Wolfram(_) => {
                    out.push_str(&format!("\n\nCalculation result:\n{}\n\n", rendered))
                }
                _ => out.push_str(&format!("\n\n{}\n\n", rendered)),
            }
        }
        out.push_str(&text[cursor..]);
        (out, used)
    }

    /// Forget a session. Returns whether it existed.
    pub fn clear_history(&self, session_id: &str) -> bool {
        self.histories.remove(session_id).is_some()
    }

    pub fn history_len(&self, session_id: &str) -> usize {
        self.histories.get(session_id).map(|h| h.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DefaultToolRegistry;
    use ai_agent_core::mocks::MockLlm;
    use ai_agent_core::traits::Tool;
    use ai_agent_core::types::ToolOutput;
    use async_trait::async_trait;

    struct FakeWolfram;

    #[async_trait]
    impl Tool for FakeWolfram {
        fn name(&self) -> &str {
            "wolfram_alpha"
        }

        fn description(&self) -> &str {
            "fake"
        }

        fn parameters(&self) -> Value {
            json!({})
        }

        async fn execute(&self, args: Value) -> Result<ToolOutput> {
            let query = args["query"].as_str().unwrap_or_default();
            Ok(ToolOutput::text(format!("Result: {} = 4", query)))
        }
    }

    async fn registry() -> Arc<dyn ToolRegistry> {
        let registry = DefaultToolRegistry::new();
        registry.register(Arc::new(FakeWolfram)).await.unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_wolfram_command_is_replaced_by_tool_output() {
        let llm = Arc::new(MockLlm::constant("Let me compute. [WOLFRAM: 2+2] Done."));
        let agent = ConversationAgent::new(llm, registry().await, 3);

        let reply = agent.chat("what is 2+2?", Some("s1")).await.unwrap();

        assert!(!reply.response.contains("[WOLFRAM"));
        assert!(reply.response.contains("Calculation result:\nResult: 2+2 = 4"));
        assert!(reply.response.starts_with("Let me compute. "));
        assert!(reply.response.ends_with(" Done."));
        assert_eq!(reply.tools_used, vec!["wolfram_alpha"]);
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported_inline() {
        let llm = Arc::new(MockLlm::constant("[CSV_INFO]"));
        let agent = ConversationAgent::new(llm, registry().await, 3);
        let reply = agent.chat("show columns", None).await.unwrap();
        assert!(reply.response.contains("Error: Tool not found: csv_info"));
        assert!(!reply.session_id.is_empty());
    }

    #[tokio::test]
    async fn test_history_window_limits_context() {
        let llm = Arc::new(MockLlm::new((0..6).map(|i| format!("answer {}", i)).collect()));
        let agent = ConversationAgent::new(llm.clone(), registry().await, 3);

        for i in 0..5 {
            agent.chat(&format!("question {}", i), Some("s")).await.unwrap();
        }
        agent.chat("question 5", Some("s")).await.unwrap();

        let prompts = llm.prompts();
        assert!(prompts[0].starts_with(SYSTEM_PROMPT));
        assert!(!prompts[1].contains(SYSTEM_PROMPT));

        let last = &prompts[5];
        assert!(!last.contains("question 1\n"));
        assert!(last.contains("User: question 2\nAgent: answer 2"));
        assert!(last.contains("User: question 4\nAgent: answer 4"));
        assert!(last.ends_with("User: question 5"));
        assert_eq!(agent.history_len("s"), 6);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let agent = ConversationAgent::new(Arc::new(MockLlm::constant("hi")), registry().await, 3);
        agent.chat("hello", Some("s")).await.unwrap();
        assert!(agent.clear_history("s"));
        assert!(!agent.clear_history("s"));
        assert_eq!(agent.history_len("s"), 0);
    }

    #[test]
    fn test_parse_commands() {
        let text = "[SEARCH: rust news] then [CSV_INFO] and [CREATE_CHART: type=line, x=month, y=sales, title=Sales]";
        let commands: Vec<AgentCommand> = parse_commands(text).into_iter().map(|(_, c)| c).collect();
        assert_eq!(
            commands,
            vec![
                AgentCommand::Search("rust news".into()),
                AgentCommand::CsvInfo,
                AgentCommand::CreateChart {
                    kind: "line".into(),
                    x: Some("month".into()),
                    y: Some("sales".into()),
                    title: Some("Sales".into()),
                },
            ]
        );
        assert!(parse_commands("no tools here").is_empty());
    }
}
