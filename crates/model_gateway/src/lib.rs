#![deny(unused)]
//! Model gateway for the AI agent server.
//!
//! This crate provides:
//! - Rig LLM client adapter (Gemini, OpenAI, Anthropic)
//! - Gemini REST client for grounded search and image output
//! - Provider construction from configuration

pub mod gemini;
pub mod providers;
pub mod rig_client;

pub use gemini::GeminiRestClient;
pub use providers::{create_llm_client, UnconfiguredLlmClient};
pub use rig_client::{RigConfig, RigLlmClient, RigProvider};
