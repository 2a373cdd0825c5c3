#![deny(unused)]
//! Observability for the AI agent server.
//!
//! This crate provides:
//! - Log subscriber setup (text or JSON, optional OTLP export)
//! - Prometheus metrics helpers

pub mod metrics;
pub mod tracing_layer;

pub use self::metrics::{setup_metrics_recorder, track_request, track_tokens, track_tool_call};
pub use tracing_layer::configure_tracing;
