#![deny(unused)]
//! HTTP gateway for the AI agent server.
//!
//! This crate provides:
//! - The Axum router exposing every adapter
//! - Shared application state built once at startup
//! - Mapping from adapter errors to HTTP responses

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use server::GatewayServer;
pub use state::AppState;
