//! policy-client: HTTP boundary to the external decision policy
//!
//! Provides:
//! - Configuration loading (tiller.toml)
//! - An OpenAI-compatible chat-completions client with retry
//! - Prompt rendering and tolerant decision parsing, implementing the
//!   core's `Oracle` trait

pub mod client;
pub mod config;

pub use client::PolicyClient;
pub use config::{ClientConfig, RetryConfig};
