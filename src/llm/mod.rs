//! Generative text backend.
//!
//! - `TextGenerator`: one request/response completion against a named model
//! - `GeminiGenerator`: REST implementation for the Generative Language API
//! - `ResponseClient`: timeout + single fallback-model retry around any generator

pub mod client;
pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use client::ResponseClient;
pub use gemini::GeminiGenerator;

/// A completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instruction: String,
    pub max_output_tokens: u32,
}

/// Classified backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation timed out")]
    Timeout,

    #[error("invalid API credentials: {0}")]
    InvalidCredentials(String),

    #[error("model not found: {0}")]
    NotFound(String),

    #[error("generation failed: {0}")]
    Other(String),
}

/// Backend able to complete a prompt with a given model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<String, GenerationError>;
}
