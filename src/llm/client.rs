use std::sync::Arc;
use std::time::Duration;

use super::{GenerationError, GenerationRequest, TextGenerator};
use crate::core::config;

/// Generative client with a hard per-call timeout and one fallback attempt.
///
/// At most two backend calls happen per request: the primary model, then the
/// fallback model only when the primary one is reported as not found.
#[derive(Clone)]
pub struct ResponseClient {
    backend: Arc<dyn TextGenerator>,
    model: String,
    fallback_model: Option<String>,
    timeout: Duration,
}

impl ResponseClient {
    /// Creates a client with the configured models and timeout.
    pub fn new(backend: Arc<dyn TextGenerator>) -> Self {
        Self {
            backend,
            model: config::gemini::MODEL.to_string(),
            fallback_model: Some(config::gemini::FALLBACK_MODEL.to_string()),
            timeout: config::gemini::timeout(),
        }
    }

    #[must_use]
    pub fn with_models(mut self, model: impl Into<String>, fallback_model: Option<String>) -> Self {
        self.model = model.into();
        self.fallback_model = fallback_model;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Completes the request, retrying once against the fallback model on not-found.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        match self.attempt(&self.model, request).await {
            Err(GenerationError::NotFound(detail)) => match &self.fallback_model {
                Some(fallback) => {
                    log::warn!("[GEMINI] {} not found ({}), falling back to {}", self.model, detail, fallback);
                    self.attempt(fallback, request).await
                }
                None => Err(GenerationError::NotFound(detail)),
            },
            other => other,
        }
    }

    async fn attempt(&self, model: &str, request: &GenerationRequest) -> Result<String, GenerationError> {
        match tokio::time::timeout(self.timeout, self.backend.generate(model, request)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("[GEMINI] {} timed out after {:?}", model, self.timeout);
                Err(GenerationError::Timeout)
            }
        }
    }
}
