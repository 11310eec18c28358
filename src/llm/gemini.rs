//! Generative Language API client (`models/{model}:generateContent`).

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{GenerationError, GenerationRequest, TextGenerator};
use crate::core::config;
use crate::core::utils::preview;
use crate::core::AppResult;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// REST generator for Gemini models.
#[derive(Clone)]
pub struct GeminiGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(api_key, config::gemini::API_BASE_URL)
    }

    /// Points the client at another endpoint (used by tests).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> AppResult<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

/// Maps an unsuccessful HTTP response to a classified error.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> GenerationError {
    if body.contains("API_KEY_INVALID")
        || body.contains("API key not valid")
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return GenerationError::InvalidCredentials(format!("HTTP {}", status.as_u16()));
    }
    if status == StatusCode::NOT_FOUND || body.to_uppercase().contains("NOT_FOUND") {
        return GenerationError::NotFound(preview(body, 200));
    }
    GenerationError::Other(format!("HTTP {}: {}", status.as_u16(), preview(body, 200)))
}

fn classify_transport(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Other(err.to_string())
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &request.prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_output_tokens,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let raw = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            log::debug!("[GEMINI] {} returned {}", model, status);
            return Err(classify_status(status, &raw));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&raw).map_err(|e| GenerationError::Other(format!("bad response: {}", e)))?;
        let text = parsed.text().trim().to_string();
        if text.is_empty() {
            return Err(GenerationError::Other("empty completion".to_string()));
        }
        Ok(text)
    }
}
