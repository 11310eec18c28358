//! Test doubles for the external collaborators
//!
//! - `MockGenerator`: scripted generative backend with per-model results, delay and call log
//! - `RecordingAppender`: spreadsheet appender that keeps rows in memory
//! - `RecordingDeliver`: broadcast sink that fails for selected chats

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use compass::llm::{GenerationError, GenerationRequest, TextGenerator};
use compass::sheets::{RegistrationRow, RowAppender};
use compass::telegram::broadcast::Deliver;
use compass::{AppError, AppResult};

pub struct MockGenerator {
    default: Result<String, GenerationError>,
    per_model: HashMap<String, Result<String, GenerationError>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, GenerationRequest)>>,
}

impl MockGenerator {
    pub fn replying(text: &str) -> Self {
        Self::with_result(Ok(text.to_string()))
    }

    pub fn failing(error: GenerationError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(default: Result<String, GenerationError>) -> Self {
        Self {
            default,
            per_model: HashMap::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_model_result(mut self, model: &str, result: Result<String, GenerationError>) -> Self {
        self.per_model.insert(model.to_string(), result);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn models(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push((model.to_string(), request.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.per_model.get(model).cloned().unwrap_or_else(|| self.default.clone())
    }
}

#[derive(Default)]
pub struct RecordingAppender {
    rows: Mutex<Vec<RegistrationRow>>,
    fail: bool,
}

impl RecordingAppender {
    pub fn failing() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn rows(&self) -> Vec<RegistrationRow> {
        self.rows.lock().unwrap().clone()
    }

    /// Waits until at least `count` rows were attempted, or gives up after a second.
    pub async fn wait_for_rows(&self, count: usize) -> Vec<RegistrationRow> {
        for _ in 0..100 {
            if self.rows.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.rows()
    }
}

#[async_trait]
impl RowAppender for RecordingAppender {
    async fn append(&self, row: &RegistrationRow) -> AppResult<()> {
        self.rows.lock().unwrap().push(row.clone());
        if self.fail {
            return Err(AppError::Storage("sheet unavailable".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDeliver {
    sent: Mutex<Vec<(i64, String)>>,
    failing_chats: HashSet<i64>,
}

impl RecordingDeliver {
    pub fn failing_for(chats: &[i64]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing_chats: chats.iter().copied().collect(),
        }
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Deliver for RecordingDeliver {
    async fn deliver(&self, chat_id: i64, text: &str) -> AppResult<()> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        if self.failing_chats.contains(&chat_id) {
            return Err(AppError::Validation(format!("chat {} blocked the bot", chat_id)));
        }
        Ok(())
    }
}
