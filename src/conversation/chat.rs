//! One chat-mode turn: filter, remember, generate, remember the answer.

use super::prompt::{build_system_instruction, format_history};
use super::session::{Session, Turn};
use crate::core::utils::preview;
use crate::i18n::TextKey;
use crate::llm::{GenerationError, GenerationRequest, ResponseClient};
use crate::storage::Role;

/// Short acknowledgements that never reach the model.
pub const NOISE_TOKENS: &[&str] = &[
    "ок", "да", "нет", "привет", "привет!", "ха", "оке", "хорошо", "спасибо", "пока", "ok", "yes", "no", "иә", "жоқ",
    "сәлем", "рахмет",
];

/// Case-insensitive match against [`NOISE_TOKENS`], ignoring surrounding whitespace.
pub fn is_noise(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    NOISE_TOKENS.contains(&lowered.as_str())
}

/// Result of a chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank or noise input; nothing recorded, nothing sent.
    Skipped,
    /// Raw model answer, already appended to the history.
    Replied(String),
    /// The user turn stays in the history; the assistant turn is absent.
    Failed(GenerationError),
}

/// Text shown to the user for a failed generation.
pub fn failure_text(error: &GenerationError) -> TextKey {
    match error {
        GenerationError::Timeout => TextKey::ChatTimeout,
        GenerationError::InvalidCredentials(_) => TextKey::ChatApiError,
        GenerationError::NotFound(_) | GenerationError::Other(_) => TextKey::ChatFailed,
    }
}

/// Inputs of a chat turn that do not live in the session.
pub struct ChatContext<'a> {
    pub responder: &'a ResponseClient,
    pub role: Role,
    pub knowledge: Option<&'a str>,
    pub max_output_tokens: u32,
}

pub async fn run_turn(session: &mut Session, ctx: &ChatContext<'_>, utterance: &str) -> TurnOutcome {
    let utterance = utterance.trim();
    if utterance.is_empty() {
        return TurnOutcome::Skipped;
    }
    if is_noise(utterance) {
        log::info!("[CHAT] Noise skipped: {}", utterance);
        return TurnOutcome::Skipped;
    }

    session.history.push(Turn::user(utterance));
    log::info!(
        "[CHAT] {} -> {} (history: {})",
        ctx.role.as_str(),
        preview(utterance, 50),
        session.history.len()
    );

    let request = GenerationRequest {
        prompt: format_history(&session.history),
        system_instruction: build_system_instruction(
            session.language(),
            ctx.role,
            session.history.len(),
            ctx.knowledge,
        ),
        max_output_tokens: ctx.max_output_tokens,
    };

    let outcome = match ctx.responder.complete(&request).await {
        Ok(answer) => {
            session.history.push(Turn::assistant(answer.clone()));
            TurnOutcome::Replied(answer)
        }
        Err(e) => {
            log::error!("[CHAT ERROR] {}", e);
            TurnOutcome::Failed(e)
        }
    };
    session.history.truncate_to_limit();
    outcome
}
