//! System instruction and transcript rendering for chat mode.

use super::session::{ChatHistory, Speaker};
use crate::i18n::Language;
use crate::storage::Role;

/// A greeting is allowed while the history holds at most this many turns.
pub const GREETING_HISTORY_LIMIT: usize = 2;

pub const GREETING_ALLOWED: &str = "⭐ ПЕРВОЕ СООБЩЕНИЕ: можно поздороваться, представиться Компасом и задать первый вопрос о том, что привело человека в проект.";
pub const GREETING_FORBIDDEN: &str = "⭐ ДИАЛОГ УЖЕ ИДЁТ: не здоровайся повторно, продолжай с того места, где остановились.";

const USER_LABEL: &str = "🧑 ПОЛЬЗОВАТЕЛЬ:";
const ASSISTANT_LABEL: &str = "🤖 КОМПАС:";

const PERSONA: &str = "Ты — Компас, ИИ-координатор волонтёрского проекта QAIYRYM.\n\n\
🎯 Веди разговор как интервью: после каждого ответа задай 1-2 уточняющих вопроса.\n\
Давай информацию порциями, не пересказывай всё сразу.\n\
Обычно отвечай в 3-4 предложениях, подробнее только по просьбе.\n\
Проявляй интерес к собеседнику и предлагай помощь.\n\n\
ОФОРМЛЕНИЕ:\n\
• Только лёгкий Markdown: *жирный*, _курсив_, `код`.\n\
• Никаких HTML-тегов.\n\
• Избегай длинных списков.";

const MEMBER_GUIDANCE: &str = "👤 Собеседник — участник проекта: обсуждай задачи и детали помощи подробно.";
const GUEST_GUIDANCE: &str = "👤 Собеседник — гость: будь дружелюбен и мягко предлагай присоединиться к проекту.";

/// Language name as used inside the instruction ("Отвечай на русском").
pub fn language_name(language: Language) -> &'static str {
    match language {
        Language::Ru => "русском",
        Language::Kz => "казахском",
    }
}

/// Builds the system instruction for one chat turn.
///
/// `history_len` is the history length including the utterance being answered.
/// The knowledge excerpt, when present, always comes last.
pub fn build_system_instruction(
    language: Language,
    role: Role,
    history_len: usize,
    knowledge: Option<&str>,
) -> String {
    let mut instruction = String::from(PERSONA);

    instruction.push_str(&format!(
        "\n\nОтвечай на {} ({}).",
        language_name(language),
        language.code()
    ));

    instruction.push_str("\n\n");
    if history_len <= GREETING_HISTORY_LIMIT {
        instruction.push_str(GREETING_ALLOWED);
    } else {
        instruction.push_str(GREETING_FORBIDDEN);
    }

    instruction.push_str("\n\n");
    instruction.push_str(match role {
        Role::Member => MEMBER_GUIDANCE,
        Role::Guest => GUEST_GUIDANCE,
    });

    if let Some(knowledge) = knowledge.filter(|k| !k.trim().is_empty()) {
        instruction.push_str("\n\n[CONTEXT_DATA]\n");
        instruction.push_str(knowledge);
        instruction.push_str("\n[END_CONTEXT_DATA]");
    }

    instruction
}

/// Renders the history as a labelled transcript, oldest turn first.
pub fn format_history(history: &ChatHistory) -> String {
    history
        .iter()
        .map(|turn| {
            let label = match turn.speaker {
                Speaker::User => USER_LABEL,
                Speaker::Assistant => ASSISTANT_LABEL,
            };
            format!("{} {}", label, turn.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
