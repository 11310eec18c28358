use std::collections::VecDeque;

use crate::core::config;
use crate::i18n::Language;
use crate::storage::Role;

/// Position of a conversation in the onboarding/menu flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    ChooseLanguage,
    Consent,
    GuestMenu,
    MemberMenu,
    AboutSubmenu,
    RegistrationName,
    RegistrationAge,
    RegistrationSkill,
    ChatMode,
}

impl Stage {
    /// Main menu stage for a role.
    pub fn menu_for(role: Role) -> Stage {
        match role {
            Role::Member => Stage::MemberMenu,
            Role::Guest => Stage::GuestMenu,
        }
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

/// One utterance in the chat history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Chat history capped at `limit` turns between chat turns.
///
/// `push` never evicts, so the transcript sent with a request holds every
/// retained turn plus the new one; `truncate_to_limit` restores the cap once the
/// turn is over, dropping the oldest turns first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistory {
    turns: VecDeque<Turn>,
    limit: usize,
}

impl ChatHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(limit + 1),
            limit,
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
    }

    /// Evicts from the front until the cap holds.
    pub fn truncate_to_limit(&mut self) {
        while self.turns.len() > self.limit {
            self.turns.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Turns, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.back()
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(config::chat::HISTORY_LIMIT)
    }
}

/// Registration fields collected so far.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingRegistration {
    pub name: String,
    pub age: Option<u32>,
}

/// In-memory state of one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub stage: Stage,
    pub language: Option<Language>,
    pub pending: Option<PendingRegistration>,
    pub history: ChatHistory,
}

impl Session {
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            history: ChatHistory::new(limit),
            ..Self::default()
        }
    }

    /// Selected language, or the default one.
    pub fn language(&self) -> Language {
        self.language.unwrap_or_default()
    }

    /// Drops everything and returns to language selection.
    pub fn reset(&mut self) {
        *self = Self::with_history_limit(self.history.limit());
    }
}
