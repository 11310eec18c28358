//! Conversation core
//!
//! - `session`: per-user stage, selected language, pending registration, chat history
//! - `action`: typed inline-button callback data
//! - `prompt`: system instruction and transcript rendering
//! - `chat`: the chat-mode turn loop
//! - `engine`: session registry and the onboarding/menu state machine
//! - `reply`: outgoing messages and keyboards

pub mod action;
pub mod chat;
pub mod engine;
pub mod prompt;
pub mod reply;
pub mod session;

pub use action::{AboutTopic, Action, MenuItem};
pub use engine::{ConversationEngine, EngineSettings, Event, Inbound};
pub use reply::{Keyboard, Reply};
pub use session::{ChatHistory, Session, Speaker, Stage, Turn};
