//! Compass - the QAIYRYM volunteer assistant Telegram bot
//!
//! Onboards volunteers (language, optional consent, registration), serves the
//! project menus and relays free-form chat to a generative model with bounded
//! history.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, utilities, HTTP status server
//! - `conversation`: session state machine, chat turn loop, prompt builder
//! - `llm`: generative backend client
//! - `storage`: JSON-backed user record store
//! - `sheets`: best-effort spreadsheet export of registrations
//! - `telegram`: bot setup, keyboards and the dispatcher handler tree

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cli;
pub mod conversation;
pub mod core;
pub mod i18n;
pub mod knowledge;
pub mod llm;
pub mod sheets;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use conversation::{ConversationEngine, EngineSettings, Event, Inbound, Keyboard, Reply};
pub use crate::core::{config, AppError, AppResult};
pub use storage::{Role, UserRecord, UserStore};
