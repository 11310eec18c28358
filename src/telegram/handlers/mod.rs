//! Telegram bot handler tree configuration
//!
//! Handlers only translate updates into conversation events and replies back
//! into messages; all decisions live in the conversation engine.

mod schema;
mod types;

pub use schema::{pending_chat_action, schema};
pub use types::{send_replies, HandlerDeps, HandlerError, Sender};
