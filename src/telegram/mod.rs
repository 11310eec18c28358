//! Telegram bot integration and handlers

pub mod bot;
pub mod broadcast;
pub mod handlers;
pub mod keyboards;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{pending_chat_action, schema, HandlerDeps, HandlerError};
