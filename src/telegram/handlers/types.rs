//! Handler types, dependencies, and reply delivery

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{Message, ParseMode};

use crate::conversation::{ConversationEngine, Reply};
use crate::telegram::keyboards;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub engine: Arc<ConversationEngine>,
    pub admin_id: Option<i64>,
}

impl HandlerDeps {
    pub fn new(engine: Arc<ConversationEngine>, admin_id: Option<i64>) -> Self {
        Self { engine, admin_id }
    }
}

/// Sender of an inbound update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user_id: i64,
    pub username: Option<String>,
}

impl Sender {
    /// Extracts the sender of a message; falls back to the chat id for anonymous posts.
    pub fn from_message(msg: &Message) -> Self {
        Self {
            user_id: msg
                .from
                .as_ref()
                .and_then(|u| i64::try_from(u.id.0).ok())
                .unwrap_or(msg.chat.id.0),
            username: msg.from.as_ref().and_then(|u| u.username.clone()),
        }
    }
}

/// Sends replies in order as HTML. A failed send is logged and the rest still go out.
pub async fn send_replies(bot: &Bot, chat_id: ChatId, replies: Vec<Reply>) {
    for reply in replies {
        let request = bot.send_message(chat_id, reply.text).parse_mode(ParseMode::Html);
        let result = match reply.keyboard.as_ref() {
            Some(keyboard) => request.reply_markup(keyboards::to_markup(keyboard)).await,
            None => request.await,
        };
        if let Err(e) = result {
            log::error!("Failed to send reply to {}: {}", chat_id, e);
        }
    }
}
