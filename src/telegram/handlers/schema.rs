//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{ChatAction, Message};

use super::types::{send_replies, HandlerDeps, HandlerError, Sender};
use crate::conversation::{ConversationEngine, Event, Inbound};
use crate::i18n::Language;
use crate::telegram::bot::Command;
use crate::telegram::broadcast::{broadcast_body, outcome_text, run_broadcast};

/// Creates the dispatcher schema for the bot.
///
/// Branch order matters: `/broadcast` is matched before commands, commands before
/// free text.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_broadcast = deps.clone();
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(broadcast_handler(deps_broadcast))
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callback))
}

/// Handler for the /broadcast admin command (not in Command enum)
fn broadcast_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().and_then(broadcast_body).is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let sender = Sender::from_message(&msg);
                let text = msg.text().unwrap_or_default();
                let store = deps.engine.store();

                let outcome = run_broadcast(&bot, store, deps.admin_id, sender.user_id, text).await;
                let language = store
                    .get(sender.user_id)
                    .await
                    .map(|record| record.language)
                    .unwrap_or(Language::DEFAULT);

                if let Err(e) = bot
                    .send_message(msg.chat.id, outcome_text(language, outcome))
                    .parse_mode(teloxide::types::ParseMode::Html)
                    .await
                {
                    log::error!("/broadcast reply failed for user {}: {}", sender.user_id, e);
                }
                Ok(())
            }
        })
}

/// Handler for bot commands (/start)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);
                let sender = Sender::from_message(&msg);
                match cmd {
                    Command::Start => {
                        let inbound = Inbound::new(sender.user_id, Event::Start).with_username(sender.username);
                        let replies = deps.engine.handle(inbound).await;
                        send_replies(&bot, msg.chat.id, replies).await;
                    }
                }
                Ok(())
            }
        },
    ))
}

/// Handler for free text
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let sender = Sender::from_message(&msg);
                let text = msg.text().unwrap_or_default().to_string();

                if let Some(action) = pending_chat_action(&deps.engine, sender.user_id).await {
                    if let Err(e) = bot.send_chat_action(msg.chat.id, action).await {
                        log::debug!("Typing action failed for {}: {}", msg.chat.id, e);
                    }
                }

                let inbound = Inbound::new(sender.user_id, Event::Text(text)).with_username(sender.username);
                let replies = deps.engine.handle(inbound).await;
                send_replies(&bot, msg.chat.id, replies).await;
                Ok(())
            }
        })
}

/// Chat action to show while a text from `user_id` is being answered: typing
/// in chat mode, nothing elsewhere.
pub async fn pending_chat_action(engine: &ConversationEngine, user_id: i64) -> Option<ChatAction> {
    engine.is_chatting(user_id).await.then_some(ChatAction::Typing)
}

/// Handler for inline button presses. Every query is answered.
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                log::warn!("Failed to answer callback query: {}", e);
            }

            let Some(data) = q.data.clone() else {
                return Ok(());
            };
            let user_id = i64::try_from(q.from.id.0).unwrap_or_default();
            let chat_id = q.message.as_ref().map(|m| m.chat().id).unwrap_or(ChatId(user_id));

            let inbound = Inbound::new(user_id, Event::Button(data)).with_username(q.from.username.clone());
            let replies = deps.engine.handle(inbound).await;
            send_replies(&bot, chat_id, replies).await;
            Ok(())
        }
    })
}
