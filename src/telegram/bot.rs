//! Bot instance creation and command registration

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Команды:")]
pub enum Command {
    #[command(description = "начать сначала и выбрать язык")]
    Start,
}

/// Creates a Bot with the configured token and HTTP timeout.
///
/// # Errors
/// Fails when the token is missing or the HTTP client cannot be built.
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN is not set");
    }
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::with_client(config::BOT_TOKEN.as_str(), client))
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![BotCommand::new("start", "начать сначала и выбрать язык")])
        .await?;
    Ok(())
}
