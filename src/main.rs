use anyhow::Result;
use dotenvy::dotenv;
use std::path::Path;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio::time::sleep;

use compass::cli::{Cli, Commands};
use compass::conversation::{ConversationEngine, EngineSettings};
use compass::core::{config, init_logger, log_startup_configuration, web_server, StartupReport};
use compass::i18n;
use compass::knowledge::load_knowledge;
use compass::llm::{GeminiGenerator, ResponseClient};
use compass::sheets::Spreadsheet;
use compass::storage::UserStore;
use compass::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the selected subcommand; without one
/// the bot runs.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { port }) => run_bot(port.unwrap_or(*config::WEB_PORT)).await,
        Some(Commands::CheckTexts) => check_texts(),
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot(*config::WEB_PORT).await
        }
    }
}

/// Validates the translation table; fails when any message is missing.
fn check_texts() -> Result<()> {
    match i18n::validate_texts() {
        Ok(()) => {
            log::info!("✅ All {} texts present", i18n::table_size());
            Ok(())
        }
        Err(missing) => {
            for item in &missing {
                log::error!("❌ Missing text {} for {}", item.key.id(), item.language.code());
            }
            anyhow::bail!("{} texts missing", missing.len())
        }
    }
}

async fn run_bot(web_port: u16) -> Result<()> {
    log::info!("================================================");
    log::info!("🧭 Starting QAIYRYM Compass v{}", env!("CARGO_PKG_VERSION"));
    log::info!("================================================");

    if config::GEMINI_API_KEY.is_empty() {
        anyhow::bail!("GEMINI_API_KEY is not set");
    }
    if let Err(missing) = i18n::validate_texts() {
        for item in &missing {
            log::warn!("Missing text {} for {}", item.key.id(), item.language.code());
        }
    }

    let bot = create_bot()?;

    let store = Arc::new(UserStore::load(config::USERS_DB_PATH.as_str()).await);
    log::info!("👥 User store: {} records from {}", store.len().await, store.path().display());

    let knowledge = load_knowledge(Path::new(config::KNOWLEDGE_PATH.as_str()));
    log_startup_configuration(&StartupReport::from_config(
        knowledge.as_ref().map(|k| k.chars().count()),
    ));

    let generator = GeminiGenerator::new(config::GEMINI_API_KEY.as_str())?;
    let engine = Arc::new(ConversationEngine::new(
        Arc::clone(&store),
        ResponseClient::new(Arc::new(generator)),
        Spreadsheet::from_config(),
        knowledge,
        EngineSettings::from_config(),
    ));

    let web_store = Arc::clone(&store);
    tokio::spawn(async move {
        if let Err(e) = web_server::start_web_server(web_port, web_store).await {
            log::error!("Web server stopped: {}", e);
        }
    });

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }
    if let Err(e) = bot.delete_webhook().drop_pending_updates(true).await {
        log::warn!("Failed to delete webhook: {}", e);
    }

    let handler = schema(HandlerDeps::new(engine, *config::admin::ADMIN_ID));

    log::info!("📡 Ready to receive updates!");

    // Run the dispatcher; restart it after a panic
    let mut retry_count = 0;
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        let handle = tokio::spawn(async move {
            Dispatcher::builder(bot_clone, handler_clone)
                .enable_ctrlc_handler()
                .build()
                .dispatch()
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Dispatcher panicked: {}", join_err);
                if retry_count >= config::retry::MAX_DISPATCHER_RETRIES {
                    log::error!("Max retries reached after panic. Exiting...");
                    break;
                }
                retry_count += 1;
                log::info!(
                    "Restarting dispatcher (attempt {}/{})...",
                    retry_count,
                    config::retry::MAX_DISPATCHER_RETRIES
                );
                sleep(config::retry::backoff(retry_count)).await;
            }
            Err(join_err) => {
                log::warn!("Dispatcher task was cancelled: {}", join_err);
                break;
            }
        }

        sleep(config::retry::dispatcher_delay()).await;
    }

    Ok(())
}
