//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A startup report of which optional integrations are active

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger is already installed
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Optional integrations as seen at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    pub spreadsheet: bool,
    pub mini_app: bool,
    pub knowledge_chars: Option<usize>,
    pub consent_required: bool,
    pub admin_configured: bool,
}

impl StartupReport {
    /// Collects the report from process configuration.
    pub fn from_config(knowledge_chars: Option<usize>) -> Self {
        Self {
            spreadsheet: config::sheets::SHEET_ID.is_some()
                && std::path::Path::new(config::sheets::CREDENTIALS_PATH.as_str()).exists(),
            mini_app: config::WEBAPP_URL.is_some(),
            knowledge_chars,
            consent_required: *config::CONSENT_REQUIRED,
            admin_configured: config::admin::ADMIN_ID.is_some(),
        }
    }

    /// Lines written to the log, one per integration.
    pub fn lines(&self) -> Vec<String> {
        let on_off = |enabled: bool| if enabled { "✅" } else { "⚠️ " };
        vec![
            format!("{} Spreadsheet append: {}", on_off(self.spreadsheet), enabled_word(self.spreadsheet)),
            format!("{} Mini App URL: {}", on_off(self.mini_app), enabled_word(self.mini_app)),
            match self.knowledge_chars {
                Some(chars) => format!("✅ Knowledge excerpt: {} chars", chars),
                None => "⚠️  Knowledge excerpt: not found".to_string(),
            },
            format!("ℹ️  Consent step: {}", enabled_word(self.consent_required)),
            format!("{} Admin broadcast: {}", on_off(self.admin_configured), enabled_word(self.admin_configured)),
        ]
    }
}

fn enabled_word(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// Logs the startup configuration report
pub fn log_startup_configuration(report: &StartupReport) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🧭 Compass configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for line in report.lines() {
        log::info!("{}", line);
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
