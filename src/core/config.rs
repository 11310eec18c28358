use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Reads an environment variable, treating blank values as absent.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Generative Language API key
/// Read from GEMINI_API_KEY, falling back to GOOGLE_API_KEY
pub static GEMINI_API_KEY: Lazy<String> = Lazy::new(|| {
    non_empty_var("GEMINI_API_KEY")
        .or_else(|| non_empty_var("GOOGLE_API_KEY"))
        .unwrap_or_default()
});

/// Mini App URL (profile page). Optional.
pub static WEBAPP_URL: Lazy<Option<String>> = Lazy::new(|| non_empty_var("WEBAPP_URL"));

/// Path of the JSON file holding user records
/// Default: users_db.json
pub static USERS_DB_PATH: Lazy<String> =
    Lazy::new(|| non_empty_var("USERS_DB_PATH").unwrap_or_else(|| "users_db.json".to_string()));

/// Path of the project knowledge excerpt injected into chat prompts
/// Default: knowledge.txt
pub static KNOWLEDGE_PATH: Lazy<String> =
    Lazy::new(|| non_empty_var("KNOWLEDGE_PATH").unwrap_or_else(|| "knowledge.txt".to_string()));

/// Log file path
/// Default: compass.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| non_empty_var("LOG_FILE_PATH").unwrap_or_else(|| "compass.log".to_string()));

/// Directory served under /static (mini-app pages)
/// Default: static
pub static STATIC_DIR: Lazy<String> =
    Lazy::new(|| non_empty_var("STATIC_DIR").unwrap_or_else(|| "static".to_string()));

/// Port of the HTTP status server
/// Default: 8000
pub static WEB_PORT: Lazy<u16> = Lazy::new(|| {
    non_empty_var("WEB_PORT")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(8000)
});

/// Whether users must accept the data agreement before they may register.
/// Read from CONSENT_REQUIRED (1/true/yes/on). Default: off
pub static CONSENT_REQUIRED: Lazy<bool> =
    Lazy::new(|| non_empty_var("CONSENT_REQUIRED").map(|raw| parse_flag(&raw)).unwrap_or(false));

pub mod admin {
    use once_cell::sync::Lazy;

    /// The only user allowed to run /broadcast
    /// Read from ADMIN_ID. Unset or unparsable disables admin commands
    pub static ADMIN_ID: Lazy<Option<i64>> =
        Lazy::new(|| super::non_empty_var("ADMIN_ID").and_then(|raw| raw.parse().ok()));
}

/// Generative backend configuration
pub mod gemini {
    use super::Duration;

    pub const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

    pub const MODEL: &str = "gemini-2.5-flash";

    /// Used once when the primary model is reported as not found
    pub const FALLBACK_MODEL: &str = "gemini-2.0-flash";

    pub const MAX_OUTPUT_TOKENS: u32 = 512;

    /// Hard wall-clock limit for one generation call (in seconds)
    pub const TIMEOUT_SECS: u64 = 45;

    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }
}

/// Chat mode configuration
pub mod chat {
    /// Maximum number of retained turns (10 exchanges)
    pub const HISTORY_LIMIT: usize = 20;
}

/// Registration configuration
pub mod registration {
    pub const MIN_AGE: u32 = 18;
}

/// Spreadsheet side channel
pub mod sheets {
    use once_cell::sync::Lazy;

    pub const API_BASE_URL: &str = "https://sheets.googleapis.com/v4";

    pub static SHEET_ID: Lazy<Option<String>> = Lazy::new(|| super::non_empty_var("GOOGLE_SHEET_ID"));

    /// Worksheet (tab) receiving registration rows
    pub static SHEET_NAME: Lazy<String> =
        Lazy::new(|| super::non_empty_var("GOOGLE_SHEET_NAME").unwrap_or_else(|| "Волонтёры".to_string()));

    /// OAuth scope requested for the service account
    pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

    /// Service-account key file
    /// Read from GOOGLE_CREDENTIALS_PATH. Default: qaiyrym-credentials.json
    pub static CREDENTIALS_PATH: Lazy<String> = Lazy::new(|| {
        super::non_empty_var("GOOGLE_CREDENTIALS_PATH").unwrap_or_else(|| "qaiyrym-credentials.json".to_string())
    });
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Telegram and spreadsheet HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Dispatcher restart policy
pub mod retry {
    use super::Duration;

    /// Maximum number of retries for dispatcher reconnection
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Delay between dispatcher retry attempts (in seconds)
    pub const DISPATCHER_RETRY_DELAY_SECS: u64 = 5;

    /// Base for exponential backoff calculation (seconds)
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(DISPATCHER_RETRY_DELAY_SECS)
    }

    /// Backoff before restart attempt `attempt` (1-based)
    pub fn backoff(attempt: u32) -> Duration {
        Duration::from_secs(EXPONENTIAL_BACKOFF_BASE.saturating_pow(attempt))
    }
}
