//! Best-effort export of registrations to a Google spreadsheet.
//!
//! Appends run on their own task; their outcome is only logged and never reaches
//! the registration flow.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde_json::json;

use crate::core::config;
use crate::core::{AppError, AppResult};

/// One exported registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRow {
    pub user_id: String,
    pub name: String,
    pub age: u32,
    pub skill: String,
    pub language: String,
    pub username: String,
    pub registered_at: String,
}

impl RegistrationRow {
    /// Cell values in column order.
    pub fn cells(&self) -> serde_json::Value {
        json!([
            self.user_id,
            self.name,
            self.age,
            self.skill,
            self.language,
            self.username,
            self.registered_at,
        ])
    }
}

/// Destination able to append a row.
#[async_trait]
pub trait RowAppender: Send + Sync {
    async fn append(&self, row: &RegistrationRow) -> AppResult<()>;
}

/// Source of OAuth bearer tokens for the Sheets API.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> AppResult<String>;
}

/// Service-account key; `gcp_auth` mints tokens and refreshes them before they
/// expire.
pub struct ServiceAccountTokens {
    account: CustomServiceAccount,
}

impl ServiceAccountTokens {
    pub fn from_file(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Config(format!(
                "credentials file {} not found",
                path.display()
            )));
        }
        let account = CustomServiceAccount::from_file(path)?;
        Ok(Self { account })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> AppResult<String> {
        let token = self.account.token(config::sheets::SCOPES).await?;
        Ok(token.as_str().to_string())
    }
}

/// A pre-issued token, sent as is.
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> AppResult<String> {
        Ok(self.0.clone())
    }
}

/// Sheets v4 `values:append` client.
pub struct GoogleSheetsAppender {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl GoogleSheetsAppender {
    pub fn new(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder().timeout(config::network::timeout()).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            tokens,
        })
    }

    /// Builds the appender from configuration.
    pub fn from_config() -> Option<Self> {
        Self::from_settings(
            config::sheets::SHEET_ID.clone(),
            config::sheets::SHEET_NAME.as_str(),
            Path::new(config::sheets::CREDENTIALS_PATH.as_str()),
        )
    }

    /// `None`, with a warning, when the sheet id is unset or the service-account
    /// key is missing or unreadable.
    pub fn from_settings(sheet_id: Option<String>, sheet_name: &str, credentials: &Path) -> Option<Self> {
        let Some(sheet_id) = sheet_id else {
            log::warn!("[SHEETS] GOOGLE_SHEET_ID is not set, export disabled");
            return None;
        };
        let tokens = match ServiceAccountTokens::from_file(credentials) {
            Ok(tokens) => tokens,
            Err(e) => {
                log::warn!("[SHEETS] Export disabled: {}", e);
                return None;
            }
        };
        match Self::new(config::sheets::API_BASE_URL, sheet_id, sheet_name, Arc::new(tokens)) {
            Ok(appender) => Some(appender),
            Err(e) => {
                log::error!("[SHEETS] Failed to build HTTP client: {}", e);
                None
            }
        }
    }

    fn append_url(&self) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.base_url,
            self.spreadsheet_id,
            urlencoding::encode(&self.sheet_name)
        )
    }
}

#[async_trait]
impl RowAppender for GoogleSheetsAppender {
    async fn append(&self, row: &RegistrationRow) -> AppResult<()> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(self.append_url())
            .bearer_auth(token)
            .json(&json!({ "values": [row.cells()] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::HttpStatus { status, body });
        }
        Ok(())
    }
}

/// Fire-and-forget front for an optional appender.
#[derive(Clone, Default)]
pub struct Spreadsheet {
    appender: Option<Arc<dyn RowAppender>>,
}

impl Spreadsheet {
    pub fn new(appender: Arc<dyn RowAppender>) -> Self {
        Self {
            appender: Some(appender),
        }
    }

    /// A sink that drops every row.
    pub fn disabled() -> Self {
        Self { appender: None }
    }

    pub fn from_config() -> Self {
        match GoogleSheetsAppender::from_config() {
            Some(appender) => Self::new(Arc::new(appender)),
            None => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.appender.is_some()
    }

    /// Schedules the append on a separate task and returns immediately.
    pub fn submit(&self, row: RegistrationRow) {
        let Some(appender) = self.appender.clone() else {
            log::debug!("[SHEETS] Disabled, skipping row for {}", row.user_id);
            return;
        };

        tokio::spawn(async move {
            match appender.append(&row).await {
                Ok(()) => log::info!("[SHEETS] Volunteer {} appended", row.user_id),
                Err(e) => log::error!("[SHEETS] Append for {} failed: {}", row.user_id, e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> RegistrationRow {
        RegistrationRow {
            user_id: "1".to_string(),
            name: "Дана".to_string(),
            age: 22,
            skill: "дизайн".to_string(),
            language: "ru".to_string(),
            username: "dana".to_string(),
            registered_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_cells_order() {
        let cells = row().cells();
        assert_eq!(cells[0], "1");
        assert_eq!(cells[2], 22);
        assert_eq!(cells[5], "dana");
    }

    #[test]
    fn test_append_url_encodes_sheet_name() {
        let tokens = Arc::new(StaticToken("token".to_string()));
        let appender = GoogleSheetsAppender::new("http://sheets.local/", "abc", "Волонтёры 2", tokens).unwrap();
        let url = appender.append_url();
        assert!(url.starts_with("http://sheets.local/spreadsheets/abc/values/"));
        assert!(url.contains("%D0%92"));
        assert!(!url.contains(' '));
        assert!(url.ends_with("valueInputOption=RAW&insertDataOption=INSERT_ROWS"));
    }

    #[test]
    fn test_export_needs_sheet_id_and_key_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("qaiyrym-credentials.json");

        assert!(GoogleSheetsAppender::from_settings(None, "Волонтёры", &missing).is_none());
        assert!(GoogleSheetsAppender::from_settings(Some("sheet".to_string()), "Волонтёры", &missing).is_none());

        std::fs::write(&missing, "{\"type\": \"service_account\"}").unwrap();
        assert!(GoogleSheetsAppender::from_settings(Some("sheet".to_string()), "Волонтёры", &missing).is_none());
    }

    #[test]
    fn test_missing_key_file_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ServiceAccountTokens::from_file(&dir.path().join("absent.json")).err();
        assert!(matches!(err, Some(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_disabled_submit_is_noop() {
        let sheet = Spreadsheet::disabled();
        assert!(!sheet.is_enabled());
        sheet.submit(row());
    }
}
