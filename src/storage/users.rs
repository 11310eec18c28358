//! File-backed registry of user records.
//!
//! The whole table is loaded once at startup and rewritten on every mutation.
//! Mutations go through a single async mutex, so writes are serialized and the
//! in-memory map is only committed after the file write succeeded.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::{AppError, AppResult};
use crate::i18n::Language;

/// Access level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    Guest,
    Member,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Guest => "GUEST",
            Role::Member => "MEMBER",
        }
    }
}

/// Durable per-user record, one JSON object per user id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "lang", default)]
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    /// RFC 3339 timestamp of the completed registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<String>,
    /// Answer to the data agreement, when the consent step is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreed: Option<bool>,
}

impl UserRecord {
    fn guest(user_id: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Self::default()
        }
    }

    pub fn is_member(&self) -> bool {
        self.role == Role::Member
    }
}

/// A completed registration, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub user_id: i64,
    pub name: String,
    pub age: u32,
    pub skill: String,
    pub language: Language,
    pub registered_at: DateTime<Utc>,
}

type RecordMap = BTreeMap<String, UserRecord>;

/// Owned user registry backed by a JSON file.
pub struct UserStore {
    path: PathBuf,
    records: Mutex<RecordMap>,
}

impl UserStore {
    /// Loads the store from `path`.
    ///
    /// A missing file starts an empty store. An unreadable or corrupt file is
    /// logged and also starts empty; the next mutation overwrites it.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match fs_err::tokio::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<RecordMap>(&raw) {
                Ok(mut records) => {
                    for (id, record) in records.iter_mut() {
                        if record.user_id.is_empty() {
                            record.user_id = id.clone();
                        }
                    }
                    log::info!("[DB] Loaded {} users from {}", records.len(), path.display());
                    records
                }
                Err(e) => {
                    log::error!("[DB] Corrupt user file {}: {}", path.display(), e);
                    RecordMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("[DB] {} not found, starting with an empty store", path.display());
                RecordMap::new()
            }
            Err(e) => {
                log::error!("[DB] Failed to read {}: {}", path.display(), e);
                RecordMap::new()
            }
        };

        Self {
            path,
            records: Mutex::new(records),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, user_id: i64) -> Option<UserRecord> {
        self.records.lock().await.get(&user_id.to_string()).cloned()
    }

    /// Role of the user; unknown users are guests.
    pub async fn role(&self, user_id: i64) -> Role {
        self.get(user_id).await.map(|r| r.role).unwrap_or_default()
    }

    /// Consent answer recorded for the user, if any.
    pub async fn consent(&self, user_id: i64) -> Option<bool> {
        self.get(user_id).await.and_then(|r| r.agreed)
    }

    /// Records the language the user explicitly chose.
    pub async fn set_language(&self, user_id: i64, language: Language) -> AppResult<()> {
        self.mutate(user_id, |record| record.language = language).await.map(|_| ())
    }

    /// Records the answer to the data agreement.
    pub async fn set_consent(&self, user_id: i64, agreed: bool) -> AppResult<()> {
        self.mutate(user_id, |record| record.agreed = Some(agreed)).await.map(|_| ())
    }

    /// Stores a completed registration and promotes the user to member.
    pub async fn register(&self, registration: Registration) -> AppResult<UserRecord> {
        if registration.age < crate::core::config::registration::MIN_AGE {
            return Err(AppError::Validation(format!(
                "age {} is below the minimum of {}",
                registration.age,
                crate::core::config::registration::MIN_AGE
            )));
        }

        let Registration {
            user_id,
            name,
            age,
            skill,
            language,
            registered_at,
        } = registration;

        let record = self
            .mutate(user_id, move |record| {
                record.role = Role::Member;
                record.language = language;
                record.name = Some(name);
                record.age = Some(age);
                record.skill = Some(skill);
                record.registered_at = Some(registered_at.to_rfc3339());
            })
            .await?;

        log::info!("[DB] User {} registered as member", user_id);
        Ok(record)
    }

    /// Ids of every member, in ascending key order.
    pub async fn member_ids(&self) -> Vec<i64> {
        self.records
            .lock()
            .await
            .values()
            .filter(|record| record.is_member())
            .filter_map(|record| record.user_id.parse().ok())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Applies `change` to a copy of the table, rewrites the file and commits.
    async fn mutate<F>(&self, user_id: i64, change: F) -> AppResult<UserRecord>
    where
        F: FnOnce(&mut UserRecord),
    {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        let record = next
            .entry(user_id.to_string())
            .or_insert_with(|| UserRecord::guest(user_id));
        change(record);
        let updated = record.clone();

        write_table(&self.path, &next).await?;
        *records = next;
        Ok(updated)
    }
}

async fn write_table(path: &Path, records: &RecordMap) -> AppResult<()> {
    let json = serde_json::to_string_pretty(records)?;

    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs_err::tokio::write(&tmp, json.as_bytes())
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;
    fs_err::tokio::rename(&tmp, path)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;
    Ok(())
}
