//! Admin `/broadcast <text>` fan-out to every member.

use async_trait::async_trait;
use teloxide::prelude::*;

use crate::core::AppResult;
use crate::i18n::{t, Language, TextKey};
use crate::storage::UserStore;

const COMMAND: &str = "/broadcast";

/// Returns the (trimmed, possibly empty) body when `text` is a `/broadcast`
/// command, including the `/broadcast@bot_name` form.
pub fn broadcast_body(text: &str) -> Option<&str> {
    let rest = text.trim_start().strip_prefix(COMMAND)?;
    let rest = match rest.strip_prefix('@') {
        Some(mention) => mention.split_once(char::is_whitespace).map_or("", |(_, body)| body),
        None if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest,
        None => return None,
    };
    Some(rest.trim())
}

/// Something that can deliver a plain text message to a chat.
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, chat_id: i64, text: &str) -> AppResult<()>;
}

#[async_trait]
impl Deliver for Bot {
    async fn deliver(&self, chat_id: i64, text: &str) -> AppResult<()> {
        self.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    Denied,
    MissingText,
    NoMembers,
    Done(BroadcastReport),
}

/// Sends `text` to each recipient in order. Failures are counted, never retried.
pub async fn deliver_broadcast(deliver: &dyn Deliver, recipients: &[i64], text: &str) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    for &chat_id in recipients {
        match deliver.deliver(chat_id, text).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                log::error!("[BROADCAST ERROR] {}: {}", chat_id, e);
            }
        }
    }
    report
}

/// Runs the whole command for `sender`; `admin_id` is the only allowed sender.
pub async fn run_broadcast(
    deliver: &dyn Deliver,
    store: &UserStore,
    admin_id: Option<i64>,
    sender: i64,
    message_text: &str,
) -> BroadcastOutcome {
    if admin_id != Some(sender) {
        log::warn!("[BROADCAST] Rejected for non-admin {}", sender);
        return BroadcastOutcome::Denied;
    }

    let body = broadcast_body(message_text).unwrap_or_default();
    if body.is_empty() {
        return BroadcastOutcome::MissingText;
    }

    let members = store.member_ids().await;
    if members.is_empty() {
        return BroadcastOutcome::NoMembers;
    }

    log::info!("[BROADCAST] Admin {} sends to {} members", sender, members.len());
    let report = deliver_broadcast(deliver, &members, body).await;
    log::info!("[BROADCAST] Done: {} ok, {} failed", report.delivered, report.failed);
    BroadcastOutcome::Done(report)
}

/// Reply shown to the sender.
pub fn outcome_text(language: Language, outcome: BroadcastOutcome) -> String {
    match outcome {
        BroadcastOutcome::Denied => t(language, TextKey::BroadcastDenied),
        BroadcastOutcome::MissingText => t(language, TextKey::BroadcastUsage),
        BroadcastOutcome::NoMembers => t(language, TextKey::BroadcastNoMembers),
        BroadcastOutcome::Done(report) => format!(
            "{}\n\n{}: {}\n{}: {}",
            t(language, TextKey::BroadcastDone),
            t(language, TextKey::BroadcastOk),
            report.delivered,
            t(language, TextKey::BroadcastFailed),
            report.failed
        ),
    }
}
