//! Restart marker and post-restart confirmation.
//!
//! Before a deliberate restart the operator message that requested it is
//! written to the marker file. The next startup edits that message once and
//! deletes the marker, whatever the outcome.

use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Local};
use reelgate_common::{ChatId, Error, MessageId, MessageRef, Result};
use serde::{Deserialize, Serialize};

use crate::pool::CredentialPool;

/// The operator message to edit after restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartMarker {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

impl RestartMarker {
    pub fn new(chat_id: ChatId, message_id: MessageId) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }

    pub fn message(&self) -> MessageRef {
        MessageRef::new(self.chat_id, self.message_id)
    }

    /// Write the marker as two lines: chat id, then message id.
    pub async fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, format!("{}\n{}\n", self.chat_id, self.message_id)).await?;
        tracing::info!(path = %path.display(), message = %self.message(), "Restart marker written");
        Ok(())
    }

    /// Read the marker, `None` when the file does not exist.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Self::parse(&text).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        let mut next = |field: &str| -> Result<i64> {
            let line = lines
                .next()
                .ok_or_else(|| Error::decode(format!("restart marker is missing {field}")))?;
            line.parse()
                .map_err(|_| Error::decode(format!("invalid {field} in restart marker: {line}")))
        };
        let chat_id = next("chat id")?;
        let message_id = next("message id")?;
        if lines.next().is_some() {
            return Err(Error::decode("restart marker has extra lines"));
        }
        Ok(Self::new(ChatId(chat_id), MessageId(message_id)))
    }
}

/// Values shown in the confirmation message.
#[derive(Debug, Clone, Default)]
pub struct RestartInfo {
    pub base_url: String,
    pub version: String,
    pub branch: String,
    /// `owner/name` or a full URL of the upstream repository.
    pub upstream_repo: Option<String>,
}

impl RestartInfo {
    fn repo_url(&self) -> Option<String> {
        let repo = self.upstream_repo.as_deref()?.trim_end_matches('/');
        let mut parts = repo.rsplit('/');
        let name = parts.next().filter(|s| !s.is_empty())?;
        let owner = parts.next().filter(|s| !s.is_empty())?;
        Some(format!(
            "https://github.com/{}/{}",
            owner,
            name.trim_end_matches(".git")
        ))
    }
}

/// HTML text the operator message is edited to.
pub fn confirmation_text(info: &RestartInfo, now: DateTime<Local>) -> String {
    let mut text = format!(
        "🎉 <b>Server Restarted Successfully!</b>\n\n\
         📅 <b>Date:</b> <code>{}</code>\n\
         ⏰ <b>Time:</b> <code>{}</code>\n\
         🌐 <b>Website:</b> {}\n\n\
         🛠 <b>Version:</b> <code>{}</code>\n\
         🌿 <b>Branch:</b> <code>{}</code>",
        now.format("%d/%m/%y"),
        now.format("%I:%M:%S %p"),
        info.base_url,
        info.version,
        info.branch,
    );
    if let Some(url) = info.repo_url() {
        text.push_str(&format!("\n📦 <b>Repo:</b> {url}"));
    }
    text
}

/// What startup recovery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    NoMarker,
    Edited(MessageRef),
    EditFailed(MessageRef),
    /// The marker could not be read or parsed.
    Invalid,
}

/// Confirm a pending restart, at most once.
///
/// Never fails: every error is logged and the marker is removed before
/// returning unless it was absent.
pub async fn recover(path: &Path, pool: &CredentialPool, info: &RestartInfo) -> RecoveryOutcome {
    let marker = match RestartMarker::load(path).await {
        Ok(None) => return RecoveryOutcome::NoMarker,
        Ok(Some(marker)) => marker,
        Err(e) => {
            tracing::error!(path = %path.display(), "Unreadable restart marker: {}", e);
            remove_marker(path).await;
            return RecoveryOutcome::Invalid;
        }
    };

    let message = marker.message();
    let outcome = match edit_confirmation(pool, message, info).await {
        Ok(()) => {
            tracing::info!(%message, "Restart confirmed to operator");
            RecoveryOutcome::Edited(message)
        }
        Err(e) => {
            tracing::error!(%message, "Failed to edit restart message: {}", e);
            RecoveryOutcome::EditFailed(message)
        }
    };

    remove_marker(path).await;
    outcome
}

async fn edit_confirmation(
    pool: &CredentialPool,
    message: MessageRef,
    info: &RestartInfo,
) -> Result<()> {
    let lease = pool.acquire()?;
    let text = confirmation_text(info, Local::now());
    lease.client().edit_message_text(message, &text).await
}

async fn remove_marker(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            tracing::error!(path = %path.display(), "Failed to remove restart marker: {}", e);
        }
    }
}
