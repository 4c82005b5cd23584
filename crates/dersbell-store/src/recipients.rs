//! File-based recipient directory.
//!
//! Recipients live in `recipients.json` and are re-read on every trigger
//! firing, so registrations made between two ticks are picked up without a
//! restart. A missing file is an empty directory; an unreadable or broken
//! file is an error — the tick aborts and the next firing retries.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use dersbell_core::error::{DersBellError, Result};
use dersbell_core::traits::{RecipientDirectory, SubscriberRegistry};
use dersbell_core::types::{ChannelKind, Recipient};

/// File-backed recipient store.
pub struct RecipientStore {
    file: PathBuf,
}

impl RecipientStore {
    /// Create a store rooted at the given directory.
    pub fn new(dir: &Path) -> Self {
        std::fs::create_dir_all(dir).ok();
        Self {
            file: dir.join("recipients.json"),
        }
    }

    /// Load all recipients.
    pub fn load(&self) -> Result<Vec<Recipient>> {
        if !self.file.exists() {
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&self.file)
            .map_err(|e| DersBellError::store(format!("read {}: {e}", self.file.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| DersBellError::store(format!("parse {}: {e}", self.file.display())))
    }

    fn save(&self, recipients: &[Recipient]) -> Result<()> {
        let json = serde_json::to_string_pretty(recipients)?;
        std::fs::write(&self.file, &json)
            .map_err(|e| DersBellError::store(format!("write {}: {e}", self.file.display())))?;
        tracing::debug!(
            "💾 Saved {} recipient(s) to {}",
            recipients.len(),
            self.file.display()
        );
        Ok(())
    }

    /// Register or refresh a push device token, keyed by email. An existing
    /// recipient gets the token updated in place.
    pub fn upsert_device_token(
        &self,
        email: &str,
        name: Option<&str>,
        token: &str,
    ) -> Result<Recipient> {
        let mut all = self.load()?;
        if let Some(existing) = all
            .iter_mut()
            .find(|r| r.email.as_deref() == Some(email))
        {
            existing.push_token = Some(token.to_string());
            if existing.name.is_none() {
                existing.name = name.map(str::to_string);
            }
            let updated = existing.clone();
            self.save(&all)?;
            tracing::info!("📲 Device token updated for {email}");
            return Ok(updated);
        }

        let recipient = Recipient {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.map(str::to_string),
            email: Some(email.to_string()),
            push_token: Some(token.to_string()),
            telegram_chat_id: None,
            telegram_username: None,
            created_at: Utc::now(),
        };
        all.push(recipient.clone());
        self.save(&all)?;
        tracing::info!("📲 New push recipient registered: {email}");
        Ok(recipient)
    }
}

#[async_trait]
impl RecipientDirectory for RecipientStore {
    async fn list_recipients(&self, filter: Option<ChannelKind>) -> Result<Vec<Recipient>> {
        let mut all = self.load()?;
        if let Some(kind) = filter {
            all.retain(|r| r.has_channel(kind));
        }
        Ok(all)
    }
}

#[async_trait]
impl SubscriberRegistry for RecipientStore {
    /// Register a Telegram subscriber. Re-registration of a known chat id is
    /// a no-op that returns the existing record.
    async fn register_telegram(
        &self,
        chat_id: &str,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<Recipient> {
        let mut all = self.load()?;
        if let Some(existing) = all
            .iter()
            .find(|r| r.telegram_chat_id.as_deref() == Some(chat_id))
        {
            tracing::debug!("Telegram chat {chat_id} already registered");
            return Ok(existing.clone());
        }

        let name = username
            .or(first_name)
            .unwrap_or("Telegram istifadəçisi")
            .to_string();
        let recipient = Recipient {
            id: uuid::Uuid::new_v4().to_string(),
            name: Some(name),
            email: None,
            push_token: None,
            telegram_chat_id: Some(chat_id.to_string()),
            telegram_username: username.map(str::to_string),
            created_at: Utc::now(),
        };
        all.push(recipient.clone());
        self.save(&all)?;
        tracing::info!("✅ Telegram subscriber registered: chat_id={chat_id}");
        Ok(recipient)
    }
}
