//! Telegram Bot channel — notification sending plus `/start` registration
//! via long polling.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use dersbell_core::config::TelegramChannelConfig;
use dersbell_core::error::{DersBellError, Result};
use dersbell_core::traits::{ChannelSender, SubscriberRegistry};
use dersbell_core::types::{ChannelKind, NotificationRequest};

/// Telegram Bot API sender.
pub struct TelegramSender {
    config: TelegramChannelConfig,
    client: reqwest::Client,
}

impl TelegramSender {
    pub fn new(config: TelegramChannelConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{}",
            self.config.bot_token, method
        )
    }

    pub fn poll_interval_secs(&self) -> u64 {
        self.config.poll_interval_secs
    }

    /// Send a Markdown message to one chat. API-level rejections (rate
    /// limits, blocked bot) surface as channel errors, never panics.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| DersBellError::channel(format!("sendMessage failed: {e}")))?;

        let result: TelegramApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| DersBellError::channel(format!("Invalid Telegram response: {e}")))?;

        if !result.ok {
            return Err(DersBellError::channel(format!(
                "Telegram API error: {}",
                result.description.unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Fetch updates after `offset` using long polling.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>> {
        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", "30".into()),
                ("allowed_updates", "[\"message\"]".into()),
            ])
            .send()
            .await
            .map_err(|e| DersBellError::channel(format!("getUpdates failed: {e}")))?;

        let body: TelegramApiResponse<Vec<TelegramUpdate>> = response
            .json()
            .await
            .map_err(|e| DersBellError::channel(format!("Invalid Telegram response: {e}")))?;

        if !body.ok {
            return Err(DersBellError::channel(format!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            )));
        }
        Ok(body.result.unwrap_or_default())
    }
}

#[async_trait]
impl ChannelSender for TelegramSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn deliver(&self, address: &str, request: &NotificationRequest) -> Result<()> {
        self.send_message(address, &format_message(request)).await
    }
}

/// Format one notification as the Telegram message text.
pub fn format_message(request: &NotificationRequest) -> String {
    format!(
        "📢 *{}*\n\n{}",
        escape_markdown(&request.title),
        escape_markdown(&request.body)
    )
}

/// Escape Telegram MarkdownV1 special characters.
fn escape_markdown(s: &str) -> String {
    s.replace('_', "\\_")
        .replace('*', "\\*")
        .replace('[', "\\[")
        .replace('`', "\\`")
}

/// Long-poll the bot for `/start` commands and register subscribers into the
/// directory. Runs until the process exits; API errors back off and retry.
pub async fn run_registration_poller(
    sender: Arc<TelegramSender>,
    registry: Arc<dyn SubscriberRegistry>,
) {
    tracing::info!("🤖 Telegram registration poller started");
    let mut offset = 0i64;

    loop {
        match sender.get_updates(offset).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    handle_update(&sender, registry.as_ref(), &update).await;
                }
            }
            Err(e) => {
                tracing::error!("Telegram polling error: {e}");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            }
        }

        tokio::time::sleep(std::time::Duration::from_secs(
            sender.poll_interval_secs(),
        ))
        .await;
    }
}

async fn handle_update(
    sender: &TelegramSender,
    registry: &dyn SubscriberRegistry,
    update: &TelegramUpdate,
) {
    let Some(message) = update.message.as_ref() else {
        return;
    };
    let Some(text) = message.text.as_deref() else {
        return;
    };
    if !text.trim().starts_with("/start") {
        return;
    }
    if message.from.as_ref().is_some_and(|f| f.is_bot) {
        return;
    }

    let chat_id = message.chat.id.to_string();
    let username = message.from.as_ref().and_then(|f| f.username.as_deref());
    let first_name = message.from.as_ref().map(|f| f.first_name.as_str());

    match registry.register_telegram(&chat_id, username, first_name).await {
        Ok(_) => {
            if let Err(e) = sender
                .send_message(&chat_id, "Bildirişlərə uğurla abunə oldunuz!")
                .await
            {
                tracing::warn!("⚠️ Could not confirm subscription to {chat_id}: {e}");
            }
        }
        Err(e) => {
            tracing::error!("Telegram registration failed for {chat_id}: {e}");
            sender
                .send_message(
                    &chat_id,
                    "Bildirişlərə abunə olmaqda xəta baş verdi. Zəhmət olmasa, yenidən cəhd edin.",
                )
                .await
                .ok();
        }
    }
}

// --- Telegram API types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a_b*c"), "a\\_b\\*c");
        assert_eq!(escape_markdown("[link]`code`"), "\\[link]\\`code\\`");
    }

    #[test]
    fn test_format_message() {
        let request = NotificationRequest::new("Dərs Başlayır: Fizika", "09:00-09:45 otaq 204");
        let text = format_message(&request);
        assert!(text.starts_with("📢 *Dərs Başlayır: Fizika*\n\n"));
        assert!(text.ends_with("otaq 204"));
    }

    #[test]
    fn test_update_parses_start_command() {
        let json = serde_json::json!({
            "update_id": 99,
            "message": {
                "message_id": 1,
                "from": {"id": 7, "is_bot": false, "first_name": "Elvin", "username": "elvin"},
                "chat": {"id": 7},
                "text": "/start"
            }
        });
        let update: TelegramUpdate = serde_json::from_value(json).unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, 7);
        assert_eq!(message.text.as_deref(), Some("/start"));
        assert!(!message.from.unwrap().is_bot);
    }
}
