//! Dispatch Engine — fans one logical notification out to every recipient
//! across every channel they have configured.
//!
//! Sends run concurrently (fan-out, join on completion of all); every
//! channel-level error settles into a recorded outcome and never crosses
//! back into the evaluator's control flow. Only a directory fetch failure
//! aborts a dispatch call — the periodic trigger retries naturally.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use dersbell_core::error::Result;
use dersbell_core::traits::{ChannelSender, RecipientDirectory};
use dersbell_core::types::{
    ChannelKind, ChannelOutcome, DispatchReport, NotificationRequest, Recipient, RecipientOutcome,
};

pub struct Dispatcher {
    senders: Vec<Arc<dyn ChannelSender>>,
    directory: Arc<dyn RecipientDirectory>,
    send_timeout: Duration,
    /// Static chat used by Telegram broadcasts when the directory has no
    /// Telegram subscribers at all.
    fallback_chat_id: Option<String>,
}

impl Dispatcher {
    pub fn new(
        senders: Vec<Arc<dyn ChannelSender>>,
        directory: Arc<dyn RecipientDirectory>,
        send_timeout: Duration,
        fallback_chat_id: Option<String>,
    ) -> Self {
        Self {
            senders,
            directory,
            send_timeout,
            fallback_chat_id,
        }
    }

    fn reachable(&self, recipient: &Recipient) -> bool {
        self.senders
            .iter()
            .any(|sender| sender.address_of(recipient).is_some())
    }

    /// Attempt every configured channel for one recipient. Channel absence
    /// is omission, not failure; every error settles into its outcome slot.
    pub async fn dispatch_one(
        &self,
        recipient: &Recipient,
        request: &NotificationRequest,
    ) -> RecipientOutcome {
        let attempts = self.senders.iter().filter_map(|sender| {
            let address = sender.address_of(recipient)?;
            Some(self.attempt(Arc::clone(sender), address, request))
        });
        let channels = join_all(attempts).await;
        RecipientOutcome {
            recipient: recipient.label().to_string(),
            channels,
        }
    }

    async fn attempt(
        &self,
        sender: Arc<dyn ChannelSender>,
        address: String,
        request: &NotificationRequest,
    ) -> ChannelOutcome {
        let kind = sender.kind();
        match tokio::time::timeout(self.send_timeout, sender.deliver(&address, request)).await {
            Ok(Ok(())) => ChannelOutcome::ok(kind),
            Ok(Err(e)) => {
                tracing::warn!("⚠️ {kind} send failed: {e}");
                ChannelOutcome::failed(kind, e.to_string())
            }
            Err(_) => {
                tracing::warn!(
                    "⚠️ {kind} send timed out after {}s",
                    self.send_timeout.as_secs()
                );
                ChannelOutcome::failed(
                    kind,
                    format!("timed out after {}s", self.send_timeout.as_secs()),
                )
            }
        }
    }

    /// Multicast to an explicit recipient list. Unreachable recipients are
    /// filtered out before counting `total`.
    pub async fn dispatch_multicast(
        &self,
        recipients: &[Recipient],
        request: &NotificationRequest,
    ) -> DispatchReport {
        let valid: Vec<&Recipient> = recipients
            .iter()
            .filter(|recipient| self.reachable(recipient))
            .collect();
        if valid.is_empty() {
            tracing::info!("No reachable recipients for '{}'", request.title);
            return DispatchReport::empty();
        }

        tracing::info!(
            "📨 Sending '{}' to {} recipient(s)",
            request.title,
            valid.len()
        );
        let outcomes = join_all(
            valid
                .into_iter()
                .map(|recipient| self.dispatch_one(recipient, request)),
        )
        .await;

        let report = DispatchReport::from_outcomes(outcomes);
        tracing::info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "📊 {}/{} notifications delivered",
            report.succeeded,
            report.total
        );
        report
    }

    /// Multicast to the whole directory. A directory failure aborts the
    /// call — no partial recipient set is assumed.
    pub async fn dispatch_to_all(&self, request: &NotificationRequest) -> Result<DispatchReport> {
        let recipients = self.directory.list_recipients(None).await?;
        Ok(self.dispatch_multicast(&recipients, request).await)
    }

    /// Multicast to the recipients possessing one channel. An empty filtered
    /// set yields an empty report; Telegram falls back to the configured
    /// static chat when nobody is registered.
    pub async fn broadcast_to_channel(
        &self,
        kind: ChannelKind,
        request: &NotificationRequest,
    ) -> Result<DispatchReport> {
        let recipients = self.directory.list_recipients(Some(kind)).await?;
        if recipients.is_empty() {
            if kind == ChannelKind::Telegram
                && let Some(chat_id) = &self.fallback_chat_id
            {
                tracing::info!("No Telegram subscribers — using the configured fallback chat");
                let fallback = Recipient::telegram_fallback(chat_id);
                return Ok(self.dispatch_multicast(&[fallback], request).await);
            }
            return Ok(DispatchReport::empty());
        }
        Ok(self.dispatch_multicast(&recipients, request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use dersbell_core::error::DersBellError;

    struct MockSender {
        kind: ChannelKind,
        fail: bool,
        delay: Option<Duration>,
    }

    impl MockSender {
        fn ok(kind: ChannelKind) -> Arc<dyn ChannelSender> {
            Arc::new(Self {
                kind,
                fail: false,
                delay: None,
            })
        }

        fn failing(kind: ChannelKind) -> Arc<dyn ChannelSender> {
            Arc::new(Self {
                kind,
                fail: true,
                delay: None,
            })
        }

        fn slow(kind: ChannelKind, delay: Duration) -> Arc<dyn ChannelSender> {
            Arc::new(Self {
                kind,
                fail: false,
                delay: Some(delay),
            })
        }
    }

    #[async_trait]
    impl ChannelSender for MockSender {
        fn kind(&self) -> ChannelKind {
            self.kind
        }

        async fn deliver(&self, _address: &str, _request: &NotificationRequest) -> Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                Err(DersBellError::channel("provider says no"))
            } else {
                Ok(())
            }
        }
    }

    struct MockDirectory {
        recipients: Vec<Recipient>,
        broken: bool,
    }

    #[async_trait]
    impl RecipientDirectory for MockDirectory {
        async fn list_recipients(&self, filter: Option<ChannelKind>) -> Result<Vec<Recipient>> {
            if self.broken {
                return Err(DersBellError::store("directory unreachable"));
            }
            let mut all = self.recipients.clone();
            if let Some(kind) = filter {
                all.retain(|r| r.has_channel(kind));
            }
            Ok(all)
        }
    }

    fn recipient(email: Option<&str>, token: Option<&str>, chat: Option<&str>) -> Recipient {
        Recipient {
            id: format!(
                "{}-{}-{}",
                email.unwrap_or("_"),
                token.unwrap_or("_"),
                chat.unwrap_or("_")
            ),
            name: None,
            email: email.map(String::from),
            push_token: token.map(String::from),
            telegram_chat_id: chat.map(String::from),
            telegram_username: None,
            created_at: Utc::now(),
        }
    }

    fn dispatcher(
        senders: Vec<Arc<dyn ChannelSender>>,
        recipients: Vec<Recipient>,
        fallback: Option<&str>,
    ) -> Dispatcher {
        Dispatcher::new(
            senders,
            Arc::new(MockDirectory {
                recipients,
                broken: false,
            }),
            Duration::from_millis(100),
            fallback.map(String::from),
        )
    }

    fn request() -> NotificationRequest {
        NotificationRequest::new("Dərs Başlayır: Math", "09:00-09:45")
    }

    #[tokio::test]
    async fn test_multicast_counts_and_per_recipient_detail() {
        let d = dispatcher(
            vec![
                MockSender::failing(ChannelKind::Email),
                MockSender::ok(ChannelKind::Push),
            ],
            vec![],
            None,
        );
        let recipients = vec![
            recipient(Some("a@x"), None, None),
            recipient(None, Some("t1"), None),
            recipient(None, None, None),
        ];

        let report = d.dispatch_multicast(&recipients, &request()).await;
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);

        let email_outcome = report
            .recipients
            .iter()
            .find(|r| !r.succeeded())
            .unwrap();
        assert_eq!(email_outcome.channels.len(), 1);
        assert_eq!(email_outcome.channels[0].channel, ChannelKind::Email);
        assert!(email_outcome.channels[0].error.as_deref().unwrap().contains("provider says no"));
    }

    #[tokio::test]
    async fn test_channel_failure_does_not_block_other_channels() {
        let d = dispatcher(
            vec![
                MockSender::failing(ChannelKind::Email),
                MockSender::ok(ChannelKind::Telegram),
            ],
            vec![],
            None,
        );
        let r = recipient(Some("a@x"), None, Some("42"));

        let outcome = d.dispatch_one(&r, &request()).await;
        assert_eq!(outcome.channels.len(), 2);
        assert!(outcome.channels.iter().any(|c| c.channel == ChannelKind::Telegram && c.success));
        assert!(outcome.channels.iter().any(|c| c.channel == ChannelKind::Email && !c.success));
        assert!(!outcome.succeeded());
    }

    #[tokio::test]
    async fn test_timeout_is_recorded_as_channel_failure() {
        let d = dispatcher(
            vec![MockSender::slow(
                ChannelKind::Push,
                Duration::from_millis(500),
            )],
            vec![],
            None,
        );
        let r = recipient(None, Some("t1"), None);

        let outcome = d.dispatch_one(&r, &request()).await;
        assert_eq!(outcome.channels.len(), 1);
        assert!(!outcome.channels[0].success);
        assert!(outcome.channels[0].error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_dispatch_to_all_fails_when_directory_is_down() {
        let d = Dispatcher::new(
            vec![MockSender::ok(ChannelKind::Email)],
            Arc::new(MockDirectory {
                recipients: vec![],
                broken: true,
            }),
            Duration::from_millis(100),
            None,
        );
        assert!(d.dispatch_to_all(&request()).await.is_err());
    }

    #[tokio::test]
    async fn test_broadcast_empty_channel_yields_empty_report() {
        let d = dispatcher(
            vec![MockSender::ok(ChannelKind::Email)],
            vec![recipient(Some("a@x"), None, None)],
            None,
        );
        let report = d
            .broadcast_to_channel(ChannelKind::Push, &request())
            .await
            .unwrap();
        assert_eq!(report, DispatchReport::empty());
    }

    #[tokio::test]
    async fn test_broadcast_telegram_falls_back_to_static_chat() {
        let d = dispatcher(
            vec![MockSender::ok(ChannelKind::Telegram)],
            vec![],
            Some("-100200300"),
        );
        let report = d
            .broadcast_to_channel(ChannelKind::Telegram, &request())
            .await
            .unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.succeeded, 1);
    }

    #[tokio::test]
    async fn test_broadcast_prefers_registered_subscribers() {
        let d = dispatcher(
            vec![MockSender::ok(ChannelKind::Telegram)],
            vec![
                recipient(None, None, Some("1")),
                recipient(None, None, Some("2")),
            ],
            Some("-100200300"),
        );
        let report = d
            .broadcast_to_channel(ChannelKind::Telegram, &request())
            .await
            .unwrap();
        assert_eq!(report.total, 2);
    }
}
