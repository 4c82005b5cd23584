//! FCM push channel — server-key HTTP send.

use async_trait::async_trait;
use serde::Deserialize;

use dersbell_core::config::PushChannelConfig;
use dersbell_core::error::{DersBellError, Result};
use dersbell_core::traits::ChannelSender;
use dersbell_core::types::{ChannelKind, NotificationRequest};

const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

/// FCM push sender.
pub struct PushSender {
    config: PushChannelConfig,
    client: reqwest::Client,
}

impl PushSender {
    pub fn new(config: PushChannelConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn payload(token: &str, request: &NotificationRequest) -> serde_json::Value {
        serde_json::json!({
            "to": token,
            "notification": {
                "title": request.title,
                "body": request.body,
            },
            "data": request.data,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    #[serde(default)]
    success: u32,
    #[serde(default)]
    failure: u32,
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

#[async_trait]
impl ChannelSender for PushSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    async fn deliver(&self, address: &str, request: &NotificationRequest) -> Result<()> {
        let response = self
            .client
            .post(FCM_SEND_URL)
            .header("Authorization", format!("key={}", self.config.server_key))
            .json(&Self::payload(address, request))
            .send()
            .await
            .map_err(|e| DersBellError::channel(format!("FCM request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DersBellError::channel(format!("FCM error {status}: {body}")));
        }

        let result: FcmResponse = response
            .json()
            .await
            .map_err(|e| DersBellError::channel(format!("Invalid FCM response: {e}")))?;

        // A 200 with failure > 0 means the token itself was rejected
        // (unregistered, mismatched sender).
        if result.failure > 0 {
            let detail = result
                .results
                .first()
                .map(|r| r.to_string())
                .unwrap_or_default();
            return Err(DersBellError::channel(format!(
                "FCM rejected the token: {detail}"
            )));
        }

        tracing::debug!("📲 Push notification sent ({} ok)", result.success);
        Ok(())
    }
}
