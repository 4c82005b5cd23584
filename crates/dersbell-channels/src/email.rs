//! SMTP email channel — async lettre sending over STARTTLS.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use dersbell_core::config::EmailChannelConfig;
use dersbell_core::error::{DersBellError, Result};
use dersbell_core::traits::ChannelSender;
use dersbell_core::types::{ChannelKind, NotificationRequest};

/// SMTP email sender. The transport is built once at startup and reused for
/// every send.
pub struct EmailSender {
    config: EmailChannelConfig,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailSender {
    pub fn new(config: EmailChannelConfig) -> Result<Self> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| DersBellError::channel(format!("SMTP relay: {e}")))?
            .port(config.smtp_port)
            .credentials(creds)
            .build();
        Ok(Self { config, mailer })
    }

    /// The styled HTML card the original web client renders the digest in.
    fn html_body(request: &NotificationRequest) -> String {
        format!(
            concat!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">"#,
                r#"<h2 style="color: #1a56db;">{title}</h2>"#,
                r#"<div style="white-space: pre-line; margin-top: 20px; padding: 15px; background-color: #f0f4ff; border-radius: 5px;">{body}</div>"#,
                r#"<p style="margin-top: 20px; font-size: 12px; color: #6b7280;">"#,
                "Bu, universitet dərs cədvəli bildiriş sistemi tərəfindən avtomatik göndərilən məlumatdır.",
                "</p></div>"
            ),
            title = escape_html(&request.title),
            body = escape_html(&request.body).replace('\n', "<br>"),
        )
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn deliver(&self, address: &str, request: &NotificationRequest) -> Result<()> {
        let from_name = self.config.from_name.as_deref().unwrap_or("Dərs Cədvəli");
        let from: Mailbox = format!("{from_name} <{}>", self.config.username)
            .parse()
            .map_err(|e| DersBellError::channel(format!("Invalid from address: {e}")))?;
        let to: Mailbox = address
            .parse()
            .map_err(|e| DersBellError::channel(format!("Invalid to address: {e}")))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(request.title.clone())
            .multipart(MultiPart::alternative_plain_html(
                request.body.clone(),
                Self::html_body(request),
            ))
            .map_err(|e| DersBellError::channel(format!("Build email: {e}")))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| DersBellError::channel(format!("SMTP send: {e}")))?;

        tracing::debug!("📤 Email sent to {address}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_body_escapes_and_breaks_lines() {
        let request = NotificationRequest::new("Cədvəl <yeni>", "1. 09:00 - Riyaziyyat\n2. 10:00 - Fizika");
        let html = EmailSender::html_body(&request);
        assert!(html.contains("Cədvəl &lt;yeni&gt;"));
        assert!(html.contains("1. 09:00 - Riyaziyyat<br>2. 10:00 - Fizika"));
        assert!(html.contains("avtomatik göndərilən"));
    }
}
