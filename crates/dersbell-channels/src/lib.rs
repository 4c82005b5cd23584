//! # DersBell Channels
//!
//! Delivery channel implementations. Each sender wraps one external
//! provider behind the uniform `ChannelSender` contract:
//! - FCM push (HTTP, server key)
//! - SMTP email (lettre, STARTTLS)
//! - Telegram Bot API (sendMessage + `/start` registration polling)

pub mod email;
pub mod push;
pub mod telegram;

pub use email::EmailSender;
pub use push::PushSender;
pub use telegram::TelegramSender;
