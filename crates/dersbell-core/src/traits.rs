//! Collaborator contracts consumed by the dispatch engine and the scheduler
//! driver. Everything is injected at startup — no ambient singletons.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChannelKind, Day, DaySchedule, NotificationRequest, Recipient, WeekParity};

/// One side-effecting delivery primitive (push, email, chat). Implementations
/// wrap an external provider and surface success or failure only — never
/// partial state, never an uncaught panic.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Which channel this sender covers.
    fn kind(&self) -> ChannelKind;

    /// The recipient's address on this channel, if configured.
    fn address_of(&self, recipient: &Recipient) -> Option<String> {
        recipient.address_for(self.kind()).map(str::to_string)
    }

    /// Deliver one notification to one address.
    async fn deliver(&self, address: &str, request: &NotificationRequest) -> Result<()>;
}

/// The current set of notifiable recipients, read fresh on every trigger.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn list_recipients(&self, filter: Option<ChannelKind>) -> Result<Vec<Recipient>>;
}

/// Write side of recipient registration — the Telegram `/start` flow.
#[async_trait]
pub trait SubscriberRegistry: Send + Sync {
    async fn register_telegram(
        &self,
        chat_id: &str,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<Recipient>;
}

/// Keyed timetable lookup.
#[async_trait]
pub trait LessonStore: Send + Sync {
    async fn find_schedule(&self, parity: WeekParity, day: Day) -> Result<Option<DaySchedule>>;
}
