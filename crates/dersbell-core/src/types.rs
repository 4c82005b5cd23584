//! Core data model — timetable cells, recipients, notifications, and
//! dispatch outcomes.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Academic week parity. The timetable alternates weekly between an odd
/// ("tək") and an even ("cüt") week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekParity {
    Odd,
    Even,
}

impl WeekParity {
    /// Azerbaijani label used in notification text.
    pub fn label(&self) -> &'static str {
        match self {
            WeekParity::Odd => "tək",
            WeekParity::Even => "cüt",
        }
    }
}

/// Day of the week as the timetable keys it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Day {
    pub fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Day::Mon,
            Weekday::Tue => Day::Tue,
            Weekday::Wed => Day::Wed,
            Weekday::Thu => Day::Thu,
            Weekday::Fri => Day::Fri,
            Weekday::Sat => Day::Sat,
            Weekday::Sun => Day::Sun,
        }
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self, Day::Sat | Day::Sun)
    }

    /// Azerbaijani day name shown in notification titles.
    pub fn label(&self) -> &'static str {
        match self {
            Day::Mon => "Bazar ertəsi",
            Day::Tue => "Çərşənbə axşamı",
            Day::Wed => "Çərşənbə",
            Day::Thu => "Cümə axşamı",
            Day::Fri => "Cümə",
            Day::Sat => "Şənbə",
            Day::Sun => "Bazar",
        }
    }
}

/// One slot in a day's timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonEntry {
    pub subject: String,
    /// "HH:MM-HH:MM", or empty when the slot carries no fixed time.
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub teacher: String,
}

/// The timetable for one (week parity, day) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub week_parity: WeekParity,
    pub day: Day,
    #[serde(default)]
    pub lessons: Vec<LessonEntry>,
}

/// A delivery channel a recipient may have configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Push,
    Email,
    Telegram,
}

impl ChannelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::Push => "push",
            ChannelKind::Email => "email",
            ChannelKind::Telegram => "telegram",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A registered notification recipient. Every address is optional; a
/// recipient with none of them is unreachable and filtered out before
/// dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub push_token: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
    #[serde(default)]
    pub telegram_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Recipient {
    /// The recipient's address on one channel, if configured. Empty strings
    /// count as absent.
    pub fn address_for(&self, kind: ChannelKind) -> Option<&str> {
        let address = match kind {
            ChannelKind::Push => self.push_token.as_deref(),
            ChannelKind::Email => self.email.as_deref(),
            ChannelKind::Telegram => self.telegram_chat_id.as_deref(),
        };
        address.filter(|a| !a.is_empty())
    }

    pub fn has_channel(&self, kind: ChannelKind) -> bool {
        self.address_for(kind).is_some()
    }

    pub fn has_any_channel(&self) -> bool {
        [ChannelKind::Push, ChannelKind::Email, ChannelKind::Telegram]
            .iter()
            .any(|kind| self.has_channel(*kind))
    }

    /// Display label for logs and reports.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.telegram_username.as_deref())
            .unwrap_or(&self.id)
    }

    /// Synthetic recipient wrapping the statically configured fallback chat
    /// used when the directory has no Telegram subscribers.
    pub fn telegram_fallback(chat_id: &str) -> Self {
        Self {
            id: "telegram-fallback".into(),
            name: Some("Telegram kanalı".into()),
            email: None,
            push_token: None,
            telegram_chat_id: Some(chat_id.to_string()),
            telegram_username: None,
            created_at: Utc::now(),
        }
    }
}

/// One logical notification, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl NotificationRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Result of one channel attempt for one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelOutcome {
    pub channel: ChannelKind,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChannelOutcome {
    pub fn ok(channel: ChannelKind) -> Self {
        Self {
            channel,
            success: true,
            error: None,
        }
    }

    pub fn failed(channel: ChannelKind, error: impl Into<String>) -> Self {
        Self {
            channel,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// All channel attempts for one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientOutcome {
    /// Display label of the recipient (name, username, or id).
    pub recipient: String,
    pub channels: Vec<ChannelOutcome>,
}

impl RecipientOutcome {
    /// True when every attempted channel settled successfully.
    pub fn succeeded(&self) -> bool {
        self.channels.iter().all(|c| c.success)
    }
}

/// Aggregate delivery report for one multicast round. A return value and log
/// artifact only — never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub recipients: Vec<RecipientOutcome>,
}

impl DispatchReport {
    pub fn empty() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            recipients: Vec::new(),
        }
    }

    pub fn from_outcomes(recipients: Vec<RecipientOutcome>) -> Self {
        let total = recipients.len();
        let succeeded = recipients.iter().filter(|r| r.succeeded()).count();
        Self {
            total,
            succeeded,
            failed: total - succeeded,
            recipients,
        }
    }
}
