//! # DersBell Scheduler
//!
//! Trigger evaluation and multi-channel fan-out dispatch — the part of the
//! system with actual timing subtlety (poll-granularity windowing, weekend
//! and week-parity exclusion, partial-failure accounting).
//!
//! ## Architecture
//! ```text
//! SchedulerDriver (two cron triggers, fixed civil offset)
//!   ├── digest   "0 20 * * *"  → window::digest_request (tomorrow)
//!   ├── reminder "*/5 * * * *" → window::reminder_requests (today)
//!   └── due requests → Dispatcher (join_all fan-out, per-send timeout)
//!                        ├── push   (FCM)
//!                        ├── email  (SMTP)
//!                        └── telegram (Bot API)
//! ```
//!
//! The evaluator is stateless; reminder de-duplication lives in the driver's
//! `NotifiedCache`, and each trigger carries a skip-if-busy guard so two
//! firings of the same trigger never overlap.

pub mod cron;
pub mod dispatch;
pub mod engine;
pub mod window;

pub use dispatch::Dispatcher;
pub use engine::{NotifiedCache, SchedulerDriver};
pub use window::DueLesson;
