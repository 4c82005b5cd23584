//! # DersBell Core
//!
//! Shared foundation for the DersBell timetable notifier: the data model
//! (timetable cells, recipients, notifications, dispatch reports), the
//! configuration system, the academic calendar resolver, and the
//! collaborator contracts every other crate plugs into.

pub mod calendar;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::DersBellConfig;
pub use error::{DersBellError, Result};
