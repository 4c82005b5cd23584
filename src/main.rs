//! # DersBell — university timetable notification daemon.
//!
//! Polls the weekly timetable and notifies every registered recipient over
//! FCM push, SMTP email, and Telegram:
//! - a nightly digest of tomorrow's lessons
//! - a reminder ~15 minutes before each lesson starts
//!
//! Usage:
//!   dersbell                         # Start the daemon
//!   dersbell --config ./config.toml  # Custom config path
//!   dersbell --run-digest            # Evaluate the digest once and exit

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dersbell_channels::{EmailSender, PushSender, TelegramSender, telegram};
use dersbell_core::DersBellConfig;
use dersbell_core::traits::{ChannelSender, LessonStore, RecipientDirectory, SubscriberRegistry};
use dersbell_scheduler::{Dispatcher, SchedulerDriver};
use dersbell_store::{RecipientStore, ScheduleStore};

#[derive(Parser)]
#[command(
    name = "dersbell",
    version,
    about = "🔔 DersBell — dərs cədvəli bildiriş xidməti"
)]
struct Cli {
    /// Path to config.toml (default: ~/.dersbell/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Evaluate the digest trigger once and exit
    #[arg(long)]
    run_digest: bool,

    /// Evaluate the reminder trigger once and exit
    #[arg(long)]
    run_reminder: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "dersbell=debug,dersbell_scheduler=debug,dersbell_channels=debug,dersbell_store=debug"
    } else {
        "dersbell=info,dersbell_scheduler=info,dersbell_channels=info,dersbell_store=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            let path = shellexpand::tilde(path).to_string();
            DersBellConfig::load_from(Path::new(&path))?
        }
        None => DersBellConfig::load()?,
    };
    config.apply_env_overrides();
    config
        .validate()
        .context("refusing to start with incomplete configuration")?;

    let tz = config.timezone()?;
    let store_dir = config.store.dir_path();
    let recipients = Arc::new(RecipientStore::new(&store_dir));
    let lessons = Arc::new(ScheduleStore::new(&store_dir));

    // Channel clients are constructed once and shared across all firings.
    let http = reqwest::Client::new();
    let mut senders: Vec<Arc<dyn ChannelSender>> = Vec::new();
    let mut telegram_sender: Option<Arc<TelegramSender>> = None;

    if let Some(push) = config.channel.push.clone().filter(|c| c.enabled) {
        senders.push(Arc::new(PushSender::new(push, http.clone())));
        tracing::info!("📲 Push channel enabled");
    }
    if let Some(email) = config.channel.email.clone().filter(|c| c.enabled) {
        senders.push(Arc::new(EmailSender::new(email)?));
        tracing::info!("📧 Email channel enabled");
    }
    if let Some(tg) = config.channel.telegram.clone().filter(|c| c.enabled) {
        let sender = Arc::new(TelegramSender::new(tg, http.clone()));
        senders.push(sender.clone());
        telegram_sender = Some(sender);
        tracing::info!("🤖 Telegram channel enabled");
    }

    let fallback_chat = config
        .channel
        .telegram
        .as_ref()
        .and_then(|t| t.fallback_chat_id.clone());
    let directory: Arc<dyn RecipientDirectory> = recipients.clone();
    let dispatcher = Arc::new(Dispatcher::new(
        senders,
        directory,
        Duration::from_secs(config.notify.send_timeout_secs),
        fallback_chat,
    ));

    let lesson_store: Arc<dyn LessonStore> = lessons;
    let driver = Arc::new(SchedulerDriver::new(
        lesson_store,
        dispatcher,
        tz,
        config.semester_start,
        config.notify.no_lesson_sentinel.clone(),
        config.triggers.digest_cron.clone(),
        config.triggers.reminder_cron.clone(),
    ));

    if cli.run_digest || cli.run_reminder {
        if cli.run_digest {
            driver.run_digest_tick().await;
        }
        if cli.run_reminder {
            driver.run_reminder_tick().await;
        }
        return Ok(());
    }

    if let Some(sender) = telegram_sender {
        let registry: Arc<dyn SubscriberRegistry> = recipients.clone();
        tokio::spawn(telegram::run_registration_poller(sender, registry));
    }

    driver.start();
    tracing::info!(
        "🚀 DersBell started — digest '{}', reminder '{}' (UTC{:+})",
        config.triggers.digest_cron,
        config.triggers.reminder_cron,
        config.utc_offset_hours
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("👋 Shutting down");
    Ok(())
}
