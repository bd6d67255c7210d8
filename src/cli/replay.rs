//! Replay command implementation.
//!
//! Runs a full session (permissions, contacts, detection) against scripted
//! providers and feeds it a recorded list of listener notifications.

#[cfg(feature = "background")]
use crate::background::TokioBackgroundExecutor;
use crate::config::Config;
use crate::contacts::{ContactSource, JsonContactSource};
use crate::detection::CallDetectionProvider;
use crate::matcher::{phase_after, CallEvent, CallPhase, CallStatus, RawCallEvent};
use crate::permissions::Capability;
use crate::session::CallSession;
#[cfg(feature = "call-ui")]
use crate::simulated::LoggingCallUi;
use crate::simulated::{ScriptedCallDetector, StaticContactSource, StaticPermissions};
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Arguments for the replay command
#[derive(Args)]
pub struct ReplayArgs {
    /// Recorded events (JSON array of {"kind": ..., "number": ...})
    #[arg(short, long)]
    pub events: PathBuf,

    /// Contacts export (JSON array of contacts)
    #[arg(long)]
    pub contacts: Option<PathBuf>,

    /// Run detection inside a background task
    #[arg(long)]
    pub background: bool,

    /// Simulate a denied contacts permission
    #[arg(long)]
    pub deny_contacts: bool,

    /// Simulate a denied phone-state permission
    #[arg(long)]
    pub deny_phone_state: bool,

    /// Print one JSON object per event
    #[arg(long)]
    pub json: bool,
}

/// Status after one replayed event
#[derive(Debug, Clone, Serialize)]
pub struct ReplayRecord {
    pub at: DateTime<Utc>,
    pub event: CallEvent,
    pub phase: CallPhase,
    pub status: CallStatus,
}

/// Run the replay command
pub async fn run(args: ReplayArgs, config: Config) -> anyhow::Result<()> {
    let raw_events = read_events(&args.events).await?;

    let mut denied = Vec::new();
    if args.deny_contacts {
        denied.push(Capability::ReadContacts);
    }
    if args.deny_phone_state {
        denied.push(Capability::ReadPhoneState);
    }

    let contacts: Arc<dyn ContactSource> = match &args.contacts {
        Some(path) => Arc::new(JsonContactSource::new(path)),
        None => Arc::new(StaticContactSource::default()),
    };
    let detector = ScriptedCallDetector::new();
    let provider: Arc<dyn CallDetectionProvider> = Arc::new(detector.clone());

    let session = CallSession::new(
        Arc::new(StaticPermissions::denying(&denied)),
        contacts,
        provider,
        config.detection.clone(),
    );
    #[cfg(feature = "call-ui")]
    let session = session.with_call_ui(Arc::new(LoggingCallUi::new()), config.call_ui.clone());
    #[cfg(feature = "background")]
    let session = if args.background {
        session.with_background(
            Arc::new(TokioBackgroundExecutor::new()),
            config.background.clone(),
        )
    } else {
        session
    };
    #[cfg(not(feature = "background"))]
    if args.background {
        warn!("Built without background support; running in the foreground");
    }

    let mut session = session;
    session.initialize().await;
    println!("Loaded {} contacts", session.contact_count().await);

    session
        .start_detection()
        .await
        .context("Call detection could not be started")?;

    let records = replay(&detector, &session, raw_events);
    for record in &records {
        if args.json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!(
                "{:<24} {:<16} caller={} known={}",
                record.event.to_string(),
                record.phase.to_string(),
                record
                    .status
                    .caller_number
                    .as_ref()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                record.status.matches_contact
            );
        }
    }

    session.shutdown().await?;
    Ok(())
}

/// Feed `raw_events` through `detector`, recording the status after each one
///
/// Notifications with an unknown kind are skipped.
pub fn replay(
    detector: &ScriptedCallDetector,
    session: &CallSession,
    raw_events: Vec<RawCallEvent>,
) -> Vec<ReplayRecord> {
    let mut records = Vec::new();

    for raw in raw_events {
        let event = match CallEvent::try_from(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping notification: {}", e);
                continue;
            }
        };

        if !detector.emit(event.clone()) {
            warn!("No listener registered; dropping {}", event);
            continue;
        }

        let status = session.current_status();
        records.push(ReplayRecord {
            at: Utc::now(),
            phase: phase_after(&event, &status),
            event,
            status,
        });
    }

    records
}

async fn read_events(path: &Path) -> anyhow::Result<Vec<RawCallEvent>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read events from {}", path.display()))?;
    let events = serde_json::from_str(&content)
        .with_context(|| format!("Invalid events file {}", path.display()))?;
    Ok(events)
}
