//! Notification watch loop with state machine.
//!
//! ACQUIRING → POLLING → (RECOVERING → ACQUIRING) → POLLING → …
//!
//! The loop only ends when its cancellation token fires. Every failure
//! below it becomes a log line plus a retry, a skip or a continuation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::WatchTimings;
use crate::journal::{self, LogFn};
use crate::source::extract::extract_record;
use crate::source::{self, NotificationId, NotificationListener, RawNotification};
use crate::speaker::Speaker;

/// Spoken once after access was granted, as a liveness signal.
const STARTUP_ANNOUNCEMENTS: [(&str, &str); 3] = [
    ("Status", "👍 Benachrichtigungs-Assistent gestartet!"),
    ("Info", "👋 Willkommen"),
    ("Placeholder", " "),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Acquiring,
    Polling,
    Recovering,
}

impl std::fmt::Display for WatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acquiring => write!(f, "ACQUIRING"),
            Self::Polling => write!(f, "POLLING"),
            Self::Recovering => write!(f, "RECOVERING"),
        }
    }
}

/// The loop was cancelled; unwind without further output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cancelled;

pub struct NotificationWatcher {
    listener: Arc<dyn NotificationListener>,
    speaker: Speaker,
    log: LogFn,
    timings: WatchTimings,
    state: WatchState,
    /// Ids from the previous successful poll.
    seen: HashSet<NotificationId>,
}

impl NotificationWatcher {
    pub fn new(
        listener: Arc<dyn NotificationListener>,
        speaker: Speaker,
        log: LogFn,
        timings: WatchTimings,
    ) -> Self {
        Self {
            listener,
            speaker,
            log,
            timings,
            state: WatchState::Acquiring,
            seen: HashSet::new(),
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        if self.watch(&cancel).await.is_err() {
            info!("Watch loop cancelled in state {}", self.state);
        }
    }

    async fn watch(&mut self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        self.acquire(cancel).await?;
        self.announce_startup(cancel).await?;

        loop {
            self.poll(cancel).await?;
            sleep(cancel, self.timings.poll_interval).await?;
        }
    }

    /// Request access until granted. Retries forever.
    async fn acquire(&mut self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        self.transition(WatchState::Acquiring);
        loop {
            let granted = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Cancelled),
                granted = source::acquire(self.listener.as_ref(), &self.log) => granted.is_some(),
            };
            if granted {
                self.transition(WatchState::Polling);
                return Ok(());
            }
            journal::warn(
                &self.log,
                format!("Erneuter Zugriff in {}…", format_secs(self.timings.access_retry)),
            );
            sleep(cancel, self.timings.access_retry).await?;
        }
    }

    async fn announce_startup(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        for (app_name, text) in STARTUP_ANNOUNCEMENTS {
            check(cancel)?;
            if let Err(e) = self.speaker.speak(app_name, Some(text), &self.log, false).await {
                journal::warn(&self.log, format!("Fehler bei Start-Sprachausgabe: {e}"));
            }
        }
        Ok(())
    }

    /// One fetch → announce → publish cycle, including error recovery.
    async fn poll(&mut self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled),
            fetched = self.listener.notifications() => fetched,
        };

        match fetched {
            Ok(snapshot) => {
                self.seen = self.announce_new(snapshot, cancel).await?;
                Ok(())
            }
            Err(e) if e.is_transient() => {
                journal::warn(
                    &self.log,
                    format!("Sporadischer Fehler beim Abrufen – wird ignoriert: {e}"),
                );
                Ok(())
            }
            Err(e) => {
                self.transition(WatchState::Recovering);
                journal::warn(
                    &self.log,
                    format!("Fehler beim Abrufen der Benachrichtigungen: {e}"),
                );
                let delay = format_secs(self.timings.reinit_delay);
                journal::info(&self.log, format!("Versuche Re-Initialisierung in {delay}…"));
                sleep(cancel, self.timings.reinit_delay).await?;
                self.acquire(cancel).await
            }
        }
    }

    /// Announce every notification not seen in the previous poll and return
    /// the ids of this snapshot. Nothing is published if cancelled midway.
    async fn announce_new(
        &self,
        snapshot: Vec<RawNotification>,
        cancel: &CancellationToken,
    ) -> Result<HashSet<NotificationId>, Cancelled> {
        let current: HashSet<NotificationId> = snapshot.iter().map(|n| n.id).collect();
        let fresh: Vec<&RawNotification> = snapshot
            .iter()
            .filter(|n| !self.seen.contains(&n.id))
            .collect();
        debug!("Snapshot: {} active, {} new", current.len(), fresh.len());

        for raw in fresh {
            check(cancel)?;
            let record = extract_record(raw);
            if let Err(e) = self
                .speaker
                .speak(&record.app_name, record.message.as_deref(), &self.log, true)
                .await
            {
                journal::warn(
                    &self.log,
                    format!("Fehler beim Vorlesen von {}: {e}", record.app_name),
                );
            }
        }

        Ok(current)
    }

    fn transition(&mut self, next: WatchState) {
        if self.state != next {
            info!("State: {} → {}", self.state, next);
            self.state = next;
        }
    }
}

fn check(cancel: &CancellationToken) -> Result<(), Cancelled> {
    if cancel.is_cancelled() {
        Err(Cancelled)
    } else {
        Ok(())
    }
}

async fn sleep(cancel: &CancellationToken, duration: Duration) -> Result<(), Cancelled> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

fn format_secs(duration: Duration) -> String {
    format!("{}s", duration.as_secs_f64())
}
