//! Start/stop control for the watch loop and access to the runtime toggles.
//!
//! At most one watch task runs at a time. The task is supervised: if the
//! loop dies abnormally it is restarted after `restart_delay`, unless a stop
//! was requested in the meantime.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatchTimings;
use crate::journal::{self, LogFn};
use crate::source::NotificationListener;
use crate::speaker::Speaker;
use crate::toggles::RuntimeToggles;
use crate::watcher::NotificationWatcher;

/// Everything needed to build a fresh watcher.
#[derive(Clone)]
struct WatchParts {
    listener: Arc<dyn NotificationListener>,
    speaker: Speaker,
    log: LogFn,
    timings: WatchTimings,
}

impl WatchParts {
    fn watcher(&self) -> NotificationWatcher {
        NotificationWatcher::new(
            self.listener.clone(),
            self.speaker.clone(),
            self.log.clone(),
            self.timings,
        )
    }
}

pub struct WatchController {
    parts: WatchParts,
    toggles: Arc<RuntimeToggles>,
    restart_delay: Duration,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl WatchController {
    pub fn new(
        listener: Arc<dyn NotificationListener>,
        speaker: Speaker,
        toggles: Arc<RuntimeToggles>,
        log: LogFn,
        timings: WatchTimings,
        restart_delay: Duration,
    ) -> Self {
        Self {
            parts: WatchParts {
                listener,
                speaker,
                log,
                timings,
            },
            toggles,
            restart_delay,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Spawn the watch task. Returns false (and does nothing) if one is
    /// already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            debug!("Watch loop already running");
            return false;
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(supervise(
            self.parts.clone(),
            cancel_token.clone(),
            self.restart_delay,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        info!("Watch loop started");
        true
    }

    /// Cancel the watch task and wait until it has terminated.
    pub async fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Watch supervisor failed to join: {e}");
            }
            info!("Watch loop stopped");
        }
    }

    pub fn toggles(&self) -> &RuntimeToggles {
        &self.toggles
    }

    pub fn set_mute(&self, enabled: bool) {
        self.toggles.set_mute(enabled);
    }

    pub fn set_ignore_app(&self, name: &str, enabled: bool) {
        self.toggles.set_ignore_app(name, enabled);
    }

    pub fn set_ignore_discord(&self, enabled: bool) {
        self.toggles.set_ignore_discord(enabled);
    }
}

async fn supervise(parts: WatchParts, cancel: CancellationToken, restart_delay: Duration) {
    loop {
        let task = tokio::spawn(parts.watcher().run(cancel.clone()));
        let Err(e) = task.await else {
            // The loop only returns normally once cancelled.
            return;
        };
        if cancel.is_cancelled() {
            return;
        }

        warn!("Watch loop died: {e}");
        journal::error(&parts.log, format!("Assistent-Fehler: {e}"));
        journal::info(
            &parts.log,
            format!("Neustart in {}s…", restart_delay.as_secs_f64()),
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(restart_delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::journal::testing::CapturedLog;
    use crate::source::testing::{toast, ScriptedListener};
    use crate::source::{AccessStatus, RawNotification, SourceError};
    use crate::speaker::VoiceSettings;
    use crate::voice::testing::RecordingEngine;

    const FAST: WatchTimings = WatchTimings {
        poll_interval: Duration::from_millis(1),
        access_retry: Duration::from_millis(1),
        reinit_delay: Duration::from_millis(1),
    };

    fn controller(
        listener: Arc<dyn NotificationListener>,
        engine: &RecordingEngine,
        captured: &CapturedLog,
    ) -> WatchController {
        let toggles = Arc::new(RuntimeToggles::default());
        let speaker = Speaker::new(
            toggles.clone(),
            Arc::new(engine.clone()),
            VoiceSettings { rate: 190, volume: 1.0 },
        );
        WatchController::new(
            listener,
            speaker,
            toggles,
            captured.sink(),
            FAST,
            Duration::from_millis(1),
        )
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn second_start_is_a_no_op() {
        let listener = Arc::new(ScriptedListener::default());
        let engine = RecordingEngine::default();
        let captured = CapturedLog::default();
        let mut controller = controller(listener.clone(), &engine, &captured);

        assert!(controller.start());
        assert!(!controller.start());
        assert!(controller.is_running());

        let watched = listener.clone();
        wait_until(move || watched.fetches() >= 2).await;
        controller.stop().await;
        assert!(!controller.is_running());

        // Only one loop ever announced the start-up.
        assert_eq!(listener.access_requests(), 1);
        assert_eq!(engine.spoken().len(), 3);
    }

    #[tokio::test]
    async fn stop_then_start_runs_a_fresh_loop() {
        let listener = Arc::new(
            ScriptedListener::default().with_snapshot(vec![toast(1, "Mail", &["Hi"])]),
        );
        let engine = RecordingEngine::default();
        let captured = CapturedLog::default();
        let mut controller = controller(listener.clone(), &engine, &captured);

        controller.start();
        let watched = listener.clone();
        wait_until(move || watched.fetches() >= 1).await;
        controller.stop().await;
        let lines_after_stop = captured.lines().len();

        controller.start();
        let watched = listener.clone();
        wait_until(move || watched.access_requests() >= 2).await;
        controller.stop().await;

        assert!(captured.lines().len() > lines_after_stop);
    }

    #[tokio::test]
    async fn stop_without_start_is_harmless() {
        let engine = RecordingEngine::default();
        let captured = CapturedLog::default();
        let mut controller = controller(Arc::new(ScriptedListener::default()), &engine, &captured);

        controller.stop().await;
        assert!(!controller.is_running());
        assert!(captured.lines().is_empty());
    }

    #[test]
    fn toggle_setters_reach_shared_state() {
        let engine = RecordingEngine::default();
        let captured = CapturedLog::default();
        let controller = controller(Arc::new(ScriptedListener::default()), &engine, &captured);

        controller.set_mute(true);
        controller.set_ignore_app("Mail", true);
        controller.set_ignore_discord(true);

        assert!(controller.toggles().is_muted());
        assert_eq!(controller.toggles().ignored_apps(), vec!["Discord", "Mail"]);
    }

    /// Panics on the first fetch, behaves afterwards.
    #[derive(Default)]
    struct CrashOnce {
        access_requests: AtomicUsize,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl NotificationListener for CrashOnce {
        async fn request_access(&self) -> Result<AccessStatus, SourceError> {
            self.access_requests.fetch_add(1, Ordering::SeqCst);
            Ok(AccessStatus::Allowed)
        }

        async fn notifications(&self) -> Result<Vec<RawNotification>, SourceError> {
            if self.fetches.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("listener crashed");
            }
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn crashed_loop_is_restarted() {
        let listener = Arc::new(CrashOnce::default());
        let engine = RecordingEngine::default();
        let captured = CapturedLog::default();
        let mut controller = controller(listener.clone(), &engine, &captured);

        controller.start();
        let watched = listener.clone();
        wait_until(move || watched.fetches.load(Ordering::SeqCst) >= 2).await;
        controller.stop().await;

        assert_eq!(listener.access_requests.load(Ordering::SeqCst), 2);
        let lines = captured.lines();
        assert!(lines.iter().any(|l| l.starts_with("❌ Assistent-Fehler")));
        assert!(lines.iter().any(|l| l.starts_with("Neustart in")));
    }
}
