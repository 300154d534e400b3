//! Speech emitter: the only writer of per-notification log lines and the
//! only trigger of audible output.

use std::sync::Arc;

use tracing::debug;

use crate::config::SpeechConfig;
use crate::journal::{self, LogFn};
use crate::sanitize;
use crate::toggles::RuntimeToggles;
use crate::voice::{SpeechError, VoiceEngine};

/// The utterance worker died before reporting back.
#[derive(Debug, thiserror::Error)]
#[error("speech worker crashed: {0}")]
pub struct DispatchError(String);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSettings {
    pub rate: u32,
    pub volume: f32,
}

impl From<&SpeechConfig> for VoiceSettings {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            rate: config.rate,
            volume: config.volume,
        }
    }
}

#[derive(Clone)]
pub struct Speaker {
    toggles: Arc<RuntimeToggles>,
    engine: Arc<dyn VoiceEngine>,
    settings: VoiceSettings,
}

impl Speaker {
    pub fn new(
        toggles: Arc<RuntimeToggles>,
        engine: Arc<dyn VoiceEngine>,
        settings: VoiceSettings,
    ) -> Self {
        Self {
            toggles,
            engine,
            settings,
        }
    }

    /// Log and, unless muted, speak one message.
    ///
    /// With `notify_style` a header line precedes the message and the app
    /// name is spoken first. Engine failures are logged as warnings; only a
    /// crashed worker is returned as an error.
    pub async fn speak(
        &self,
        app_name: &str,
        message: Option<&str>,
        log: &LogFn,
        notify_style: bool,
    ) -> Result<(), DispatchError> {
        if self.toggles.is_ignored(app_name) {
            debug!("Ignoring notification from {app_name}");
            return Ok(());
        }

        let log_message = sanitize::for_log(message);

        if notify_style {
            journal::info(log, journal::header(app_name));
        }
        journal::info(log, &log_message);

        if self.toggles.is_muted() {
            return Ok(());
        }

        let text = if notify_style {
            sanitize::for_speech(Some(&format!("{app_name}: {log_message}")))
        } else {
            sanitize::for_speech(Some(&log_message))
        };

        let engine = Arc::clone(&self.engine);
        let settings = self.settings;
        let spoken = tokio::task::spawn_blocking(move || utter(engine.as_ref(), settings, &text))
            .await
            .map_err(|e| DispatchError(e.to_string()))?;

        if let Err(e) = spoken {
            journal::warn(log, format!("Fehler im TTS für {app_name}: {e}"));
        }
        Ok(())
    }
}

fn utter(engine: &dyn VoiceEngine, settings: VoiceSettings, text: &str) -> Result<(), SpeechError> {
    let mut utterance = engine.init()?;
    let result = utterance
        .configure(settings.rate, settings.volume)
        .and_then(|()| utterance.speak(text));
    utterance.stop();
    result
}
