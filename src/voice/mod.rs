//! Speech synthesis backends.
//!
//! Every utterance runs on a fresh engine instance:
//! init → configure → speak (blocking) → stop.

pub mod espeak;

pub use espeak::EspeakEngine;

use crate::config::SpeechConfig;

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech engine unavailable: {0}")]
    Unavailable(String),

    #[error("failed to start speech engine: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("speech engine exited with {0}")]
    Exit(String),
}

/// Factory for per-utterance engine instances.
pub trait VoiceEngine: Send + Sync {
    fn init(&self) -> Result<Box<dyn Utterance>, SpeechError>;
}

/// One engine instance. `speak` blocks until the text has been spoken.
pub trait Utterance: Send {
    /// `rate` in words per minute, `volume` from 0.0 to 2.0.
    fn configure(&mut self, rate: u32, volume: f32) -> Result<(), SpeechError>;
    fn speak(&mut self, text: &str) -> Result<(), SpeechError>;
    fn stop(&mut self);
}

/// Accepts every utterance without producing sound.
pub struct SilentEngine;

impl VoiceEngine for SilentEngine {
    fn init(&self) -> Result<Box<dyn Utterance>, SpeechError> {
        Ok(Box::new(SilentEngine))
    }
}

impl Utterance for SilentEngine {
    fn configure(&mut self, _rate: u32, _volume: f32) -> Result<(), SpeechError> {
        Ok(())
    }

    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        tracing::debug!("Speech disabled, skipping {} chars", text.chars().count());
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Pick the engine configured in the `speech` section.
pub fn from_config(config: &SpeechConfig) -> Box<dyn VoiceEngine> {
    if config.enabled {
        Box::new(EspeakEngine::new(config))
    } else {
        Box::new(SilentEngine)
    }
}
