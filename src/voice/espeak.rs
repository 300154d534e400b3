//! espeak-ng command-line voice.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use super::{SpeechError, Utterance, VoiceEngine};
use crate::config::SpeechConfig;

/// espeak-ng amplitude for volume 1.0.
const DEFAULT_AMPLITUDE: f32 = 100.0;
const MAX_AMPLITUDE: f32 = 200.0;

pub struct EspeakEngine {
    binary: String,
    voice: Option<String>,
}

impl EspeakEngine {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            voice: config.voice.clone(),
        }
    }
}

impl VoiceEngine for EspeakEngine {
    fn init(&self) -> Result<Box<dyn Utterance>, SpeechError> {
        let binary = find_binary(&self.binary)
            .ok_or_else(|| SpeechError::Unavailable(format!("{} not found", self.binary)))?;

        Ok(Box::new(EspeakUtterance {
            binary,
            voice: self.voice.clone(),
            rate: None,
            amplitude: None,
        }))
    }
}

struct EspeakUtterance {
    binary: PathBuf,
    voice: Option<String>,
    rate: Option<u32>,
    amplitude: Option<u32>,
}

impl EspeakUtterance {
    fn command(&self, text: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(voice) = &self.voice {
            cmd.arg("-v").arg(voice);
        }
        if let Some(rate) = self.rate {
            cmd.arg("-s").arg(rate.to_string());
        }
        if let Some(amplitude) = self.amplitude {
            cmd.arg("-a").arg(amplitude.to_string());
        }
        // "--" keeps texts starting with '-' from being read as options.
        cmd.arg("--").arg(text);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::piped());
        cmd
    }
}

impl Utterance for EspeakUtterance {
    fn configure(&mut self, rate: u32, volume: f32) -> Result<(), SpeechError> {
        self.rate = Some(rate);
        self.amplitude = Some(volume_to_amplitude(volume));
        Ok(())
    }

    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        let mut cmd = self.command(text);
        debug!(command = ?cmd, "Running espeak-ng");
        let output = cmd.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::Exit(format!("{}: {}", output.status, stderr.trim())));
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.rate = None;
        self.amplitude = None;
    }
}

fn volume_to_amplitude(volume: f32) -> u32 {
    if volume.is_nan() {
        return DEFAULT_AMPLITUDE as u32;
    }
    (volume * DEFAULT_AMPLITUDE).clamp(0.0, MAX_AMPLITUDE).round() as u32
}

/// Resolve a binary name against PATH; paths are taken as given.
fn find_binary(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return p.exists().then_some(p);
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance(voice: Option<&str>) -> EspeakUtterance {
        EspeakUtterance {
            binary: PathBuf::from("/usr/bin/espeak-ng"),
            voice: voice.map(String::from),
            rate: None,
            amplitude: None,
        }
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn volume_maps_to_amplitude() {
        assert_eq!(volume_to_amplitude(1.0), 100);
        assert_eq!(volume_to_amplitude(0.5), 50);
        assert_eq!(volume_to_amplitude(5.0), 200);
        assert_eq!(volume_to_amplitude(-1.0), 0);
        assert_eq!(volume_to_amplitude(f32::NAN), 100);
    }

    #[test]
    fn configured_command_line() {
        let mut u = utterance(Some("de"));
        u.configure(190, 1.0).unwrap();
        assert_eq!(
            args(&u.command("Mail: Hi")),
            vec!["-v", "de", "-s", "190", "-a", "100", "--", "Mail: Hi"]
        );
    }

    #[test]
    fn stop_resets_settings() {
        let mut u = utterance(None);
        u.configure(150, 0.5).unwrap();
        u.stop();
        assert_eq!(args(&u.command("-x")), vec!["--", "-x"]);
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let engine = EspeakEngine::new(&SpeechConfig {
            binary: "/nonexistent/espeak-ng".into(),
            ..SpeechConfig::default()
        });
        assert!(matches!(engine.init(), Err(SpeechError::Unavailable(_))));
    }

    #[test]
    fn absolute_paths_are_checked_directly() {
        assert_eq!(find_binary("/bin/sh"), Some(PathBuf::from("/bin/sh")));
        assert_eq!(find_binary("/nonexistent/bin"), None);
        assert!(find_binary("sh").is_some());
    }
}
