//! Configuration management for notify-speaker-rs.
//!
//! Loads config from YAML files in standard locations. Every section has
//! defaults, so a missing or partial file still yields a working setup.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yml::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between two notification polls.
    pub poll_interval: f64,
    /// Seconds to wait before asking for notification access again.
    pub access_retry: f64,
    /// Seconds to pause after a fetch failure before re-initialising.
    pub reinit_delay: f64,
    /// Seconds before a crashed watch task is restarted.
    pub restart_delay: f64,
    /// Seconds between start-up and the first automatic loop start.
    pub autostart_delay: f64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: 2.0,
            access_retry: 10.0,
            reinit_delay: 5.0,
            restart_delay: 5.0,
            autostart_delay: 2.0,
        }
    }
}

impl WatchConfig {
    pub fn timings(&self) -> WatchTimings {
        WatchTimings {
            poll_interval: seconds(self.poll_interval),
            access_retry: seconds(self.access_retry),
            reinit_delay: seconds(self.reinit_delay),
        }
    }
}

/// Sleep lengths used by the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchTimings {
    pub poll_interval: Duration,
    pub access_retry: Duration,
    pub reinit_delay: Duration,
}

impl Default for WatchTimings {
    fn default() -> Self {
        WatchConfig::default().timings()
    }
}

/// Negative or NaN values from a hand-edited file collapse to zero;
/// anything too large for a `Duration` saturates.
pub fn seconds(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub binary: String,
    pub voice: Option<String>,
    /// Words per minute.
    pub rate: u32,
    /// 0.0 (silent) to 2.0 (double); 1.0 is the engine default.
    pub volume: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: "espeak-ng".into(),
            voice: None,
            rate: 190,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Program and arguments printing the active notifications as JSON.
    pub command: Vec<String>,
    /// Exit codes that signal a sporadic, ignorable failure.
    pub transient_exit_codes: Vec<i32>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            command: vec!["notify-speaker-snapshot".into()],
            transient_exit_codes: vec![75],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TogglesConfig {
    pub mute: bool,
    pub ignored_apps: Vec<String>,
    pub read_discord: bool,
}

impl Default for TogglesConfig {
    fn default() -> Self {
        Self {
            mute: false,
            ignored_apps: vec!["Alexa".into()],
            read_discord: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub watch: WatchConfig,
    pub speech: SpeechConfig,
    pub source: SourceConfig,
    pub toggles: TogglesConfig,
}

impl Config {
    /// Load configuration, falling back to defaults when no file is found
    /// or the file is unusable.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/notify-speaker/config.yaml
    /// 3. /etc/notify-speaker/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let Some(config_path) = path.map(PathBuf::from).or_else(find_config_file) else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match Self::read(&config_path) {
            Ok(config) => {
                info!("Loaded config from {}", config_path.display());
                config
            }
            Err(e) => {
                warn!("{e}, using defaults");
                Self::default()
            }
        }
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }
}

fn find_config_file() -> Option<PathBuf> {
    let candidates = [
        std::env::current_dir().ok().map(|d| d.join("config.yaml")),
        dirs::config_dir().map(|c| c.join("notify-speaker/config.yaml")),
        Some(PathBuf::from("/etc/notify-speaker/config.yaml")),
    ];
    candidates.into_iter().flatten().find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_watcher_cadence() {
        let timings = WatchTimings::default();
        assert_eq!(timings.poll_interval, Duration::from_secs(2));
        assert_eq!(timings.access_retry, Duration::from_secs(10));
        assert_eq!(timings.reinit_delay, Duration::from_secs(5));

        let config = Config::default();
        assert_eq!(config.speech.rate, 190);
        assert_eq!(config.toggles.ignored_apps, vec!["Alexa"]);
        assert_eq!(config.source.transient_exit_codes, vec![75]);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = Config::parse(
            "watch:\n  poll_interval: 0.5\nspeech:\n  voice: de\ntoggles:\n  read_discord: false\n",
        )
        .unwrap();
        assert_eq!(config.watch.timings().poll_interval, Duration::from_millis(500));
        assert_eq!(config.watch.access_retry, 10.0);
        assert_eq!(config.speech.voice.as_deref(), Some("de"));
        assert_eq!(config.speech.binary, "espeak-ng");
        assert!(!config.toggles.read_discord);
        assert_eq!(config.toggles.ignored_apps, vec!["Alexa"]);
    }

    #[test]
    fn source_command_from_yaml() {
        let yaml = "source:\n  \
                    command: [\"sh\", \"-c\", \"cat /tmp/n.json\"]\n  \
                    transient_exit_codes: [75, 99]\n";
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.source.command, vec!["sh", "-c", "cat /tmp/n.json"]);
        assert_eq!(config.source.transient_exit_codes, vec![75, 99]);
    }

    #[test]
    fn invalid_seconds_collapse_to_zero() {
        assert_eq!(seconds(-1.0), Duration::ZERO);
        assert_eq!(seconds(f64::NAN), Duration::ZERO);
        assert_eq!(seconds(1.5), Duration::from_millis(1500));
    }

    #[test]
    fn oversized_seconds_saturate() {
        assert_eq!(seconds(1e20), Duration::MAX);
        assert_eq!(seconds(f64::INFINITY), Duration::MAX);
    }

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "notify-speaker-{}-{name}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn read_reports_missing_and_malformed_files() {
        let missing = std::env::temp_dir().join("notify-speaker-does-not-exist.yaml");
        assert!(matches!(Config::read(&missing), Err(ConfigError::Read { .. })));

        let bad = scratch_file("bad", "watch:\n  poll_interval: fast\n");
        let result = Config::read(&bad);
        std::fs::remove_file(&bad).unwrap();
        match result {
            Err(e @ ConfigError::Parse { .. }) => {
                assert!(e.to_string().starts_with("failed to parse"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn load_falls_back_to_defaults_on_bad_file() {
        let bad = scratch_file("fallback", "toggles: [1, 2\n");
        let config = Config::load(Some(bad.as_path()));
        std::fs::remove_file(&bad).unwrap();
        assert_eq!(config.watch.poll_interval, 2.0);
        assert_eq!(config.toggles.ignored_apps, vec!["Alexa"]);
    }

    #[test]
    fn load_reads_explicit_path() {
        let path = scratch_file("explicit", "watch:\n  access_retry: 3.0\n");
        let config = Config::load(Some(path.as_path()));
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.watch.timings().access_retry, Duration::from_secs(3));
    }
}
