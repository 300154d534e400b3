//! The user-facing log trail.
//!
//! Every announcement and every recoverable failure ends up as one plain
//! text line handed to a [`LogFn`]. Consumers that want to style the trail
//! can recognise the line shapes with [`LogLine::classify`].

use std::sync::Arc;

use chrono::{Local, NaiveTime};

/// Log sink supplied by the front-end. Called from the watch task.
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

const HEADER_ARROW: &str = "→";
const WARN_PREFIX: &str = "⚠️ ";
const ERROR_PREFIX: &str = "❌ ";

/// Header line announcing a new notification: `→ HH:MM:SS [App]:`.
pub fn header(app_name: &str) -> String {
    header_at(Local::now().time(), app_name)
}

pub fn header_at(time: NaiveTime, app_name: &str) -> String {
    format!("{HEADER_ARROW} {} [{app_name}]:", time.format("%H:%M:%S"))
}

pub fn warn(log: &LogFn, msg: impl AsRef<str>) {
    log(&format!("{WARN_PREFIX}{}", msg.as_ref()));
}

pub fn error(log: &LogFn, msg: impl AsRef<str>) {
    log(&format!("{ERROR_PREFIX}{}", msg.as_ref()));
}

pub fn info(log: &LogFn, msg: impl AsRef<str>) {
    log(msg.as_ref());
}

/// Shape of a trail line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine<'a> {
    Header { time: &'a str, app_name: &'a str },
    Warning(&'a str),
    Error(&'a str),
    Plain(&'a str),
}

impl<'a> LogLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        if let Some(header) = Self::parse_header(line) {
            return header;
        }
        if let Some(rest) = line.strip_prefix("⚠️") {
            return Self::Warning(rest.trim_start());
        }
        if let Some(rest) = line.strip_prefix("❌") {
            return Self::Error(rest.trim_start());
        }
        Self::Plain(line)
    }

    fn parse_header(line: &'a str) -> Option<Self> {
        let rest = line.strip_prefix(HEADER_ARROW)?.trim_start();
        let (time, rest) = rest.split_once(' ')?;
        if NaiveTime::parse_from_str(time, "%H:%M:%S").is_err() {
            return None;
        }
        let app_name = rest
            .trim()
            .strip_suffix(':')?
            .trim_end()
            .strip_prefix('[')?
            .strip_suffix(']')?;
        if app_name.is_empty() || app_name.contains(']') {
            return None;
        }
        Some(Self::Header { time, app_name })
    }
}

/// Console sink: one trail line per stdout line.
pub fn console() -> LogFn {
    Arc::new(|line: &str| {
        println!("{line}");
        tracing::trace!(kind = ?LogLine::classify(line), "trail line");
    })
}
