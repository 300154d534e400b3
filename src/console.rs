//! Console front-end: drives the controller from stdin commands.
//!
//! Commands (one per line):
//!   start | stop | mute | unmute | ignore <app> | unignore <app>
//!   discord on|off | status | help | quit

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::controller::WatchController;
use crate::journal::{self, LogFn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Mute(bool),
    Ignore { app_name: String, enabled: bool },
    /// `true` means Discord notifications are read aloud.
    Discord(bool),
    Status,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match (word.to_lowercase().as_str(), rest) {
            ("start", "") => Self::Start,
            ("stop", "") => Self::Stop,
            ("mute", "") => Self::Mute(true),
            ("unmute", "") => Self::Mute(false),
            ("ignore", app) if !app.is_empty() => Self::Ignore {
                app_name: app.to_string(),
                enabled: true,
            },
            ("unignore", app) if !app.is_empty() => Self::Ignore {
                app_name: app.to_string(),
                enabled: false,
            },
            ("discord", "on") => Self::Discord(true),
            ("discord", "off") => Self::Discord(false),
            ("status", "") => Self::Status,
            ("help" | "?", "") => Self::Help,
            ("quit" | "exit", "") => Self::Quit,
            _ => return Err(format!("Unbekannter Befehl: {line}")),
        };
        Ok(command)
    }
}

const HELP: &str = "Befehle: start, stop, mute, unmute, ignore <App>, unignore <App>, \
                    discord on|off, status, quit";

/// What the console loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

async fn apply(command: ConsoleCommand, controller: &mut WatchController, log: &LogFn) -> Flow {
    match command {
        ConsoleCommand::Start => {
            if !controller.start() {
                journal::info(log, "Assistent läuft bereits.");
            }
        }
        ConsoleCommand::Stop => {
            if controller.is_running() {
                controller.stop().await;
                journal::info(log, "Assistent gestoppt.");
            }
        }
        ConsoleCommand::Mute(enabled) => {
            controller.set_mute(enabled);
            if enabled {
                journal::info(log, "🔇 Lautlos - nur Nachrichten");
            } else {
                journal::info(log, "🔊 Ton aktiviert");
            }
        }
        ConsoleCommand::Ignore { app_name, enabled } => {
            controller.set_ignore_app(&app_name, enabled);
            if enabled {
                journal::info(log, format!("🔇 {app_name} bleibt stumm"));
            } else {
                journal::info(log, format!("🔊 {app_name} wird vorgelesen."));
            }
        }
        ConsoleCommand::Discord(read) => {
            controller.set_ignore_discord(!read);
            if read {
                journal::info(log, "🔊 Discord wird vorgelesen.");
            } else {
                journal::info(log, "🔇 Discord bleibt stumm");
            }
        }
        ConsoleCommand::Status => journal::info(log, status_line(controller)),
        ConsoleCommand::Help => journal::info(log, HELP),
        ConsoleCommand::Quit => {
            controller.stop().await;
            journal::info(log, "Assistent gestoppt.");
            return Flow::Quit;
        }
    }
    Flow::Continue
}

fn status_line(controller: &WatchController) -> String {
    let toggles = controller.toggles();
    let ignored = toggles.ignored_apps();
    format!(
        "Assistent: {} | Lautlos: {} | Ignoriert: {}",
        if controller.is_running() { "läuft" } else { "gestoppt" },
        if toggles.is_muted() { "ja" } else { "nein" },
        if ignored.is_empty() { "-".to_string() } else { ignored.join(", ") },
    )
}

/// Run the console until `quit`, end of input or Ctrl-C. Each of them
/// stops the watch loop before returning.
///
/// With `autostart` the watch loop is started after that delay, the way
/// the desktop front-end did.
pub async fn run(mut controller: WatchController, log: LogFn, autostart: Option<Duration>) {
    journal::info(&log, "👉 Starte…");
    let stdin = BufReader::new(tokio::io::stdin());
    drive(&mut controller, &log, autostart, stdin, tokio::signal::ctrl_c()).await;
}

async fn drive<R, S>(
    controller: &mut WatchController,
    log: &LogFn,
    autostart: Option<Duration>,
    input: R,
    shutdown: S,
) where
    R: AsyncBufRead + Unpin,
    S: Future,
{
    let mut lines = input.lines();
    let autostart_timer = tokio::time::sleep(autostart.unwrap_or_default());
    tokio::pin!(autostart_timer);
    // Created once so a signal arriving while a command runs is not lost.
    tokio::pin!(shutdown);
    let mut autostart_pending = autostart.is_some();

    loop {
        tokio::select! {
            _ = &mut autostart_timer, if autostart_pending => {
                autostart_pending = false;
                controller.start();
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        debug!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read stdin: {e}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match ConsoleCommand::parse(&line) {
                    Ok(command) => {
                        debug!("Console command: {command:?}");
                        if apply(command, controller, log).await == Flow::Quit {
                            return;
                        }
                    }
                    Err(e) => {
                        journal::warn(log, e);
                        journal::info(log, HELP);
                    }
                }
            }
            _ = &mut shutdown => {
                controller.stop().await;
                journal::info(log, "Beendet durch Benutzer (Strg+C).");
                return;
            }
        }
    }

    controller.stop().await;
    journal::info(log, "Eingabe beendet, Assistent gestoppt.");
}
