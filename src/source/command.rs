//! Listener backed by an external snapshot command.
//!
//! Linux has no standard API to enumerate the notifications currently on
//! screen, so the listing is delegated to a helper (a notification daemon
//! hook, a D-Bus monitor script, ...) that prints the active notifications
//! as a JSON array. See `extract` for the per-notification shape; each entry
//! also needs a numeric `id`.
//!
//! Exit codes:
//! - 0: success (stdout holds the snapshot)
//! - 77 (`EX_NOPERM`): access denied
//! - any code in `transient_exit_codes`: sporadic failure, skip this poll

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use super::{AccessStatus, NotificationId, NotificationListener, RawNotification, SourceError};
use crate::config::SourceConfig;

const EXIT_NO_PERMISSION: i32 = 77;

pub struct CommandListener {
    program: String,
    args: Vec<String>,
    transient_exit_codes: Vec<i32>,
}

impl CommandListener {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| SourceError::Unsupported("source.command is empty".into()))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            transient_exit_codes: config.transient_exit_codes.clone(),
        })
    }

    async fn run(&self) -> Result<std::process::Output, SourceError> {
        debug!("Running snapshot command: {} {:?}", self.program, self.args);
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(output)
    }
}

#[async_trait]
impl NotificationListener for CommandListener {
    async fn request_access(&self) -> Result<AccessStatus, SourceError> {
        let output = self.run().await?;
        let status = match output.status.code() {
            Some(0) => AccessStatus::Allowed,
            Some(EXIT_NO_PERMISSION) => AccessStatus::Denied,
            _ => AccessStatus::Unspecified,
        };
        Ok(status)
    }

    async fn notifications(&self) -> Result<Vec<RawNotification>, SourceError> {
        let output = self.run().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return match output.status.code() {
                Some(code) if self.transient_exit_codes.contains(&code) => {
                    Err(SourceError::Transient(format!("exit code {code}")))
                }
                _ => Err(SourceError::Exit {
                    status: output.status.to_string(),
                    stderr,
                }),
            };
        }

        parse_snapshot(&output.stdout)
    }
}

/// Parse the command output. Entries without a numeric `id` are dropped.
pub fn parse_snapshot(stdout: &[u8]) -> Result<Vec<RawNotification>, SourceError> {
    let entries: Vec<Value> = serde_json::from_slice(stdout)?;

    let snapshot = entries
        .into_iter()
        .filter_map(|content| match content.get("id").and_then(|id| id.as_u64()) {
            Some(id) => Some(RawNotification {
                id: NotificationId(id),
                content,
            }),
            None => {
                debug!("Skipping notification without id: {content}");
                None
            }
        })
        .collect();

    Ok(snapshot)
}
