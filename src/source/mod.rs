//! Notification source: the host capability that lists active notifications.
//!
//! Components:
//! - `extract`: best-effort (app name, message) extraction from raw content
//! - `command`: listener backed by an external snapshot command

pub mod command;
pub mod extract;

use async_trait::async_trait;
use serde_json::Value;

use crate::journal::{self, LogFn};

/// Host-assigned notification id. Only compared, never dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(pub u64);

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One active notification as reported by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNotification {
    pub id: NotificationId,
    pub content: Value,
}

/// Answer of the host to an access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Allowed,
    Denied,
    Unspecified,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Sporadic host failure that is safe to skip without re-initialising.
    #[error("transient host error: {0}")]
    Transient(String),

    #[error("failed to run snapshot command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("snapshot command exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("invalid snapshot JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("notification source unavailable: {0}")]
    Unsupported(String),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[async_trait]
pub trait NotificationListener: Send + Sync {
    /// Ask the host for permission to read notifications.
    async fn request_access(&self) -> Result<AccessStatus, SourceError>;

    /// Current snapshot of active toast notifications.
    async fn notifications(&self) -> Result<Vec<RawNotification>, SourceError>;
}

/// Request access once. `None` means the caller has to retry later.
pub async fn acquire<'a>(
    listener: &'a dyn NotificationListener,
    log: &LogFn,
) -> Option<&'a dyn NotificationListener> {
    let status = match listener.request_access().await {
        Ok(status) => status,
        Err(e) => {
            journal::error(log, format!("Zugriffsanfrage fehlgeschlagen: {e}"));
            return None;
        }
    };

    journal::info(log, "👌 Zugriff auf Benachrichtigungen angefragt");

    if status != AccessStatus::Allowed {
        tracing::debug!("Notification access status: {status:?}");
        journal::warn(
            log,
            "Kein Zugriff auf Benachrichtigungen. \
             Bitte die Berechtigung in den Systemeinstellungen prüfen.",
        );
        return None;
    }

    Some(listener)
}
