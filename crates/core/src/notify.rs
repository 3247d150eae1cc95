//! User-facing notifications for orchestrator outcomes.
//!
//! The [`Notifier`] facade logs every notification, publishes it on a
//! broadcast channel for a toast collaborator, and forwards it to any extra
//! sinks. A send never fails; a slow or absent subscriber only misses
//! messages.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::{BackendError, FailureKind};
use crate::orchestrator::ActionKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub action: Option<ActionKind>,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        action: Option<ActionKind>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            action,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Additional destination for notifications.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification);
}

/// Level and message for a failed backend call.
///
/// HTTP 409 and explicit rejections warn with the backend's text, HTTP 400
/// is an error with the backend's text, anything else gets a generic error.
pub fn describe_failure(action: ActionKind, err: &BackendError) -> (NotificationLevel, String) {
    match (err.kind(), err) {
        (FailureKind::Operational, BackendError::Api { status: 400, message }) => {
            (NotificationLevel::Error, message.clone())
        }
        (FailureKind::Operational, BackendError::Api { message, .. })
        | (FailureKind::Operational, BackendError::Rejected(message)) => {
            (NotificationLevel::Warning, message.clone())
        }
        _ => (
            NotificationLevel::Error,
            format!("Failed to {} due to an unexpected error", action.verb()),
        ),
    }
}

pub struct Notifier {
    tx: broadcast::Sender<Notification>,
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn send(&self, notification: Notification) {
        let action = notification.action.map(|a| a.to_string()).unwrap_or_default();
        match notification.level {
            NotificationLevel::Success => {
                info!(action = %action, message = %notification.message, "notification")
            }
            NotificationLevel::Warning => {
                warn!(action = %action, message = %notification.message, "notification")
            }
            NotificationLevel::Error => {
                error!(action = %action, message = %notification.message, "notification")
            }
        }

        for sink in &self.sinks {
            sink.deliver(&notification);
        }
        // No subscribers is not an error.
        let _ = self.tx.send(notification);
    }

    pub fn notify(
        &self,
        level: NotificationLevel,
        action: Option<ActionKind>,
        message: impl Into<String>,
    ) -> Notification {
        let notification = Notification::new(level, action, message);
        self.send(notification.clone());
        notification
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}
