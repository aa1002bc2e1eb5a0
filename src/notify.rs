//! System notifications
//!
//! A [`Notifier`] is the platform side of a notification: it knows its
//! permission and how to deliver one. [`NotificationCenter`] sits in front
//! of it and applies the client's policy: permission is requested once when
//! undecided, a denial is a normal `None` result, and missing icon/badge
//! fields get the configured default.
//!
//! [`TaskCompleteNotifier`] turns `task_complete` frames into notifications,
//! at most once per frame timestamp.

use std::collections::HashSet;
use std::io::Write;
use std::sync::{Arc, Mutex};

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::error::{CockpitError, Result};
use crate::protocol::{Frame, FramePayload};

/// Default body when a `task_complete` frame has no summary
pub const DEFAULT_TASK_COMPLETE_BODY: &str = "Claude has finished processing your request";

const TASK_COMPLETE_TITLE: &str = "Task Complete";
const TASK_COMPLETE_TAG: &str = "task-complete";

/// Button attached to a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// What to show
///
/// Field names follow the control-channel wire format (`requireInteraction`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub require_interaction: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
}

impl NotificationOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Fill missing icon and badge with `default_icon`
    pub fn with_default_icon(mut self, default_icon: &str) -> Self {
        if self.icon.is_none() {
            self.icon = Some(default_icon.to_string());
        }
        if self.badge.is_none() {
            self.badge = Some(default_icon.to_string());
        }
        self
    }
}

/// Permission state of a notifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// Not decided yet; asking may still grant it
    Default,
}

/// Platform notification backend
#[async_trait::async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Current permission without prompting
    fn permission(&self) -> NotificationPermission;

    /// Ask for permission; only called while the permission is `Default`
    async fn request_permission(&self) -> NotificationPermission;

    /// Show one notification
    ///
    /// # Errors
    ///
    /// Returns [`CockpitError::Notification`] if delivery fails.
    async fn deliver(&self, options: &NotificationOptions) -> Result<()>;
}

/// Notification policy in front of a [`Notifier`]
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    notifier: Arc<dyn Notifier>,
    enabled: bool,
    default_icon: String,
}

impl NotificationCenter {
    pub fn new(notifier: Arc<dyn Notifier>, enabled: bool, default_icon: impl Into<String>) -> Self {
        Self {
            notifier,
            enabled,
            default_icon: default_icon.into(),
        }
    }

    /// Resolve the permission, prompting once if undecided
    pub async fn request_permission(&self) -> NotificationPermission {
        match self.notifier.permission() {
            NotificationPermission::Default => self.notifier.request_permission().await,
            decided => decided,
        }
    }

    /// Whether notifications would currently be shown without prompting
    pub fn has_permission(&self) -> bool {
        self.enabled && self.notifier.permission() == NotificationPermission::Granted
    }

    /// Show a notification
    ///
    /// Returns the options as delivered, or `None` when notifications are
    /// disabled or permission is not granted.
    pub async fn show(&self, options: NotificationOptions) -> Result<Option<NotificationOptions>> {
        if !self.enabled {
            tracing::debug!(title = %options.title, "Notifications disabled");
            return Ok(None);
        }
        if self.request_permission().await != NotificationPermission::Granted {
            tracing::debug!(title = %options.title, "Notification permission not granted");
            return Ok(None);
        }

        let options = options.with_default_icon(&self.default_icon);
        self.notifier.deliver(&options).await?;
        tracing::info!(title = %options.title, tag = ?options.tag, "Notification shown");
        Ok(Some(options))
    }
}

/// Notifier that prints to the terminal's stderr with a bell
#[derive(Debug, Default)]
pub struct TerminalNotifier;

#[async_trait::async_trait]
impl Notifier for TerminalNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    async fn request_permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    async fn deliver(&self, options: &NotificationOptions) -> Result<()> {
        let mut line = format!("\x07{} {}", "●".green(), options.title.bold());
        if let Some(body) = &options.body {
            line.push_str(&format!(": {}", body));
        }
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "{}", line)
            .map_err(|e| CockpitError::Notification(format!("write failed: {}", e)))?;
        Ok(())
    }
}

/// Notifier that only logs, for headless use
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    async fn request_permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    async fn deliver(&self, options: &NotificationOptions) -> Result<()> {
        tracing::info!(
            title = %options.title,
            body = options.body.as_deref().unwrap_or_default(),
            "Notification"
        );
        Ok(())
    }
}

/// Turns `task_complete` frames into notifications, once per timestamp
///
/// Frames without a timestamp cannot be told apart and are always
/// notified; callers pass each received frame once.
#[derive(Debug, Default)]
pub struct TaskCompleteNotifier {
    notified: Mutex<HashSet<String>>,
}

impl TaskCompleteNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notification to show for `frame`, if any
    ///
    /// Returns `None` for other frame kinds and for any timestamp that was
    /// already notified.
    pub fn observe(&self, frame: &Frame) -> Option<NotificationOptions> {
        let FramePayload::TaskComplete { summary } = &frame.payload else {
            return None;
        };

        if let Some(timestamp) = &frame.timestamp {
            let mut notified = self
                .notified
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if !notified.insert(timestamp.clone()) {
                return None;
            }
        }

        let body = summary
            .clone()
            .unwrap_or_else(|| DEFAULT_TASK_COMPLETE_BODY.to_string());
        Some(
            NotificationOptions::new(TASK_COMPLETE_TITLE)
                .with_body(body)
                .with_tag(TASK_COMPLETE_TAG),
        )
    }
}

/// Notifier that records deliveries, for tests
#[cfg(test)]
#[derive(Debug)]
pub struct RecordingNotifier {
    pub permission: Mutex<NotificationPermission>,
    pub on_request: NotificationPermission,
    pub delivered: Mutex<Vec<NotificationOptions>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn with_permission(permission: NotificationPermission) -> Self {
        Self {
            permission: Mutex::new(permission),
            on_request: permission,
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn delivered(&self) -> Vec<NotificationOptions> {
        self.delivered.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn permission(&self) -> NotificationPermission {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> NotificationPermission {
        let mut permission = self.permission.lock().unwrap();
        *permission = self.on_request;
        *permission
    }

    async fn deliver(&self, options: &NotificationOptions) -> Result<()> {
        self.delivered.lock().unwrap().push(options.clone());
        Ok(())
    }
}
