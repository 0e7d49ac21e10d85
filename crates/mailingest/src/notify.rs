//! Operator notifications.

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// Sender not on the allow-list.
    EmailSourceRejected,
    /// The invocation itself could not run (bad event, unreadable config).
    FailLambdaRun,
    /// Something was quarantined and needs a human decision.
    ToBeDefined,
    /// An attachment failed conversion or curation.
    AttachmentFault,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::EmailSourceRejected => "email_source_rejected",
            NotificationCategory::FailLambdaRun => "fail_lambda_run",
            NotificationCategory::ToBeDefined => "to_be_defined",
            NotificationCategory::AttachmentFault => "attachment_fault",
        }
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub timestamp: DateTime<Utc>,
    pub category: NotificationCategory,
    pub message: String,
    /// Object key of the email or attachment concerned, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_key: Option<String>,
}

impl Notification {
    pub fn new(category: NotificationCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            message: message.into(),
            subject_key: None,
        }
    }

    pub fn with_subject(mut self, key: impl Into<String>) -> Self {
        self.subject_key = Some(key.into());
        self
    }
}

/// Publishes notifications to whoever watches the pipeline.
///
/// Publishing is fire-and-forget: a notifier that cannot deliver must not
/// fail the processing that raised the notification.
pub trait Notifier: Send + Sync {
    fn publish(&self, notification: Notification);
}

/// Emits each notification as an error-level structured event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn publish(&self, notification: Notification) {
        error!(
            category = %notification.category,
            subject = notification.subject_key.as_deref().unwrap_or(""),
            "{}",
            notification.message
        );
    }
}

/// Forwards notifications into a channel.
#[derive(Clone)]
pub struct ChannelNotifier {
    sender: Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, Receiver<Notification>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn publish(&self, notification: Notification) {
        // No receiver left is fine
        let _ = self.sender.send(notification);
    }
}
