use serde::Serialize;
use tracing::{error, info};

use crate::config::{IngestSettings, PROJECT_TAG_KEY, PROJECT_TAG_VALUE};
use crate::email::{Attachment, ParsedEmail, RawEmailRef};
use crate::error::StorageError;
use crate::notify::{Notification, NotificationCategory, Notifier};
use crate::storage::{tag_when_visible, ObjectStore, Tag};

/// Whether an email has already been copied to quarantine during its run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispositionRecord {
    quarantined_key: Option<String>,
}

impl DispositionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_quarantined(&self) -> bool {
        self.quarantined_key.is_some()
    }

    pub fn quarantined_key(&self) -> Option<&str> {
        self.quarantined_key.as_deref()
    }

    pub(crate) fn mark(&mut self, key: String) {
        self.quarantined_key = Some(key);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuarantineOutcome {
    Quarantined { key: String },
    AlreadyQuarantined,
}

/// Moves emails and attachments that cannot be curated into the holding
/// area and tells an operator about it.
pub struct QuarantineWriter<'a> {
    settings: &'a IngestSettings,
    store: &'a dyn ObjectStore,
    notifier: &'a dyn Notifier,
}

impl<'a> QuarantineWriter<'a> {
    pub fn new(
        settings: &'a IngestSettings,
        store: &'a dyn ObjectStore,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            settings,
            store,
            notifier,
        }
    }

    /// `{quarantine_prefix}/emails/{email_name}`
    pub fn email_key(&self, source: &RawEmailRef) -> String {
        format!(
            "{}/emails/{}",
            self.settings.quarantine_prefix,
            source.display_name()
        )
    }

    /// `{quarantine_prefix}/attachment/{email_name}-{logical_name}`
    pub fn attachment_key(&self, email: &ParsedEmail, attachment: &Attachment<'_>) -> String {
        format!(
            "{}/attachment/{}-{}",
            self.settings.quarantine_prefix, email.display_name, attachment.logical_name
        )
    }

    /// Copies the raw email into quarantine at most once per record.
    ///
    /// The record is only marked after the copy and tag both succeed.
    pub fn quarantine_email(
        &self,
        source: &RawEmailRef,
        record: &mut DispositionRecord,
        reason: &str,
    ) -> Result<QuarantineOutcome, StorageError> {
        if record.is_quarantined() {
            return Ok(QuarantineOutcome::AlreadyQuarantined);
        }

        let key = self.email_key(source);
        self.store
            .copy(&source.bucket, &source.key, &key)
            .and_then(|()| self.tag(&source.bucket, &key))
            .inspect_err(|e| error!(key = %key, error = %e, "email quarantine failed"))?;

        info!(key = %key, reason, "email quarantined");
        self.notifier.publish(
            Notification::new(
                NotificationCategory::ToBeDefined,
                format!("Email {} quarantined: {}", source.key, reason),
            )
            .with_subject(key.clone()),
        );

        record.mark(key.clone());
        Ok(QuarantineOutcome::Quarantined { key })
    }

    /// Stores one attachment's payload in quarantine and returns its key.
    ///
    /// Attachments carry no record; a repeat overwrites the same key.
    pub fn quarantine_attachment(
        &self,
        email: &ParsedEmail,
        attachment: &Attachment<'_>,
        reason: &str,
    ) -> Result<String, StorageError> {
        let key = self.attachment_key(email, attachment);
        let bucket = email.source.bucket.as_str();

        self.store
            .put(
                bucket,
                &key,
                attachment.payload,
                &attachment.metadata().to_object_metadata(),
            )
            .and_then(|()| self.tag(bucket, &key))
            .inspect_err(|e| error!(key = %key, error = %e, "attachment quarantine failed"))?;

        info!(key = %key, reason, "attachment quarantined");
        self.notifier.publish(
            Notification::new(
                NotificationCategory::ToBeDefined,
                format!(
                    "Attachment {} of {} quarantined: {}",
                    attachment.filename, email.source.key, reason
                ),
            )
            .with_subject(key.clone()),
        );

        Ok(key)
    }

    fn tag(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        tag_when_visible(
            self.store,
            bucket,
            key,
            &[Tag::new(PROJECT_TAG_KEY, PROJECT_TAG_VALUE)],
            &self.settings.settle,
        )
    }
}
