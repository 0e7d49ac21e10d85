//! Attachment records stamped with metadata from their parent email.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::sanitize::{partition_date, received_date_string, slugify};
use crate::storage::ObjectMetadata;

use super::parsed::RawAttachment;

/// Metadata shared by every attachment of one email.
///
/// Derived once at extraction time; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentMetadata {
    received_from: String,
    sent_to: String,
    received_date: String,
    raw_sender: String,
}

impl AttachmentMetadata {
    pub fn derive(sender: &str, recipient: &str, received_at: &DateTime<Utc>) -> Self {
        Self {
            received_from: slugify(sender),
            sent_to: slugify(recipient),
            received_date: received_date_string(received_at),
            raw_sender: sender.to_string(),
        }
    }

    /// Sender in slug form.
    pub fn received_from(&self) -> &str {
        &self.received_from
    }

    /// Recipient in slug form.
    pub fn sent_to(&self) -> &str {
        &self.sent_to
    }

    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub fn received_date(&self) -> &str {
        &self.received_date
    }

    /// Sender address as it appeared in the From header.
    pub fn raw_sender(&self) -> &str {
        &self.raw_sender
    }

    /// `YYYYMMDD` partition value.
    pub fn partition_date(&self) -> String {
        partition_date(&self.received_date)
    }

    pub fn to_object_metadata(&self) -> ObjectMetadata {
        ObjectMetadata::from([
            ("received_from".to_string(), self.received_from.clone()),
            ("sent_to".to_string(), self.sent_to.clone()),
            ("received_date".to_string(), self.received_date.clone()),
        ])
    }
}

/// One attachment, borrowing its payload from the parsed email.
#[derive(Debug, Clone)]
pub struct Attachment<'e> {
    pub index: usize,
    pub filename: &'e str,
    pub content_type: &'e str,
    pub payload: &'e [u8],
    /// Lower-cased text after the last `.`, empty when there is none.
    pub extension: String,
    /// Slug of the filename, used in storage paths and table names.
    pub logical_name: String,
    metadata: AttachmentMetadata,
}

impl<'e> Attachment<'e> {
    fn new(index: usize, raw: &'e RawAttachment, metadata: AttachmentMetadata) -> Self {
        let logical_name = match slugify(&raw.filename) {
            slug if slug.is_empty() => format!("attachment-{}", index + 1),
            slug => slug,
        };

        Self {
            index,
            filename: &raw.filename,
            content_type: &raw.content_type,
            payload: &raw.payload,
            extension: extension_of(&raw.filename),
            logical_name,
            metadata,
        }
    }

    pub fn metadata(&self) -> &AttachmentMetadata {
        &self.metadata
    }
}

/// Lower-cased extension of `filename`, or an empty string.
pub fn extension_of(filename: &str) -> String {
    match filename.trim().rsplit_once('.') {
        Some((_, ext)) => ext.trim().to_lowercase(),
        None => String::new(),
    }
}

/// Single-pass iterator over the attachments of a parsed email.
pub struct Attachments<'e> {
    raw: std::iter::Enumerate<std::slice::Iter<'e, RawAttachment>>,
    metadata: AttachmentMetadata,
}

impl<'e> Attachments<'e> {
    pub(crate) fn new(raw: &'e [RawAttachment], metadata: AttachmentMetadata) -> Self {
        Self {
            raw: raw.iter().enumerate(),
            metadata,
        }
    }

    pub fn metadata(&self) -> &AttachmentMetadata {
        &self.metadata
    }
}

impl<'e> Iterator for Attachments<'e> {
    type Item = Attachment<'e>;

    fn next(&mut self) -> Option<Self::Item> {
        self.raw
            .next()
            .map(|(index, raw)| Attachment::new(index, raw, self.metadata.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}
