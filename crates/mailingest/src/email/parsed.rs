//! Structured form of a stored raw email.

use chrono::{DateTime, Utc};
use log::debug;
use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};
use serde::{Deserialize, Serialize};

use crate::sanitize::display_name_from_key;

use super::attachment::{AttachmentMetadata, Attachments};
use super::error::{EmailError, Result};

/// Location of a raw email object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawEmailRef {
    pub bucket: String,
    pub key: String,
}

impl RawEmailRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Slug of the last key segment, used to name quarantined copies.
    pub fn display_name(&self) -> String {
        display_name_from_key(&self.key)
    }
}

/// An attachment exactly as found in the message.
#[derive(Debug, Clone)]
pub struct RawAttachment {
    /// Declared filename, or a positional placeholder when the part has none.
    pub filename: String,
    pub content_type: String,
    pub payload: Vec<u8>,
}

/// A parsed email owned by one orchestration run.
#[derive(Debug, Clone)]
pub struct ParsedEmail {
    pub source: RawEmailRef,
    pub display_name: String,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    pub message_id: Option<String>,
    pub attachments: Vec<RawAttachment>,
}

impl ParsedEmail {
    /// Parses raw MIME bytes.
    pub fn parse(source: RawEmailRef, raw: &[u8]) -> Result<Self> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(EmailError::Empty { key: source.key });
        }

        let message = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| EmailError::ParseError("Failed to parse email message".to_string()))?;

        let received_at = match message.date() {
            Some(date) => Some(
                DateTime::<Utc>::from_timestamp(date.to_timestamp(), 0)
                    .ok_or_else(|| EmailError::InvalidDate(date.to_rfc3339()))?,
            ),
            None => None,
        };

        let attachments = collect_attachments(&message);

        debug!(
            "Parsed email key={} subject={:?} attachments={}",
            source.key,
            message.subject().unwrap_or("(no subject)"),
            attachments.len()
        );

        Ok(Self {
            display_name: source.display_name(),
            source,
            sender: first_address(message.from()),
            recipient: first_address(message.to()),
            received_at,
            subject: message.subject().map(str::to_string),
            message_id: message.message_id().map(str::to_string),
            attachments,
        })
    }

    /// Lazy single pass over the attachments, each stamped with metadata
    /// derived from this email.
    ///
    /// Fails before yielding anything when From, To or Date is missing.
    pub fn attachments(&self) -> Result<Attachments<'_>> {
        let sender = self
            .sender
            .as_deref()
            .ok_or(EmailError::MissingHeader("From"))?;
        let recipient = self
            .recipient
            .as_deref()
            .ok_or(EmailError::MissingHeader("To"))?;
        let received_at = self
            .received_at
            .as_ref()
            .ok_or(EmailError::MissingHeader("Date"))?;

        let metadata = AttachmentMetadata::derive(sender, recipient, received_at);
        if metadata.received_from().is_empty() {
            return Err(EmailError::MissingHeader("From"));
        }
        if metadata.sent_to().is_empty() {
            return Err(EmailError::MissingHeader("To"));
        }

        Ok(Attachments::new(&self.attachments, metadata))
    }
}

fn first_address(address: Option<&mail_parser::Address<'_>>) -> Option<String> {
    address
        .and_then(|a| a.first())
        .and_then(|a| a.address())
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
}

fn collect_attachments(message: &Message<'_>) -> Vec<RawAttachment> {
    let mut attachments = Vec::new();

    for part in message.parts.iter() {
        if !is_attachment(part) {
            continue;
        }

        let payload = match &part.body {
            PartType::Binary(data) | PartType::InlineBinary(data) => data.to_vec(),
            PartType::Text(text) => text.as_bytes().to_vec(),
            PartType::Html(html) => html.as_bytes().to_vec(),
            _ => {
                debug!("Skipping non-leaf attachment part");
                continue;
            }
        };

        let content_type = part
            .content_type()
            .map(|ct| match ct.subtype() {
                Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
                None => ct.ctype().to_string(),
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let filename = part
            .attachment_name()
            .or_else(|| part.content_type().and_then(|ct| ct.attribute("name")))
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("attachment-{}", attachments.len() + 1));

        attachments.push(RawAttachment {
            filename,
            content_type,
            payload,
        });
    }

    attachments
}

fn is_attachment(part: &MessagePart<'_>) -> bool {
    if let Some(disposition) = part.content_disposition() {
        if disposition.ctype().eq_ignore_ascii_case("attachment") {
            return true;
        }
    }

    if part.attachment_name().is_some() {
        return true;
    }

    // Non-text leaf parts without a disposition still carry files.
    match part.content_type() {
        Some(ct) => {
            let ctype = ct.ctype();
            ctype != "text"
                && ctype != "multipart"
                && ctype != "message"
                && ct.subtype().is_some()
        }
        None => false,
    }
}
