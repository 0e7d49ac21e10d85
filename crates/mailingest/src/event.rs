//! Inbound trigger payloads and the disposition returned to the mail
//! delivery collaborator.

use serde::{Deserialize, Serialize};

use crate::email::RawEmailRef;
use crate::error::EventError;

/// Envelope event raised before a message is stored.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMailEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<InboundMailRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMailRecord {
    #[serde(default)]
    pub ses: Option<SesPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SesPayload {
    #[serde(default)]
    pub mail: Option<SesMail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SesMail {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(rename = "messageId", default)]
    pub message_id: Option<String>,
}

impl InboundMailEvent {
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sender address of every record, in order.
    ///
    /// A record without `ses.mail.source` makes the whole event malformed.
    pub fn senders(&self) -> Result<Vec<&str>, EventError> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                record
                    .ses
                    .as_ref()
                    .and_then(|ses| ses.mail.as_ref())
                    .and_then(|mail| mail.source.as_deref())
                    .ok_or(EventError::MissingField {
                        index,
                        field: "ses.mail.source",
                    })
            })
            .collect()
    }
}

/// Storage-change notification listing newly written raw emails.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageRecord {
    #[serde(default)]
    pub s3: Option<S3Entity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
}

impl StorageEvent {
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decoded email references, one per record.
    pub fn email_refs(&self) -> Result<Vec<RawEmailRef>, EventError> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let s3 = record.s3.as_ref().ok_or(EventError::MissingField {
                    index,
                    field: "s3",
                })?;
                if s3.bucket.name.is_empty() {
                    return Err(EventError::MissingField {
                        index,
                        field: "s3.bucket.name",
                    });
                }
                Ok(RawEmailRef::new(
                    s3.bucket.name.clone(),
                    decode_object_key(&s3.object.key)?,
                ))
            })
            .collect()
    }
}

/// Decodes an object key as delivered in storage-change events.
///
/// Keys are form-encoded: `+` stands for a space and `%XX` escapes follow.
pub fn decode_object_key(raw: &str) -> Result<String, EventError> {
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).map_err(|e| EventError::KeyEncoding {
        key: raw.to_string(),
        reason: e.to_string(),
    })?;
    if decoded.is_empty() {
        return Err(EventError::KeyEncoding {
            key: raw.to_string(),
            reason: "key is empty".to_string(),
        });
    }
    Ok(decoded.into_owned())
}

/// Disposition value that stops the remaining delivery actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    #[serde(rename = "STOP_RULE_SET")]
    StopRuleSet,
}

/// Filter result: `null` lets delivery continue, otherwise
/// `{"disposition": "STOP_RULE_SET"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterResponse(pub Option<DispositionBody>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispositionBody {
    pub disposition: Disposition,
}

impl FilterResponse {
    pub fn proceed() -> Self {
        Self(None)
    }

    pub fn stop() -> Self {
        Self(Some(DispositionBody {
            disposition: Disposition::StopRuleSet,
        }))
    }

    pub fn is_stop(&self) -> bool {
        self.0.is_some()
    }
}
