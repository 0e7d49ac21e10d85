use serde::Serialize;

use crate::convert::FileKind;

use super::context::{EmailPhase, EmailRun};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum AttachmentDisposition {
    Curated {
        table: String,
        rows: usize,
        objects: Vec<String>,
    },
    AlreadyIngested {
        ingestion_key: String,
    },
    Quarantined {
        key: String,
    },
    Faulted {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentReport {
    pub index: usize,
    pub filename: String,
    pub logical_name: String,
    pub kind: FileKind,
    #[serde(flatten)]
    pub disposition: AttachmentDisposition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailReport {
    pub bucket: String,
    pub key: String,
    pub phase: EmailPhase,
    /// Set when the whole email was copied to quarantine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarantine_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attachments: Vec<AttachmentReport>,
}

impl From<EmailRun> for EmailReport {
    fn from(run: EmailRun) -> Self {
        Self {
            quarantine_key: run.disposition.quarantined_key().map(str::to_string),
            phase: run.phase(),
            bucket: run.source.bucket,
            key: run.source.key,
            error: run.error,
            attachments: run.attachments,
        }
    }
}

impl EmailReport {
    pub fn count(&self, matches: impl Fn(&AttachmentDisposition) -> bool) -> usize {
        self.attachments
            .iter()
            .filter(|a| matches(&a.disposition))
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub emails: Vec<EmailReport>,
}

impl BatchReport {
    pub fn fatal_count(&self) -> usize {
        self.emails
            .iter()
            .filter(|e| e.phase == EmailPhase::Fatal)
            .count()
    }

    pub fn curated_count(&self) -> usize {
        self.emails
            .iter()
            .map(|e| e.count(|d| matches!(d, AttachmentDisposition::Curated { .. })))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serialization_shape() {
        let report = BatchReport {
            emails: vec![EmailReport {
                bucket: "mail".into(),
                key: "raw/1".into(),
                phase: EmailPhase::Done,
                quarantine_key: None,
                error: None,
                attachments: vec![AttachmentReport {
                    index: 1,
                    filename: "b.exe".into(),
                    logical_name: "b-exe".into(),
                    kind: FileKind::Unsupported,
                    disposition: AttachmentDisposition::Quarantined {
                        key: "quarantine/attachment/1-b-exe".into(),
                    },
                }],
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        let email = &json["emails"][0];
        assert_eq!(email["phase"], "done");
        assert!(email.get("quarantine_key").is_none());
        assert_eq!(email["attachments"][0]["disposition"], "quarantined");
        assert_eq!(email["attachments"][0]["kind"], "unsupported");
        assert_eq!(
            email["attachments"][0]["key"],
            "quarantine/attachment/1-b-exe"
        );
        assert_eq!(report.curated_count(), 0);
        assert_eq!(report.fatal_count(), 0);
    }
}
