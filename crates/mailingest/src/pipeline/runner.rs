use std::sync::Arc;

use tracing::{error, field, info, info_span};

use crate::catalog::Catalog;
use crate::config::{load_settings, Environment, IngestSettings};
use crate::convert::{ConversionOutcome, Converter};
use crate::email::{Attachment, EmailLoader, ParsedEmail, RawEmailRef};
use crate::error::IngestError;
use crate::event::StorageEvent;
use crate::notify::{Notification, NotificationCategory, Notifier};
use crate::sanitize::redact_address;
use crate::storage::ObjectStore;
use crate::writer::{CurateOutcome, CuratedWriter, QuarantineWriter};

use super::context::{EmailPhase, EmailRun};
use super::error::PipelineError;
use super::report::{AttachmentDisposition, AttachmentReport, BatchReport, EmailReport};

/// Runs stored emails through loading, conversion and curation.
pub struct Pipeline {
    settings: Arc<IngestSettings>,
    store: Arc<dyn ObjectStore>,
    catalog: Arc<dyn Catalog>,
    notifier: Arc<dyn Notifier>,
}

impl Pipeline {
    pub fn new(
        settings: Arc<IngestSettings>,
        store: Arc<dyn ObjectStore>,
        catalog: Arc<dyn Catalog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            store,
            catalog,
            notifier,
        }
    }

    /// Handles one storage-change event end to end.
    ///
    /// A malformed event or unloadable configuration publishes a single
    /// `fail_lambda_run` notification and returns the error; no email is
    /// touched in that case.
    pub fn process_event(
        event_json: &str,
        env: &Environment,
        store: Arc<dyn ObjectStore>,
        catalog: Arc<dyn Catalog>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<BatchReport, IngestError> {
        let prepared = StorageEvent::from_json(event_json)
            .and_then(|event| event.email_refs())
            .map_err(IngestError::from)
            .and_then(|refs| {
                let settings = load_settings(store.as_ref(), env)?;
                Ok((refs, settings))
            });

        let (refs, settings) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                error!(error = %e, "invocation aborted");
                notifier.publish(Notification::new(
                    NotificationCategory::FailLambdaRun,
                    format!("Email ingestion run failed: {}", e),
                ));
                return Err(e);
            }
        };

        let pipeline = Self::new(Arc::new(settings), store, catalog, notifier);
        Ok(pipeline.run_batch(&refs))
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Processes emails one after another. A failing email never stops the
    /// ones after it.
    pub fn run_batch(&self, sources: &[RawEmailRef]) -> BatchReport {
        let _batch = info_span!("batch", emails = sources.len()).entered();

        let emails: Vec<EmailReport> = sources.iter().map(|s| self.run_email(s)).collect();

        let report = BatchReport { emails };
        info!(
            emails = report.emails.len(),
            curated = report.curated_count(),
            fatal = report.fatal_count(),
            "batch finished"
        );
        report
    }

    pub fn run_email(&self, source: &RawEmailRef) -> EmailReport {
        let mut run = EmailRun::new(source.clone());
        self.run(&mut run);
        run.into()
    }

    /// Drives `run` to a terminal phase. A run that already finished is
    /// restarted, keeping its disposition record.
    pub fn run(&self, run: &mut EmailRun) {
        if run.phase().is_terminal() {
            run.restart();
        }

        let span = info_span!(
            "email",
            bucket = %run.source.bucket,
            key = %run.source.key,
            sender = field::Empty
        );
        let _email = span.enter();

        // Step 1: load
        let email = {
            let _step = info_span!("load").entered();
            match EmailLoader::new(self.store.as_ref()).load(&run.source) {
                Ok(email) => email,
                Err(e) => {
                    self.abandon(run, PipelineError::Load(e));
                    return;
                }
            }
        };
        if let Some(sender) = email.sender.as_deref() {
            span.record("sender", field::display(redact_address(sender)));
        }
        run.transition(EmailPhase::Loaded);

        // Step 2: extract
        let attachments = {
            let _step = info_span!("extract").entered();
            match email.attachments() {
                Ok(attachments) => attachments,
                Err(e) => {
                    self.abandon(run, PipelineError::Extract(e));
                    return;
                }
            }
        };
        run.transition(EmailPhase::Extracting);

        // Step 3: per attachment
        for attachment in attachments {
            let _step = info_span!(
                "attachment",
                index = attachment.index,
                filename = %attachment.filename
            )
            .entered();
            let report = self.process_attachment(run, &email, &attachment);
            run.attachments.push(report);
            run.transition(EmailPhase::Extracting);
        }

        run.transition(EmailPhase::Done);
        info!(attachments = run.attachments.len(), "email processed");
    }

    fn process_attachment(
        &self,
        run: &mut EmailRun,
        email: &ParsedEmail,
        attachment: &Attachment<'_>,
    ) -> AttachmentReport {
        let converter = Converter::new(&self.settings.supported_extensions);
        let kind = converter.classify(attachment);

        let disposition = match converter.convert(attachment) {
            ConversionOutcome::Converted(table) => {
                run.transition(EmailPhase::Curating);
                let writer =
                    CuratedWriter::new(&self.settings, self.store.as_ref(), self.catalog.as_ref());
                match writer.curate(email, attachment, &table) {
                    Ok(CurateOutcome::Curated {
                        table,
                        rows,
                        objects,
                        ..
                    }) => AttachmentDisposition::Curated {
                        table,
                        rows,
                        objects,
                    },
                    Ok(CurateOutcome::AlreadyIngested { ingestion_key }) => {
                        AttachmentDisposition::AlreadyIngested { ingestion_key }
                    }
                    Err(e) => self.attachment_fault(email, attachment, e.to_string()),
                }
            }
            ConversionOutcome::Unsupported { extension } => {
                run.transition(EmailPhase::Quarantining);
                let reason = format!("unsupported extension '{}'", extension);
                match self.quarantine().quarantine_attachment(email, attachment, &reason) {
                    Ok(key) => AttachmentDisposition::Quarantined { key },
                    Err(e) => self.attachment_fault(email, attachment, e.to_string()),
                }
            }
            ConversionOutcome::Faulted(e) => self.attachment_fault(email, attachment, e.to_string()),
        };

        AttachmentReport {
            index: attachment.index,
            filename: attachment.filename.to_string(),
            logical_name: attachment.logical_name.clone(),
            kind,
            disposition,
        }
    }

    fn attachment_fault(
        &self,
        email: &ParsedEmail,
        attachment: &Attachment<'_>,
        error: String,
    ) -> AttachmentDisposition {
        error!(error = %error, "attachment fault");
        self.notifier.publish(
            Notification::new(
                NotificationCategory::AttachmentFault,
                format!(
                    "Attachment {} of {} failed: {}",
                    attachment.filename, email.source.key, error
                ),
            )
            .with_subject(email.source.key.clone()),
        );
        AttachmentDisposition::Faulted { error }
    }

    /// Quarantines the whole email and ends its run.
    fn abandon(&self, run: &mut EmailRun, cause: PipelineError) {
        error!(error = %cause, "email abandoned");
        run.transition(EmailPhase::Quarantining);

        let reason = cause.to_string();
        let message = match self
            .quarantine()
            .quarantine_email(&run.source, &mut run.disposition, &reason)
        {
            Ok(_) => reason,
            Err(e) => format!("{}; {}", reason, PipelineError::Quarantine(e)),
        };

        run.error = Some(message);
        run.transition(EmailPhase::Fatal);
    }

    fn quarantine(&self) -> QuarantineWriter<'_> {
        QuarantineWriter::new(&self.settings, self.store.as_ref(), self.notifier.as_ref())
    }
}
