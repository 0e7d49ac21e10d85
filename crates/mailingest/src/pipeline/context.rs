use serde::Serialize;
use tracing::{debug, warn};

use crate::email::RawEmailRef;
use crate::writer::DispositionRecord;

use super::report::AttachmentReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailPhase {
    Pending,
    Loaded,
    Extracting,
    Curating,
    Quarantining,
    Done,
    /// Absorbing failure state.
    Fatal,
}

impl EmailPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EmailPhase::Done | EmailPhase::Fatal)
    }

    pub fn allows(&self, next: EmailPhase) -> bool {
        use EmailPhase::*;
        matches!(
            (self, next),
            (Pending, Loaded)
                | (Pending, Quarantining)
                | (Loaded, Extracting)
                | (Loaded, Quarantining)
                | (Extracting, Curating)
                | (Extracting, Quarantining)
                | (Extracting, Done)
                | (Curating, Extracting)
                | (Quarantining, Extracting)
                | (_, Fatal)
        ) && !matches!(self, Fatal)
    }
}

/// Mutable state of one email's trip through the pipeline.
#[derive(Debug)]
pub struct EmailRun {
    pub source: RawEmailRef,
    phase: EmailPhase,
    pub disposition: DispositionRecord,
    pub attachments: Vec<AttachmentReport>,
    pub error: Option<String>,
}

impl EmailRun {
    pub fn new(source: RawEmailRef) -> Self {
        Self {
            source,
            phase: EmailPhase::Pending,
            disposition: DispositionRecord::new(),
            attachments: Vec::new(),
            error: None,
        }
    }

    pub fn phase(&self) -> EmailPhase {
        self.phase
    }

    pub fn transition(&mut self, next: EmailPhase) {
        if self.phase == next {
            return;
        }
        if !self.phase.allows(next) {
            warn!(from = ?self.phase, to = ?next, "unexpected phase transition");
        }
        debug!(from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }

    /// Prepares a finished run for another attempt. The disposition record
    /// is kept so a retry never quarantines the email twice.
    pub fn restart(&mut self) {
        self.phase = EmailPhase::Pending;
        self.attachments.clear();
        self.error = None;
    }
}
