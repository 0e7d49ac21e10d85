use thiserror::Error;

use crate::email::EmailError;
use crate::error::StorageError;

/// Faults that end an email's run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Loading failed: {0}")]
    Load(#[source] EmailError),

    #[error("Attachment extraction failed: {0}")]
    Extract(#[source] EmailError),

    #[error("Quarantine failed: {0}")]
    Quarantine(#[from] StorageError),
}
