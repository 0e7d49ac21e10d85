//! Per-email orchestration of loading, conversion, curation and quarantine.

pub mod context;
pub mod error;
pub mod report;
pub mod runner;

pub use context::{EmailPhase, EmailRun};
pub use error::PipelineError;
pub use report::{AttachmentDisposition, AttachmentReport, BatchReport, EmailReport};
pub use runner::Pipeline;
