//! Raw email loading and attachment extraction.
//!
//! Raw messages are fetched from object storage and parsed with
//! `mail-parser`. Attachments are exposed through a lazy iterator that stamps
//! each one with metadata derived from the parent email.

pub mod attachment;
pub mod error;
pub mod loader;
pub mod parsed;

pub use attachment::{extension_of, Attachment, AttachmentMetadata, Attachments};
pub use error::EmailError;
pub use loader::EmailLoader;
pub use parsed::{ParsedEmail, RawAttachment, RawEmailRef};
