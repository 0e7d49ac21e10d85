//! Curated and quarantine writers.

pub mod curated;
pub mod dataset;
pub mod idempotency;
pub mod quarantine;

pub use curated::{CurateOutcome, CuratedWriter};
pub use dataset::{decode_parquet, encode_parquet, read_dataset};
pub use idempotency::compute_ingestion_key;
pub use quarantine::{DispositionRecord, QuarantineOutcome, QuarantineWriter};
