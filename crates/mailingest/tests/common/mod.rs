//! Shared test utilities for mailingest integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring an in-memory store, catalog and notifier
//! - Builders for MIME messages, workbooks and trigger events

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{TestHarness, BUCKET};
