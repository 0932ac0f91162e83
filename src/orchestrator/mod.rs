//! Extraction orchestration.
//!
//! Covers the single-query extraction session with its one-writer
//! "current session" slot, and the sequential multi-query aggregator.

pub mod aggregator;
pub mod session;
