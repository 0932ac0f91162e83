#![forbid(unsafe_code)]

//! Streaming client that turns meeting transcripts into engineering tasks.
//!
//! Opens a long-lived event stream from the extraction backend, decodes
//! framed records independent of chunk boundaries, folds them into a
//! progress state machine, and submits the resulting tasks as tracker
//! issues.

pub mod backend;
pub mod config;
pub mod errors;
pub mod issues;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod recent;
pub mod stream;
pub mod upload;

pub use config::ClientConfig;
pub use errors::{AppError, Result};
