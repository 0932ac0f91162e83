//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all client failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Transport could not be established or broke mid-request.
    Http(String),
    /// Backend answered with a non-success status.
    ///
    /// `detail` holds the structured `detail` field of the error body,
    /// falling back to the raw body, falling back to an empty object.
    Backend {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Structured error detail surfaced to the notification sink.
        detail: serde_json::Value,
    },
    /// Frame-level stream failure (oversize frame, invalid UTF-8).
    Stream(String),
    /// Local pre-submission guard rejected the input.
    Validation(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl AppError {
    /// Structured detail suitable for the notification sink.
    ///
    /// Backend failures expose their decoded detail object; every other
    /// variant is rendered as a JSON string of its display form.
    #[must_use]
    pub fn detail(&self) -> serde_json::Value {
        match self {
            Self::Backend { detail, .. } => detail.clone(),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
            Self::Backend { status, detail } => write!(f, "backend: status {status}: {detail}"),
            Self::Stream(msg) => write!(f, "stream: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Io(format!("json: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
