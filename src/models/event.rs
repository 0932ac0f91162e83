//! Typed protocol events carried by the extraction stream.
//!
//! Each `data:` record on the wire is a JSON object with an optional
//! `stage` discriminator. Known stages map to dedicated [`EventKind`]
//! variants; any other stage is preserved as [`EventKind::Unknown`] so
//! newer backends never break older clients.
//!
//! | `stage`          | Variant                      |
//! |------------------|------------------------------|
//! | `retrieving`     | [`EventKind::Retrieving`]    |
//! | `ollama`         | [`EventKind::Ollama`]        |
//! | `parsing`        | [`EventKind::Parsing`]       |
//! | `rules_fallback` | [`EventKind::RulesFallback`] |
//! | `done`           | [`EventKind::Done`]          |
//! | `error`          | [`EventKind::Error`]         |
//! | *(other)*        | [`EventKind::Unknown`]       |
//! | *(absent)*       | [`EventKind::Unstaged`]      |

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::task::Task;
use crate::{AppError, Result};

/// Backend strategy that produced the final task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultMode {
    /// Model-based extraction.
    Ollama,
    /// Deterministic rule-based fallback.
    Rules,
    /// Mode label this client does not know about.
    Other(String),
}

impl ResultMode {
    /// Wire label for this mode.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ollama => "ollama",
            Self::Rules => "rules",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for ResultMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ollama" => Self::Ollama,
            "rules" => Self::Rules,
            _ => Self::Other(value),
        }
    }
}

impl From<ResultMode> for String {
    fn from(mode: ResultMode) -> Self {
        mode.as_str().to_owned()
    }
}

impl Display for ResultMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage-specific payload of a [`StreamEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Backend is retrieving transcript chunks.
    Retrieving,
    /// Model-based extraction in progress.
    Ollama {
        /// Number of chunks fed to the model, when reported.
        chunks: Option<u64>,
    },
    /// Backend is parsing model output.
    Parsing,
    /// Primary model unavailable; deterministic fallback in use.
    RulesFallback,
    /// Extraction finished.
    Done {
        /// Strategy that produced `tasks`.
        mode: Option<ResultMode>,
        /// Final task list; `None` when the record carried no `tasks` key.
        tasks: Option<Vec<Task>>,
    },
    /// Backend-signaled logical error.
    Error {
        /// Human-readable failure message.
        message: Option<String>,
    },
    /// Stage label not known to this client.
    Unknown {
        /// Raw stage label, kept for display.
        stage: String,
    },
    /// Record without a `stage` field.
    Unstaged,
}

/// One decoded protocol event.
///
/// `progress` lives outside [`EventKind`] because any stage may carry it.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    /// Stage discriminator and its payload.
    pub kind: EventKind,
    /// Raw progress value (0–100) when the record carried a numeric one.
    pub progress: Option<f64>,
}

impl StreamEvent {
    /// Event with the given kind and no progress.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            progress: None,
        }
    }

    /// Attach a progress value.
    #[must_use]
    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Wire stage label, if the record carried one.
    #[must_use]
    pub fn stage_label(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Retrieving => Some("retrieving"),
            EventKind::Ollama { .. } => Some("ollama"),
            EventKind::Parsing => Some("parsing"),
            EventKind::RulesFallback => Some("rules_fallback"),
            EventKind::Done { .. } => Some("done"),
            EventKind::Error { .. } => Some("error"),
            EventKind::Unknown { stage } => Some(stage),
            EventKind::Unstaged => None,
        }
    }

    /// Decode a JSON record into an event.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Stream` when the payload is not a JSON object or a
    /// known stage carries a field of the wrong shape.
    pub fn from_json(payload: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| AppError::Stream(format!("malformed json: {e}")))?;
        Self::from_value(value)
    }

    /// Decode an already-parsed JSON value into an event.
    ///
    /// # Errors
    ///
    /// See [`StreamEvent::from_json`].
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut record) = value else {
            return Err(AppError::Stream("event record is not an object".into()));
        };

        let progress = record.get("progress").and_then(Value::as_f64);

        let stage = match record.remove("stage") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };

        let kind = match stage.as_deref() {
            None => EventKind::Unstaged,
            Some("retrieving") => EventKind::Retrieving,
            Some("ollama") => EventKind::Ollama {
                chunks: record.get("chunks").and_then(Value::as_u64),
            },
            Some("parsing") => EventKind::Parsing,
            Some("rules_fallback") => EventKind::RulesFallback,
            Some("done") => EventKind::Done {
                mode: record
                    .remove("mode")
                    .and_then(|m| m.as_str().map(|s| ResultMode::from(s.to_owned()))),
                tasks: decode_tasks(record.remove("tasks"))?,
            },
            Some("error") => EventKind::Error {
                message: record
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            },
            Some(other) => EventKind::Unknown {
                stage: other.to_owned(),
            },
        };

        Ok(Self { kind, progress })
    }
}

/// `tasks` absent → `None`; `null` → empty list; array → decoded tasks.
fn decode_tasks(raw: Option<Value>) -> Result<Option<Vec<Task>>> {
    match raw {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(Vec::new())),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| AppError::Stream(format!("invalid tasks payload: {e}"))),
    }
}
