//! Derived extraction state shown to the renderer.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::models::event::ResultMode;
use crate::models::task::Task;

/// Progress shown immediately after a session is submitted.
pub const STARTING_PROGRESS: u8 = 5;

/// Progress forced by a `rules_fallback` event.
pub const RULES_FALLBACK_PROGRESS: u8 = 96;

/// Upper bound of the progress estimate.
pub const MAX_PROGRESS: u8 = 100;

/// Phase label of an extraction session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Stage {
    /// No session has run yet.
    Idle,
    /// Request submitted; stream not yet readable.
    Starting,
    /// Backend retrieving transcript chunks.
    Retrieving,
    /// Model-based extraction running.
    Ollama,
    /// Backend parsing model output.
    Parsing,
    /// Deterministic fallback in use.
    RulesFallback,
    /// Extraction finished (terminal).
    Done,
    /// Transport or backend error (terminal).
    Error,
    /// Cancelled by the caller (terminal).
    Aborted,
    /// Opaque stage label reported by a newer backend.
    Other(String),
}

impl Stage {
    /// Map a wire stage label onto a [`Stage`].
    ///
    /// Only labels the backend actually emits are recognised; client-side
    /// phases (`idle`, `starting`, `aborted`) arriving over the wire stay
    /// opaque.
    #[must_use]
    pub fn from_wire(label: &str) -> Self {
        match label {
            "retrieving" => Self::Retrieving,
            "ollama" => Self::Ollama,
            "parsing" => Self::Parsing,
            "rules_fallback" => Self::RulesFallback,
            "done" => Self::Done,
            "error" => Self::Error,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Display label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Retrieving => "retrieving",
            Self::Ollama => "ollama",
            Self::Parsing => "parsing",
            Self::RulesFallback => "rules_fallback",
            Self::Done => "done",
            Self::Error => "error",
            Self::Aborted => "aborted",
            Self::Other(label) => label,
        }
    }

    /// Whether no further stream events may be applied.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Aborted)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.as_str().to_owned()
    }
}

/// Visible state of the current extraction.
///
/// Invariants: `progress` never exceeds [`MAX_PROGRESS`] and never decreases
/// within a session; once `stage` is terminal the state is frozen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    /// Current phase label.
    pub stage: Stage,
    /// Progress estimate, 0–100.
    pub progress: u8,
    /// Strategy that produced `tasks`, once known.
    pub mode: Option<ResultMode>,
    /// Current task list.
    pub tasks: Vec<Task>,
    /// Whether a transport is live for this state.
    pub active: bool,
    /// Last error message reported by the backend.
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::idle()
    }
}

impl SessionState {
    /// State before any session has run.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            stage: Stage::Idle,
            progress: 0,
            mode: None,
            tasks: Vec::new(),
            active: false,
            error: None,
        }
    }

    /// Hard reset applied synchronously when a session is submitted.
    #[must_use]
    pub fn starting() -> Self {
        Self {
            stage: Stage::Starting,
            progress: STARTING_PROGRESS,
            active: true,
            ..Self::idle()
        }
    }

    /// Whether this state accepts no further events.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Raise progress toward `value`, clamped to `[current, 100]`.
    pub fn raise_progress(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let clamped = value.round().clamp(0.0, f64::from(MAX_PROGRESS));
        // clamped is an integer in 0..=100, so the cast is lossless.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let next = clamped as u8;
        self.progress = self.progress.max(next);
    }

    /// Move to a terminal stage and release the transport flag.
    pub fn finish(&mut self, stage: Stage) {
        self.stage = stage;
        self.active = false;
    }
}
