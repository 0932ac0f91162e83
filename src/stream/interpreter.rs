//! Event interpreter: folds one [`StreamEvent`] into a [`SessionState`].
//!
//! Rules, in precedence order:
//!
//! 1. A staged event sets `stage` to its label.
//! 2. A numeric `progress` raises progress to that value.
//! 3. An `ollama` event with numeric progress raises progress to it (the
//!    model path's primary progress channel; overlaps rule 2).
//! 4. `rules_fallback` forces progress to 96.
//! 5. `done` with a task list forces progress to 100, records the mode and
//!    replaces the task list. Terminal.
//! 6. `error` sets the stage to `error`. Terminal.
//!
//! Progress writes are clamped to `[current, 100]`. Events arriving after a
//! terminal stage are ignored.

use crate::models::event::{EventKind, StreamEvent};
use crate::models::state::{SessionState, Stage, MAX_PROGRESS, RULES_FALLBACK_PROGRESS};

/// Apply `event` to `state` and return the next state.
#[must_use]
pub fn apply_event(mut state: SessionState, event: StreamEvent) -> SessionState {
    if state.is_terminal() {
        return state;
    }

    if let Some(label) = event.stage_label() {
        state.stage = Stage::from_wire(label);
    }

    if let Some(progress) = event.progress {
        state.raise_progress(progress);
    }

    match event.kind {
        EventKind::Ollama { .. } => {
            // TODO: overlaps the generic progress rule above; remove once
            // the backend event shapes are reviewed.
            if let Some(progress) = event.progress {
                state.raise_progress(progress);
            }
        }
        EventKind::RulesFallback => {
            state.raise_progress(f64::from(RULES_FALLBACK_PROGRESS));
        }
        EventKind::Done { mode, tasks } => {
            if let Some(tasks) = tasks {
                state.raise_progress(f64::from(MAX_PROGRESS));
                state.mode = mode;
                state.tasks = tasks;
            }
            state.finish(Stage::Done);
        }
        EventKind::Error { message } => {
            state.error = message;
            state.finish(Stage::Error);
        }
        EventKind::Retrieving
        | EventKind::Parsing
        | EventKind::Unknown { .. }
        | EventKind::Unstaged => {}
    }

    state
}

/// Fold a sequence of events into `state`.
#[must_use]
pub fn apply_all<I>(state: SessionState, events: I) -> SessionState
where
    I: IntoIterator<Item = StreamEvent>,
{
    events.into_iter().fold(state, apply_event)
}
