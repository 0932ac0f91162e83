//! Extraction session lifecycle: start, stream, cancel.
//!
//! An [`ExtractionSession`] owns the visible [`SessionState`] and a single
//! "current session" slot. Starting an extraction takes over the slot and
//! cancels whatever held it before, so two live streams never write to the
//! same state. Every write is checked against the slot under its lock, which
//! makes cancellation and takeover atomic with respect to state updates.
//!
//! ```text
//! idle → starting → {retrieving | ollama | parsing | rules_fallback}* → {done | error | aborted}
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::json;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backend::{ExtractRequest, TaskBackend};
use crate::models::event::ResultMode;
use crate::models::state::{SessionState, Stage};
use crate::notify::Notifier;
use crate::stream::reader::run_reader;
use crate::Result;

/// Owner of the current-session slot.
#[derive(Debug, Default)]
struct Slot {
    /// Incremented on every takeover.
    generation: u64,
    /// Cancellation handle of the live session, if any.
    cancel: Option<CancellationToken>,
}

impl Slot {
    fn owns(&self, generation: u64) -> bool {
        self.generation == generation
            && self
                .cancel
                .as_ref()
                .is_some_and(|token| !token.is_cancelled())
    }
}

/// Streaming extraction client with a single visible state.
pub struct ExtractionSession {
    backend: Arc<dyn TaskBackend>,
    notifier: Arc<dyn Notifier>,
    state_tx: watch::Sender<SessionState>,
    slot: Mutex<Slot>,
}

impl ExtractionSession {
    /// Create an idle session bound to `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn TaskBackend>, notifier: Arc<dyn Notifier>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::idle());
        Self {
            backend,
            notifier,
            state_tx,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Subscribe to visible state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the visible state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Whether a session currently holds the slot.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock_slot()
            .cancel
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Cancel the live session, if any, and mark the visible state `aborted`.
    ///
    /// Returns `true` when a live session was cancelled. No frame from the
    /// cancelled transport is applied afterwards.
    pub fn cancel(&self) -> bool {
        let mut slot = self.lock_slot();
        let Some(token) = slot.cancel.take() else {
            return false;
        };
        token.cancel();
        self.state_tx.send_modify(|state| {
            if !state.is_terminal() {
                state.finish(Stage::Aborted);
            }
        });
        info!(generation = slot.generation, "extraction cancelled");
        true
    }

    /// Run one extraction end-to-end and return its final state.
    ///
    /// Any live session is cancelled first. The visible state is reset to
    /// `starting` before the request is sent.
    ///
    /// # Errors
    ///
    /// Returns the transport error when the stream cannot be opened; the
    /// visible state moves to `error` and the failure detail is sent to the
    /// notifier. Backend `error` events and cancellation are not errors:
    /// they are reported through the returned state.
    pub async fn extract(&self, request: &ExtractRequest) -> Result<SessionState> {
        self.run(request).await.1
    }

    /// [`extract`](Self::extract), also returning the slot generation used.
    pub(crate) async fn run(&self, request: &ExtractRequest) -> (u64, Result<SessionState>) {
        let session_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "extraction",
            session_id = %session_id,
            meeting_id = %request.meeting_id,
            query = %request.q,
        );

        async {
            let (generation, cancel) = self.claim();
            info!(k = request.k, "extraction started");

            let opened = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = self.backend.open_stream(request) => Some(result),
            };

            let body = match opened {
                None => {
                    debug!("cancelled before the stream opened");
                    let mut state = SessionState::starting();
                    state.finish(Stage::Aborted);
                    return (generation, Ok(state));
                }
                Some(Ok(body)) => body,
                Some(Err(err)) => {
                    warn!(error = %err, "failed to open extraction stream");
                    let mut state = SessionState::starting();
                    state.error = Some(err.to_string());
                    state.finish(Stage::Error);
                    if self.publish(generation, &state) {
                        self.notifier
                            .error("Failed to start extraction", Some(&err.detail()));
                    }
                    self.release(generation);
                    return (generation, Err(err));
                }
            };

            let state = run_reader(
                &session_id,
                body,
                SessionState::starting(),
                &cancel,
                |state| self.publish(generation, state),
            )
            .await;
            self.release(generation);

            match state.stage {
                Stage::Error => {
                    let message = state.error.clone().unwrap_or_default();
                    self.notifier
                        .error("Extraction failed", Some(&json!({ "message": message })));
                }
                Stage::Aborted => info!("extraction aborted"),
                _ => info!(
                    stage = %state.stage,
                    tasks = state.tasks.len(),
                    mode = state.mode.as_ref().map_or("", ResultMode::as_str),
                    "extraction finished"
                ),
            }

            (generation, Ok(state))
        }
        .instrument(span)
        .await
    }

    /// Replace the visible state if `generation` still owns it and no
    /// session is live.
    pub(crate) fn replace_if_current(&self, generation: u64, state: SessionState) -> bool {
        let slot = self.lock_slot();
        if slot.generation != generation || slot.cancel.is_some() {
            return false;
        }
        self.state_tx.send_replace(state);
        true
    }

    /// Replace the visible state if no session is live; returns the
    /// generation the write belongs to.
    pub(crate) fn replace_if_idle(&self, state: SessionState) -> Option<u64> {
        let slot = self.lock_slot();
        if slot.cancel.is_some() {
            return None;
        }
        self.state_tx.send_replace(state);
        Some(slot.generation)
    }

    /// Take over the slot, cancelling any previous holder.
    fn claim(&self) -> (u64, CancellationToken) {
        let mut slot = self.lock_slot();
        if let Some(previous) = slot.cancel.take() {
            debug!(
                generation = slot.generation,
                "cancelling previous extraction"
            );
            previous.cancel();
        }
        slot.generation += 1;
        let token = CancellationToken::new();
        slot.cancel = Some(token.clone());
        self.state_tx.send_replace(SessionState::starting());
        (slot.generation, token)
    }

    /// Write `state` if `generation` still owns the slot.
    fn publish(&self, generation: u64, state: &SessionState) -> bool {
        let slot = self.lock_slot();
        if !slot.owns(generation) {
            return false;
        }
        self.state_tx.send_replace(state.clone());
        true
    }

    /// Free the slot if `generation` still holds it.
    fn release(&self, generation: u64) {
        let mut slot = self.lock_slot();
        if slot.generation == generation {
            slot.cancel = None;
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
