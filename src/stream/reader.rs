//! Extraction stream reader.
//!
//! Drives a [`FramedRead`] over the response body using [`FrameCodec`],
//! parses each frame into a [`StreamEvent`], and folds it into the session
//! state with [`apply_event`]. Every new state is handed to a `publish`
//! callback, which owns the decision whether this reader may still write to
//! the visible state.
//!
//! Malformed frames are logged and skipped; they never terminate the read
//! loop.

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::models::event::StreamEvent;
use crate::models::state::{SessionState, Stage};
use crate::stream::codec::FrameCodec;
use crate::stream::interpreter::apply_event;
use crate::{AppError, Result};

/// Record prefix carrying an event payload.
pub const DATA_PREFIX: &str = "data:";

/// Parse a single frame into a [`StreamEvent`].
///
/// # Return value
///
/// - `Ok(Some(event))`: the frame is a `data:` record with a JSON object.
/// - `Ok(None)`: the frame is empty or not a `data:` record (comments and
///   keep-alives are silently skipped).
/// - `Err(AppError::Stream(...))`: the payload is not a valid event.
///
/// # Errors
///
/// Returns [`AppError::Stream`] for unparsable payloads.
pub fn parse_frame(frame: &str) -> Result<Option<StreamEvent>> {
    let Some(payload) = frame.trim_start().strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let payload = payload.trim_start();
    if payload.is_empty() {
        return Err(AppError::Stream("empty data record".into()));
    }
    StreamEvent::from_json(payload).map(Some)
}

/// Read frames from `body` until a terminal event, EOF, or cancellation.
///
/// `publish` receives every state produced by a frame and must return
/// `false` once this reader no longer owns the visible state; the reader
/// then stops as if cancelled.
///
/// # Cancellation
///
/// `cancel` is checked before every frame. Once it fires no further frame
/// is applied, even if decoded bytes remain buffered, and the returned
/// state is `aborted`. Cancellation is a normal completion path, not an
/// error.
///
/// # Return value
///
/// The final state of this session. A mid-stream I/O failure yields an
/// `error` state carrying the failure message.
pub async fn run_reader<R, P>(
    session_id: &str,
    body: R,
    mut state: SessionState,
    cancel: &CancellationToken,
    mut publish: P,
) -> SessionState
where
    R: AsyncRead + Unpin + Send,
    P: FnMut(&SessionState) -> bool,
{
    let mut frames = FramedRead::new(body, FrameCodec::new());

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(session_id, "stream reader: cancellation received, stopping");
                abort(&mut state);
                break;
            }

            item = frames.next() => {
                match item {
                    None => {
                        debug!(session_id, stage = %state.stage, "stream reader: EOF detected");
                        state.active = false;
                        publish(&state);
                        break;
                    }

                    Some(Err(e)) => {
                        warn!(session_id, error = %e, "stream reader: IO error, stopping");
                        state.error = Some(e.to_string());
                        state.finish(Stage::Error);
                        publish(&state);
                        break;
                    }

                    Some(Ok(frame)) => {
                        let event = match parse_frame(&frame) {
                            Ok(Some(event)) => event,
                            Ok(None) => continue,
                            Err(e) => {
                                warn!(
                                    session_id,
                                    error = %e,
                                    raw_frame = %frame,
                                    "stream reader: parse error, skipping frame"
                                );
                                continue;
                            }
                        };

                        state = apply_event(state, event);
                        debug!(
                            session_id,
                            stage = %state.stage,
                            progress = state.progress,
                            "stream reader: event applied"
                        );

                        if !publish(&state) {
                            debug!(session_id, "stream reader: lost ownership of visible state");
                            abort(&mut state);
                            break;
                        }
                        if state.is_terminal() {
                            break;
                        }
                    }
                }
            }
        }
    }

    state
}

fn abort(state: &mut SessionState) {
    if !state.is_terminal() {
        state.finish(Stage::Aborted);
    }
}
