//! Extraction stream handling.
//!
//! The backend answers `POST /tasks/stream` with a long-lived byte stream of
//! `data:` records separated by blank lines. This module turns that stream
//! into typed events and folds them into [`SessionState`](crate::models::state::SessionState).
//!
//! - `codec`: [`Decoder`](tokio_util::codec::Decoder) that splits the byte
//!   stream into frames on `\n\n`, independent of chunk boundaries.
//! - `interpreter`: pure state transition from one event to the next state.
//! - `reader`: frame → event parsing and the cancellable read loop.

pub mod codec;
pub mod interpreter;
pub mod reader;
