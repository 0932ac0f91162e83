//! Blank-line frame codec for extraction streams.
//!
//! Records on the wire are separated by `\n\n`. Network reads deliver
//! arbitrary byte chunks, so a record, its delimiter, or a multi-byte UTF-8
//! character may be split across reads. [`FrameCodec`] scans raw bytes for
//! the delimiter and only decodes text once a frame is complete; since `\n`
//! never occurs inside a multi-byte sequence, a character split across reads
//! is always reassembled before decoding.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tokio_util::codec::FramedRead;
//! use meeting_tasks::stream::codec::FrameCodec;
//!
//! let frames = FramedRead::new(body, FrameCodec::new());
//! ```

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Record delimiter.
pub const DELIMITER: &[u8] = b"\n\n";

/// Maximum frame length accepted by the codec: 1 MiB.
///
/// Longer frames are discarded up to the next delimiter instead of being
/// buffered.
pub const MAX_FRAME_BYTES: usize = 1_048_576;

/// Frame decoder for blank-line delimited streams.
///
/// # Decoder
///
/// Yields each complete frame's text without the delimiter. Frames that
/// exceed the length cap or are not valid UTF-8 are dropped and logged;
/// decoding continues with the next frame. A trailing partial frame at EOF
/// is discarded.
#[derive(Debug)]
pub struct FrameCodec {
    /// Bytes of the buffer already scanned without finding a delimiter.
    next_index: usize,
    max_length: usize,
    /// Set while skipping the remainder of an oversize frame.
    discarding: bool,
}

impl FrameCodec {
    /// Create a codec with the default [`MAX_FRAME_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_FRAME_BYTES)
    }

    /// Create a codec with a custom frame length limit.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
            discarding: false,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next complete frame from `src`.
    ///
    /// Returns `Ok(None)` while `src` holds only a partial frame.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            // Back up so a delimiter straddling two reads is still found.
            let search_from = self.next_index.saturating_sub(DELIMITER.len() - 1);

            let Some(offset) = find_delimiter(&src[search_from..]) else {
                // A frame of exactly `max_length` bytes may still be waiting
                // on the last delimiter byte.
                if src.len() > self.max_length + DELIMITER.len() - 1 {
                    if !self.discarding {
                        warn!(
                            limit = self.max_length,
                            "frame codec: frame exceeds limit, discarding"
                        );
                    }
                    self.discarding = true;
                    // Keep the tail in case it starts the delimiter.
                    let keep = DELIMITER.len() - 1;
                    src.advance(src.len() - keep);
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let end = search_from + offset;
            let frame = src.split_to(end + DELIMITER.len());
            self.next_index = 0;

            if self.discarding {
                self.discarding = false;
                debug!("frame codec: resynchronised after oversize frame");
                continue;
            }

            if end > self.max_length {
                warn!(
                    len = end,
                    limit = self.max_length,
                    "frame codec: frame exceeds limit, discarding"
                );
                continue;
            }

            match std::str::from_utf8(&frame[..end]) {
                Ok(text) => return Ok(Some(text.to_owned())),
                Err(e) => {
                    warn!(error = %e, "frame codec: frame is not valid utf-8, discarding");
                }
            }
        }
    }

    /// Decode remaining frames at EOF; a trailing partial frame is dropped.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            debug!(
                bytes = src.len(),
                "frame codec: dropping unterminated trailing frame"
            );
            src.clear();
        }
        self.next_index = 0;
        self.discarding = false;
        Ok(None)
    }
}

/// Position of the first delimiter in `haystack`.
fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(DELIMITER.len())
        .position(|window| window == DELIMITER)
}
