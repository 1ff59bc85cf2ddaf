//! Incremental decoding of event-stream response bodies.
//!
//! # Design
//! Chunks arrive at arbitrary byte boundaries. `Utf8Decoder` carries an
//! incomplete multi-byte sequence over to the next read, and `SegmentDecoder`
//! carries the text after the last `"\n\n"` over as well, so neither a
//! character nor the delimiter may be split across reads. Invalid bytes decode
//! to U+FFFD instead of failing the stream.

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::ApiError;

/// Separator between streamed messages.
pub const SEGMENT_DELIMITER: &str = "\n\n";

/// Stateful lossy UTF-8 decoder.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode as much of `pending + chunk` as possible. A trailing incomplete
    /// sequence is held back for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(err) => {
                    let end = start + err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..end]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = end + len;
                        }
                        None => {
                            start = end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..start);
        out
    }

    /// Flush at end of input. A dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }
}

/// Splits decoded text into delimiter-terminated segments.
#[derive(Debug, Default)]
pub struct SegmentDecoder {
    utf8: Utf8Decoder,
    buffer: String,
}

impl SegmentDecoder {
    /// Feed one read. Returns every segment completed by it, in order,
    /// including empty ones between back-to-back delimiters.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.utf8.decode(chunk);
        self.buffer.push_str(&text);
        let mut segments = Vec::new();
        while let Some(pos) = self.buffer.find(SEGMENT_DELIMITER) {
            segments.push(self.buffer[..pos].to_string());
            self.buffer.drain(..pos + SEGMENT_DELIMITER.len());
        }
        segments
    }

    /// End of stream. Returns the unterminated tail, if any.
    pub fn finish(mut self) -> Option<String> {
        let tail = self.utf8.finish();
        self.buffer.push_str(&tail);
        (!self.buffer.is_empty()).then_some(self.buffer)
    }
}

/// Read `body` to the end, calling `on_segment` once per segment in arrival
/// order. Suspends at every read; there is no timeout.
pub async fn drain<S, F>(mut body: S, mut on_segment: F) -> Result<(), ApiError>
where
    S: Stream<Item = Result<Bytes, ApiError>> + Unpin,
    F: FnMut(&str),
{
    let mut decoder = SegmentDecoder::default();
    while let Some(chunk) = body.next().await {
        for segment in decoder.push(&chunk?) {
            on_segment(&segment);
        }
    }
    if let Some(tail) = decoder.finish() {
        on_segment(&tail);
    }
    Ok(())
}
