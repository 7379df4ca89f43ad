//! Incremental Server-Sent-Events parsing.
//!
//! Bytes arrive in arbitrary chunks. [`LineBuffer`] splits them on `\n`
//! and keeps the trailing partial line for the next chunk, so multi-byte
//! characters and JSON payloads split across reads are reassembled before
//! decoding. [`SseParser`] turns complete `data:` lines into
//! [`StreamChunk`]s through a backend-specific [`EventDecoder`].
//!
//! Malformed JSON payloads are logged and skipped. More than
//! [`MAX_CONSECUTIVE_MALFORMED`] in a row ends the stream with an error.

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};
use vtx_core::{AuthError, ResponseStream, StreamChunk};

use crate::error::HttpError;
use crate::redact::{redact, redact_truncated};

/// Consecutive malformed events tolerated before the stream is declared corrupt.
pub const MAX_CONSECUTIVE_MALFORMED: u32 = 8;

// ============================================================================
// Line Buffer
// ============================================================================

/// Splits a byte stream into lines, retaining partial lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Prefix of `buf` already known to hold no newline.
    scanned: usize,
}

impl LineBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every line completed by them, without
    /// the line terminator.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(pos) = self.buf[from..].iter().position(|&b| b == b'\n') {
            let end = from + pos;
            lines.push(decode_line(&self.buf[start..end]));
            start = end + 1;
            from = start;
        }
        self.buf.drain(..start);
        self.scanned = self.buf.len();
        lines
    }

    /// Returns the unterminated tail left at end of input, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let line = decode_line(&self.buf);
        self.buf.clear();
        self.scanned = 0;
        Some(line)
    }

    /// Bytes held for an incomplete line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

// ============================================================================
// Event Decoding
// ============================================================================

/// One SSE line, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// `data: <payload>`.
    Data(&'a str),
    /// `data: [DONE]`.
    Done,
    /// Comments, `event:`/`id:` fields, blank separators.
    Other,
}

impl<'a> SseLine<'a> {
    /// Classifies a line.
    pub fn parse(line: &'a str) -> Self {
        let Some(payload) = line.strip_prefix("data:") else {
            return Self::Other;
        };
        let payload = payload.strip_prefix(' ').unwrap_or(payload).trim_end();
        if payload == "[DONE]" {
            Self::Done
        } else if payload.is_empty() {
            Self::Other
        } else {
            Self::Data(payload)
        }
    }
}

/// What a decoder made of one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Fragments to yield, in order.
    pub chunks: Vec<StreamChunk>,
    /// True if the stream is complete after these fragments.
    pub finished: bool,
}

impl Decoded {
    /// Nothing to yield.
    pub fn skip() -> Self {
        Self::default()
    }

    /// One fragment, stream continues.
    pub fn emit(chunk: StreamChunk) -> Self {
        Self {
            chunks: vec![chunk],
            finished: false,
        }
    }

    /// Final fragments, stream ends.
    pub fn finish(chunks: Vec<StreamChunk>) -> Self {
        Self {
            chunks,
            finished: true,
        }
    }
}

/// Backend-specific interpretation of SSE `data:` payloads.
pub trait EventDecoder: Send + 'static {
    /// Decodes one well-formed JSON event.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend reports a failure in-band.
    fn decode(&mut self, event: &Value) -> Result<Decoded, AuthError>;
}

// ============================================================================
// Parser
// ============================================================================

/// Incremental SSE parser driving an [`EventDecoder`].
#[derive(Debug)]
pub struct SseParser<D> {
    lines: LineBuffer,
    decoder: D,
    malformed: u32,
    finished: bool,
    log_events: bool,
}

impl<D: EventDecoder> SseParser<D> {
    /// Creates a parser around `decoder`.
    pub fn new(decoder: D) -> Self {
        Self {
            lines: LineBuffer::new(),
            decoder,
            malformed: 0,
            finished: false,
            log_events: false,
        }
    }

    /// Logs every event payload (redacted) at debug level.
    #[must_use]
    pub fn with_event_logging(mut self, enabled: bool) -> Self {
        self.log_events = enabled;
        self
    }

    /// True once `[DONE]` or a terminal event was seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feeds raw bytes and returns the fragments they complete.
    ///
    /// # Errors
    ///
    /// Returns the decoder's error, or a network error when too many
    /// consecutive events are malformed.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<StreamChunk>, AuthError> {
        let mut out = Vec::new();
        for line in self.lines.push(bytes) {
            if self.finished {
                break;
            }
            self.handle_line(&line, &mut out)?;
        }
        Ok(out)
    }

    /// Flushes an unterminated final line at end of input.
    ///
    /// # Errors
    ///
    /// Same as [`feed`](Self::feed).
    pub fn finish(&mut self) -> Result<Vec<StreamChunk>, AuthError> {
        let mut out = Vec::new();
        if let Some(line) = self.lines.finish() {
            if !self.finished {
                self.handle_line(&line, &mut out)?;
            }
        }
        Ok(out)
    }

    fn handle_line(&mut self, line: &str, out: &mut Vec<StreamChunk>) -> Result<(), AuthError> {
        let payload = match SseLine::parse(line) {
            SseLine::Data(payload) => payload,
            SseLine::Done => {
                debug!("Stream finished with [DONE]");
                self.finished = true;
                return Ok(());
            }
            SseLine::Other => return Ok(()),
        };

        if self.log_events {
            debug!(event = %redact(payload), "SSE event");
        }

        let event: Value = match serde_json::from_str(payload) {
            Ok(event) => {
                self.malformed = 0;
                event
            }
            Err(e) => {
                self.malformed += 1;
                warn!(
                    error = %e,
                    consecutive = self.malformed,
                    payload = %redact_truncated(payload, 200),
                    "Skipping malformed SSE event"
                );
                if self.malformed > MAX_CONSECUTIVE_MALFORMED {
                    return Err(AuthError::network(format!(
                        "Response stream corrupt: {} consecutive malformed events",
                        self.malformed
                    )));
                }
                return Ok(());
            }
        };

        let decoded = self.decoder.decode(&event)?;
        out.extend(decoded.chunks);
        if decoded.finished {
            self.finished = true;
        }
        Ok(())
    }
}

// ============================================================================
// Response Driver
// ============================================================================

/// Turns a successful streaming HTTP response into a [`ResponseStream`].
///
/// The stream owns the response; dropping it closes the connection.
pub fn into_response_stream<D: EventDecoder>(
    response: reqwest::Response,
    decoder: D,
    log_events: bool,
) -> ResponseStream {
    let mut bytes = response.bytes_stream();

    Box::pin(async_stream::stream! {
        let mut parser = SseParser::new(decoder).with_event_logging(log_events);

        while let Some(item) = bytes.next().await {
            match item {
                Ok(chunk) => match parser.feed(&chunk) {
                    Ok(fragments) => {
                        for fragment in fragments {
                            yield Ok(fragment);
                        }
                    }
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                },
                Err(err) => {
                    yield Err(AuthError::from(HttpError::from(err)));
                    return;
                }
            }

            if parser.is_finished() {
                return;
            }
        }

        match parser.finish() {
            Ok(fragments) => {
                for fragment in fragments {
                    yield Ok(fragment);
                }
            }
            Err(err) => yield Err(err),
        }

        if !parser.is_finished() {
            debug!("Stream closed without a terminal event");
        }
    })
}

// ============================================================================
// Tests
// ============================================================================
