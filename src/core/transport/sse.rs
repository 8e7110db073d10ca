//! Decoding of server-sent-event framed chat completions.
//!
//! Each `data:` line normally holds one JSON delta object, but some gateways
//! pack several objects into one line (`{...}{...}`). Every object is decoded
//! on its own and broken ones are skipped, so one bad frame never ends the
//! reply early.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use memchr::memchr;
use tracing::{debug, warn};

use super::{FragmentStream, TransportError};
use crate::api::ChatResponse;

const DONE_SENTINEL: &str = "[DONE]";

/// What a single `data:` payload contributed to the reply.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    pub fragments: Vec<String>,
    /// Set by the `[DONE]` sentinel or by a `finish_reason`.
    pub finished: bool,
}

pub fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Split `{...}{...}` at object boundaries. A payload without boundaries is
/// returned whole.
pub fn split_concatenated_objects(data: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    while let Some(offset) = data[start..].find("}{") {
        let boundary = start + offset + 1;
        pieces.push(&data[start..boundary]);
        start = boundary;
    }
    pieces.push(&data[start..]);
    pieces
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Apply one decoded object; returns true when it ends the reply.
fn apply_response(response: &ChatResponse, outcome: &mut FrameOutcome) -> bool {
    let Some(choice) = response.choices.first() else {
        return false;
    };
    if let Some(text) = choice.text().filter(|text| !text.is_empty()) {
        outcome.fragments.push(text.to_string());
    }
    choice
        .finish_reason
        .as_deref()
        .is_some_and(|reason| !reason.is_empty())
}

pub fn decode_payload(payload: &str) -> FrameOutcome {
    let mut outcome = FrameOutcome::default();
    let trimmed = payload.trim();
    if trimmed == DONE_SENTINEL {
        outcome.finished = true;
        return outcome;
    }

    // The common case is exactly one object; only split when that fails so
    // that a literal "}{" inside string content survives.
    if let Ok(response) = serde_json::from_str::<ChatResponse>(trimmed) {
        outcome.finished = apply_response(&response, &mut outcome);
        return outcome;
    }

    for piece in split_concatenated_objects(trimmed) {
        if piece == DONE_SENTINEL {
            outcome.finished = true;
            break;
        }
        match serde_json::from_str::<ChatResponse>(piece) {
            Ok(response) => {
                if apply_response(&response, &mut outcome) {
                    outcome.finished = true;
                    break;
                }
            }
            Err(err) => {
                debug!(error = %err, piece, "skipping malformed stream frame");
            }
        }
    }
    outcome
}

/// `None` for lines that carry no data (comments, `event:` lines, blanks).
pub fn process_sse_line(line: &str) -> Option<FrameOutcome> {
    extract_data_payload(line).map(decode_payload)
}

struct FrameReader {
    body: BoxStream<'static, Result<Vec<u8>, TransportError>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    finished: bool,
    idle_timeout: Duration,
}

impl FrameReader {
    fn consume_line(&mut self, raw: &[u8]) {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim(),
            Err(err) => {
                warn!(error = %err, "invalid UTF-8 in stream");
                return;
            }
        };
        if let Some(outcome) = process_sse_line(line) {
            self.pending.extend(outcome.fragments);
            if outcome.finished {
                self.finished = true;
            }
        }
    }

    fn consume_buffered_lines(&mut self) {
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            self.consume_line(&line[..newline_pos]);
            if self.finished {
                self.buffer.clear();
                return;
            }
        }
    }
}

/// Turn a raw SSE byte stream into text fragments.
///
/// Iteration ends at `[DONE]`, at the first `finish_reason`, or when the body
/// closes. Waiting longer than `idle_timeout` for the next bytes yields
/// [`TransportError::Timeout`].
pub fn fragment_stream(
    body: BoxStream<'static, Result<Vec<u8>, TransportError>>,
    idle_timeout: Duration,
) -> FragmentStream {
    let reader = FrameReader {
        body,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
        idle_timeout,
    };

    stream::try_unfold(reader, |mut reader| async move {
        loop {
            if let Some(fragment) = reader.pending.pop_front() {
                return Ok(Some((fragment, reader)));
            }
            if reader.finished {
                return Ok(None);
            }
            match tokio::time::timeout(reader.idle_timeout, reader.body.next()).await {
                Err(_) => return Err(TransportError::Timeout(reader.idle_timeout)),
                Ok(None) => {
                    let rest = std::mem::take(&mut reader.buffer);
                    reader.consume_line(&rest);
                    reader.finished = true;
                }
                Ok(Some(Err(err))) => return Err(err),
                Ok(Some(Ok(bytes))) => {
                    reader.buffer.extend_from_slice(&bytes);
                    reader.consume_buffered_lines();
                }
            }
        }
    })
    .boxed()
}
