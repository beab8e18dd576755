//! Decoder for the `text/event-stream` body of a streaming send.
//!
//! The body is a sequence of newline-terminated lines. Only lines starting
//! with `data: ` carry frames; the payload is either a JSON [`StreamDelta`]
//! or the `[DONE]` sentinel. Everything else (blank separators, comments,
//! `event:` lines) is ignored.
//!
//! A line is only parsed once its terminating `\n` has arrived. Whatever is
//! left in the buffer when the body ends is discarded.

use std::collections::VecDeque;
use futures::stream::{self, Stream, StreamExt};
use chat_types::{
    Result,
    delta::{ParseFault, StreamDelta},
};
use crate::ports::TransportEvent;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// A classified `data:` line
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    Delta(StreamDelta),
    Done,
    Malformed(ParseFault),
}

impl From<SseFrame> for TransportEvent {
    fn from(frame: SseFrame) -> Self {
        match frame {
            SseFrame::Delta(delta) => TransportEvent::Delta(delta),
            SseFrame::Done => TransportEvent::Done,
            SseFrame::Malformed(fault) => TransportEvent::Skipped(fault),
        }
    }
}

/// Classify one complete line. Returns `None` for lines that are not frames.
pub fn parse_line(line: &str) -> Option<SseFrame> {
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload == DONE_SENTINEL {
        return Some(SseFrame::Done);
    }
    let frame = match serde_json::from_str::<StreamDelta>(payload) {
        Ok(delta) => SseFrame::Delta(delta),
        Err(e) => SseFrame::Malformed(ParseFault {
            payload: payload.to_string(),
            reason: e.to_string(),
        }),
    };
    Some(frame)
}

/// Incremental byte-to-frame decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Tail of a multi-byte UTF-8 sequence split across chunks
    pending_bytes: Vec<u8>,
    /// Decoded text not yet terminated by a newline
    line_buf: String,
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the body and collect the frames it completes.
    ///
    /// Once `[DONE]` is seen the decoder is finished: the sentinel is the
    /// last frame returned and later input is ignored.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        if self.finished {
            return Vec::new();
        }
        self.decode_utf8(chunk);

        let mut frames = Vec::new();
        while let Some(newline) = self.line_buf.find('\n') {
            let line: String = self.line_buf.drain(..=newline).collect();
            let line = line.trim_end_matches('\n').trim_end_matches('\r');

            match parse_line(line) {
                Some(SseFrame::Done) => {
                    frames.push(SseFrame::Done);
                    self.finished = true;
                    self.line_buf.clear();
                    self.pending_bytes.clear();
                    break;
                }
                Some(frame) => frames.push(frame),
                None => {}
            }
        }
        frames
    }

    /// True once the `[DONE]` sentinel has been decoded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// End of body. Returns the unterminated tail that is being dropped, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.finished = true;
        self.pending_bytes.clear();
        let rest = std::mem::take(&mut self.line_buf);
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest)
        }
    }

    fn decode_utf8(&mut self, chunk: &[u8]) {
        self.pending_bytes.extend_from_slice(chunk);

        let mut consumed = 0;
        loop {
            match std::str::from_utf8(&self.pending_bytes[consumed..]) {
                Ok(text) => {
                    self.line_buf.push_str(text);
                    consumed = self.pending_bytes.len();
                    break;
                }
                Err(e) => {
                    let valid_end = consumed + e.valid_up_to();
                    let valid = std::str::from_utf8(&self.pending_bytes[consumed..valid_end])
                        .unwrap_or_default();
                    self.line_buf.push_str(valid);
                    match e.error_len() {
                        // Invalid sequence: substitute and keep going
                        Some(len) => {
                            self.line_buf.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid_end + len;
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            consumed = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending_bytes.drain(..consumed);
    }
}

struct DecodeState<S> {
    source: Option<S>,
    decoder: SseDecoder,
    queue: VecDeque<TransportEvent>,
}

/// Turn a stream of body chunks into transport events.
///
/// The byte source is dropped as soon as it is no longer needed: after the
/// sentinel, after a read error (reported once, as the final event), or when
/// it runs dry. Dropping the returned stream drops the source too.
pub fn decode_stream<S>(bytes: S) -> impl Stream<Item = TransportEvent>
where
    S: Stream<Item = Result<Vec<u8>>> + Unpin,
{
    let state = DecodeState {
        source: Some(bytes),
        decoder: SseDecoder::new(),
        queue: VecDeque::new(),
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.queue.pop_front() {
                return Some((event, st));
            }
            let source = st.source.as_mut()?;

            match source.next().await {
                Some(Ok(chunk)) => {
                    for frame in st.decoder.push(&chunk) {
                        if let SseFrame::Malformed(fault) = &frame {
                            log::warn!(
                                "Skipping malformed stream frame ({}): {}",
                                fault.reason,
                                fault.payload
                            );
                        }
                        st.queue.push_back(frame.into());
                    }
                    if st.decoder.is_finished() {
                        log::debug!("Stream sentinel received");
                        st.source = None;
                    }
                }
                Some(Err(e)) => {
                    log::error!("Stream read failed: {}", e);
                    st.source = None;
                    st.queue.push_back(TransportEvent::Error(e));
                }
                None => {
                    st.source = None;
                    if let Some(rest) = st.decoder.finish() {
                        log::debug!("Discarding unterminated stream tail: {:?}", rest);
                    }
                }
            }
        }
    })
}
