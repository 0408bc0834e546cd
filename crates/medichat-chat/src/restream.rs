//! Re-segmentation of streamed answers into sentence-sized units.
//!
//! Upstream chunks arrive at arbitrary byte offsets. [`Restreamer`] buffers
//! them and releases text only at boundaries: whitespace directly after `.`,
//! `!` or `?`, or a newline. [`restream`] drives a `Restreamer` over an async
//! byte stream and turns read failures into a final [`Segment::Error`].

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::Serialize;

/// One display-ready unit produced from an upstream stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Segment {
    Text(String),
    /// Synthetic terminal segment describing a read failure.
    Error(String),
}

impl Segment {
    pub fn as_str(&self) -> &str {
        match self {
            Segment::Text(text) | Segment::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Segment::Error(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incremental sentence splitter.
///
/// Single use: [`Restreamer::finish`] consumes it.
#[derive(Debug, Default)]
pub struct Restreamer {
    /// Text received but not yet emitted.
    pending: String,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    partial: Vec<u8>,
    /// Bytes of `pending` already checked for boundaries.
    scanned: usize,
    /// Last character checked, carried into the next scan.
    last: Option<char>,
}

impl Restreamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text buffered after the last boundary.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Feed a text chunk and return the segments it completes.
    pub fn push_str(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);
        self.drain_complete()
    }

    /// Feed raw bytes. A multi-byte character split across reads is held
    /// back until its remaining bytes arrive; invalid bytes become U+FFFD.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(chunk);
        let decoded = self.decode_partial();
        self.pending.push_str(&decoded);
        self.drain_complete()
    }

    /// End of input: return the trimmed remainder, if any.
    pub fn finish(mut self) -> Option<String> {
        if !self.partial.is_empty() {
            let tail = String::from_utf8_lossy(&self.partial).into_owned();
            self.pending.push_str(&tail);
        }
        let rest = self.pending.trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    fn decode_partial(&mut self) -> String {
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.partial) {
                Ok(text) => {
                    out.push_str(text);
                    self.partial.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.partial[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.partial.drain(..valid + bad);
                        }
                        None => {
                            self.partial.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    fn drain_complete(&mut self) -> Vec<String> {
        let mut segments = Vec::new();
        let mut start = 0;
        let mut prev = self.last;

        for (offset, ch) in self.pending[self.scanned..].char_indices() {
            let idx = self.scanned + offset;
            let boundary =
                ch == '\n' || (ch.is_whitespace() && matches!(prev, Some('.' | '!' | '?')));
            if boundary {
                let segment = self.pending[start..idx].trim();
                if !segment.is_empty() {
                    segments.push(segment.to_string());
                }
                start = idx + ch.len_utf8();
            }
            prev = Some(ch);
        }

        self.pending.drain(..start);
        self.scanned = self.pending.len();
        self.last = prev;
        segments
    }
}

struct RestreamState<S> {
    upstream: Pin<Box<S>>,
    splitter: Option<Restreamer>,
    ready: VecDeque<Segment>,
}

/// Restream an upstream byte stream as ordered segments.
///
/// Segments are yielded as soon as their boundary is seen. On end of input
/// the remainder is flushed. On a read error the remainder is flushed, one
/// [`Segment::Error`] is yielded, and the stream ends.
pub fn restream<S, B, E>(upstream: S) -> impl Stream<Item = Segment>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let state = RestreamState {
        upstream: Box::pin(upstream),
        splitter: Some(Restreamer::new()),
        ready: VecDeque::new(),
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(segment) = state.ready.pop_front() {
                return Some((segment, state));
            }
            let splitter = state.splitter.as_mut()?;

            match state.upstream.next().await {
                Some(Ok(chunk)) => {
                    let segments = splitter.push_bytes(chunk.as_ref());
                    state.ready.extend(segments.into_iter().map(Segment::Text));
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Upstream stream failed mid-read");
                    if let Some(rest) = state.splitter.take().and_then(Restreamer::finish) {
                        state.ready.push_back(Segment::Text(rest));
                    }
                    state
                        .ready
                        .push_back(Segment::Error(format!("Error: {}", e)));
                }
                None => {
                    if let Some(rest) = state.splitter.take().and_then(Restreamer::finish) {
                        state.ready.push_back(Segment::Text(rest));
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(segments: &[Segment]) -> Vec<&str> {
        segments.iter().map(Segment::as_str).collect()
    }

    // ---- Restreamer ----

    #[test]
    fn test_sentence_split_across_chunks() {
        let mut r = Restreamer::new();
        let mut out = r.push_str("Hello. How are");
        assert_eq!(out, vec!["Hello."]);
        assert_eq!(r.pending(), "How are");
        out.extend(r.push_str(" you?\n"));
        assert_eq!(r.pending(), "");
        assert_eq!(r.finish(), None);
        assert_eq!(out, vec!["Hello.", "How are you?"]);
    }

    #[test]
    fn test_no_punctuation_single_segment_on_finish() {
        let mut r = Restreamer::new();
        assert!(r.push_str("  just some words without an end ").is_empty());
        assert_eq!(r.finish().as_deref(), Some("just some words without an end"));
    }

    #[test]
    fn test_terminal_punctuation_at_chunk_end_waits_for_whitespace() {
        let mut r = Restreamer::new();
        assert!(r.push_str("Take two tablets daily.").is_empty());
        assert_eq!(r.push_str(" Drink water!"), vec!["Take two tablets daily."]);
        assert_eq!(r.finish().as_deref(), Some("Drink water!"));
    }

    #[test]
    fn test_punctuation_without_whitespace_is_not_a_boundary() {
        let mut r = Restreamer::new();
        assert!(r.push_str("Dose is 2.5mg per day").is_empty());
        assert_eq!(r.finish().as_deref(), Some("Dose is 2.5mg per day"));
    }

    #[test]
    fn test_newline_is_a_boundary() {
        let mut r = Restreamer::new();
        let out = r.push_str("Symptoms\n- fever\n- cough");
        assert_eq!(out, vec!["Symptoms", "- fever"]);
        assert_eq!(r.finish().as_deref(), Some("- cough"));
    }

    #[test]
    fn test_blank_segments_are_skipped() {
        let mut r = Restreamer::new();
        let out = r.push_str("One.\n\n\n  \nTwo?  Three! ");
        assert_eq!(out, vec!["One.", "Two?", "Three!"]);
        assert_eq!(r.finish(), None);
    }

    #[test]
    fn test_multibyte_char_split_across_reads() {
        let text = "Café visit. Ñandú next";
        let bytes = text.as_bytes();
        // Split inside the two-byte 'é'.
        let split = text.find('é').unwrap() + 1;
        let mut r = Restreamer::new();
        let mut out = r.push_bytes(&bytes[..split]);
        out.extend(r.push_bytes(&bytes[split..]));
        out.extend(r.finish());
        assert_eq!(out, vec!["Café visit.", "Ñandú next"]);
    }

    #[test]
    fn test_invalid_bytes_become_replacement_char() {
        let mut r = Restreamer::new();
        assert!(r.push_bytes(b"ok \xFF then").is_empty());
        assert_eq!(r.finish().as_deref(), Some("ok \u{FFFD} then"));
    }

    #[test]
    fn test_lossless_modulo_whitespace() {
        let input = "First point. Second point!\nThird? Fourth without end";
        let mut r = Restreamer::new();
        let mut out = Vec::new();
        for chunk in input.as_bytes().chunks(5) {
            out.extend(r.push_bytes(chunk));
        }
        out.extend(r.finish());
        let squash = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(squash(&out.join(" ")), squash(input));
    }

    #[test]
    fn test_long_run_scanned_once_then_split() {
        let mut r = Restreamer::new();
        for _ in 0..2_000 {
            assert!(r.push_str("word ").is_empty());
        }
        assert_eq!(r.pending().len(), 10_000);
        // Boundary straddles the chunk edge: '.' now, whitespace next push.
        assert!(r.push_str("end.").is_empty());
        let out = r.push_str(" Next\nTail");
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("word word"));
        assert!(out[0].ends_with("word end."));
        assert_eq!(out[1], "Next");
        assert_eq!(r.pending(), "Tail");
        assert_eq!(r.finish().as_deref(), Some("Tail"));
    }

    // ---- restream ----

    #[tokio::test]
    async fn test_restream_orders_segments() {
        let chunks: Vec<Result<&[u8], String>> =
            vec![Ok(&b"Hello. How are"[..]), Ok(&b" you?\n"[..])];
        let segments: Vec<Segment> = restream(futures::stream::iter(chunks)).collect().await;
        assert_eq!(texts(&segments), vec!["Hello.", "How are you?"]);
        assert!(segments.iter().all(|s| !s.is_error()));
    }

    #[tokio::test]
    async fn test_restream_flushes_tail_on_end() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![Ok(b"no boundary here".to_vec())];
        let segments: Vec<Segment> = restream(futures::stream::iter(chunks)).collect().await;
        assert_eq!(segments, vec![Segment::Text("no boundary here".to_string())]);
    }

    #[tokio::test]
    async fn test_restream_error_becomes_terminal_segment() {
        let chunks: Vec<Result<&[u8], String>> = vec![
            Ok(&b"Rest well. Stay"[..]),
            Err("connection reset".to_string()),
            Ok(&b" never seen."[..]),
        ];
        let segments: Vec<Segment> = restream(futures::stream::iter(chunks)).collect().await;
        assert_eq!(
            segments,
            vec![
                Segment::Text("Rest well.".to_string()),
                Segment::Text("Stay".to_string()),
                Segment::Error("Error: connection reset".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_restream_empty_stream() {
        let chunks: Vec<Result<&[u8], String>> = vec![];
        let segments: Vec<Segment> = restream(futures::stream::iter(chunks)).collect().await;
        assert!(segments.is_empty());
    }

    #[test]
    fn test_segment_serialization() {
        let json = serde_json::to_value(Segment::Error("Error: x".to_string())).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["text"], "Error: x");
    }
}
