//! Incremental marker-aware parser over streamed model output.
//!
//! Fragments arrive in delivery order and may split a sentinel marker at any
//! byte. The parser emits display units (text known to be outside any control
//! block) as soon as they are provably safe, swallows block interiors, and
//! accumulates the full raw transcript, markers included, for history and
//! tool-call extraction.

use crate::markers::{self, MAX_MARKER_LEN};

/// Parse state: either in plain prose or inside a control block waiting for
/// its end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Plain,
    InBlock { end: &'static str },
}

/// One parser instance per in-flight assistant turn. Dropped (or consumed by
/// [`StreamParser::finish`]) when the turn completes or is cancelled.
pub struct StreamParser {
    buf: String,
    transcript: String,
    state: State,
}

impl StreamParser {
    pub fn new() -> Self {
        StreamParser {
            buf: String::new(),
            transcript: String::new(),
            state: State::Plain,
        }
    }

    /// Consume one fragment, returning any display units it completes.
    ///
    /// Every byte is appended to the transcript regardless of whether it is
    /// emitted or swallowed.
    pub fn feed(&mut self, fragment: &str) -> Vec<String> {
        self.transcript.push_str(fragment);
        self.buf.push_str(fragment);
        let mut units = Vec::new();
        self.drain(&mut units, false);
        units
    }

    /// End of stream: flush the remaining buffer and hand back the transcript.
    ///
    /// A remainder in `Plain` becomes a final display unit. A remainder in
    /// `InBlock` (truncated stream) is already part of the transcript and is
    /// discarded without emission. Tolerated, not an error.
    pub fn finish(mut self) -> (Option<String>, String) {
        let mut units = Vec::new();
        self.drain(&mut units, true);
        let tail = if units.is_empty() {
            None
        } else {
            Some(units.concat())
        };
        (tail, self.transcript)
    }

    /// Advance the state machine over the internal buffer.
    ///
    /// With `at_end` false, a tail short enough to hide a split marker is
    /// retained for the next fragment; with `at_end` true the buffer is
    /// drained completely.
    fn drain(&mut self, units: &mut Vec<String>, at_end: bool) {
        loop {
            match self.state {
                State::Plain => {
                    if let Some((i, start, end)) = markers::find_earliest_start(&self.buf) {
                        if i > 0 {
                            units.push(self.buf[..i].to_string());
                        }
                        self.buf.drain(..i + start.len());
                        self.state = State::InBlock { end };
                        continue;
                    }
                    if at_end {
                        if !self.buf.is_empty() {
                            units.push(std::mem::take(&mut self.buf));
                        }
                    } else {
                        // No marker found, but one could still begin inside the
                        // last max_marker_len - 1 bytes and complete in the next
                        // fragment. Emit only the prefix before that window.
                        self.emit_safe_prefix(units, MAX_MARKER_LEN - 1);
                    }
                    return;
                }
                State::InBlock { end } => {
                    if let Some(j) = self.buf.find(end) {
                        self.buf.drain(..j + end.len());
                        self.state = State::Plain;
                        continue;
                    }
                    if at_end {
                        // Unterminated block: swallow silently.
                        self.buf.clear();
                    } else {
                        // Keep a tail that could be a split end marker; the
                        // rest is definitely block interior and is dropped
                        // without emission.
                        self.discard_until_tail(end.len() - 1);
                    }
                    return;
                }
            }
        }
    }

    /// Emit and drop everything except the trailing `keep` bytes, rounding
    /// the split point down to a char boundary.
    fn emit_safe_prefix(&mut self, units: &mut Vec<String>, keep: usize) {
        if let Some(split) = self.split_point(keep) {
            let unit: String = self.buf.drain(..split).collect();
            units.push(unit);
        }
    }

    /// Drop everything except the trailing `keep` bytes without emitting.
    fn discard_until_tail(&mut self, keep: usize) {
        if let Some(split) = self.split_point(keep) {
            self.buf.drain(..split);
        }
    }

    fn split_point(&self, keep: usize) -> Option<usize> {
        if self.buf.len() <= keep {
            return None;
        }
        let mut split = self.buf.len() - keep;
        while !self.buf.is_char_boundary(split) {
            split -= 1;
        }
        if split == 0 {
            None
        } else {
            Some(split)
        }
    }
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}
