//! Frame splitting for the event stream.
//!
//! Network chunks are not aligned with events. The splitter keeps a single
//! carry buffer, appends every chunk to it and hands out each complete frame
//! (the text between two blank-line delimiters). Whatever follows the last
//! delimiter stays in the carry until more bytes arrive.

use tracing::{debug, warn};

/// One complete frame of the wire protocol, without its trailing delimiter.
pub type Frame = String;

/// Splits an arbitrarily chunked byte stream into frames.
///
/// The carry is kept as bytes so a multi-byte character split across two
/// chunks is reassembled before the frame is decoded as UTF-8.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    carry: Vec<u8>,
    /// Bytes of `carry` already known to hold no delimiter start.
    scanned: usize,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns the frames it completes.
    ///
    /// The iterator is lazy: frames are cut from the carry only as they are
    /// pulled, and any frame left unpulled is still there on the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Frames<'_> {
        self.carry.extend_from_slice(chunk);
        Frames { splitter: self }
    }

    /// Number of bytes currently held back waiting for a delimiter.
    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }

    /// Ends the stream, discarding any incomplete trailing frame.
    ///
    /// A well-formed stream always ends with a delimiter, so leftover bytes are
    /// a truncated event and are never decoded.
    pub fn finish(&mut self) {
        let leftover = self.carry.iter().filter(|b| !b.is_ascii_whitespace()).count();
        if leftover > 0 {
            debug!(
                bytes = self.carry.len(),
                "discarding unterminated trailing frame"
            );
        }
        self.carry.clear();
        self.scanned = 0;
    }

    /// Cuts the next non-empty frame out of the carry, if one is complete.
    fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let Some((end, delim_len)) = find_double_newline(&self.carry, self.scanned) else {
                // A delimiter may start in the last 3 bytes once more data arrives.
                self.scanned = self.carry.len().saturating_sub(3);
                return None;
            };

            let frame_bytes: Vec<u8> = self.carry.drain(..end).collect();
            self.carry.drain(..delim_len);
            self.scanned = 0;

            if frame_bytes.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match String::from_utf8(frame_bytes) {
                Ok(frame) => return Some(frame),
                Err(err) => {
                    warn!(error = %err, "dropping frame with invalid UTF-8");
                }
            }
        }
    }
}

/// Lazy iterator over the frames completed by one [`FrameSplitter::push`].
#[derive(Debug)]
pub struct Frames<'a> {
    splitter: &'a mut FrameSplitter,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        self.splitter.next_frame()
    }
}

/// Finds the earliest blank-line delimiter at or after `from`.
///
/// Handles both LF (`\n\n`) and CRLF (`\r\n\r\n`) line endings, so mixed
/// endings within one stream still split correctly. Returns the delimiter's
/// start offset and length.
fn find_double_newline(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    let tail = buffer.get(from..)?;
    let crlf_pos = tail.windows(4).position(|w| w == b"\r\n\r\n");
    let lf_pos = tail.windows(2).position(|w| w == b"\n\n");

    let found = match (crlf_pos, lf_pos) {
        (Some(c), Some(l)) => {
            if l <= c {
                (l, 2)
            } else {
                (c, 4)
            }
        }
        (Some(c), None) => (c, 4),
        (None, Some(l)) => (l, 2),
        (None, None) => return None,
    };
    Some((from + found.0, found.1))
}
