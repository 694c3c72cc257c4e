//! Render-safe split of a growing markdown text.
//!
//! While a message streams, only a prefix of its text is handed to the
//! compiler: the longest prefix that ends at a *safe boundary*, where the
//! markdown seen so far cannot change meaning when more text arrives.
//!
//! A boundary `b` is safe when:
//! - an even number of backtick fences (runs of three or more) end at or
//!   before `b`, and `b` does not split a backtick run;
//! - `b` is a grapheme cluster boundary;
//! - no fence starts on `b`'s line at or after `b`, and unless `b` starts a
//!   line, that line does not open with a backtick, `~` or `|` and does not
//!   follow a table delimiter row (fence lines and table rows are committed
//!   whole);
//! - `b` is the end of the text only when the text ends in whitespace.
//!
//! Among safe boundaries the buffer prefers one that starts a word, looking
//! back up to `word_window` bytes, so text appears word by word. A word longer
//! than the window is split at the nearest safe boundary instead.

use std::ops::Range;

use tracing::{trace, warn};
use unicode_segmentation::UnicodeSegmentation;

/// Default look-back for a word start, in bytes.
pub const DEFAULT_WORD_WINDOW: usize = 32;

/// Splits one append-only text into a committed prefix and a pending tail.
///
/// `committed` only ever grows; text once committed is never taken back.
#[derive(Debug, Clone)]
pub struct RenderBuffer {
    text: String,
    committed: usize,
    word_window: usize,
    finished: bool,
}

impl Default for RenderBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_WORD_WINDOW)
    }
}

impl RenderBuffer {
    pub fn new(word_window: usize) -> Self {
        Self {
            text: String::new(),
            committed: 0,
            word_window,
            finished: false,
        }
    }

    /// Text that is safe to render.
    pub fn committed(&self) -> &str {
        &self.text[..self.committed]
    }

    /// Text held back until it is safe.
    pub fn pending(&self) -> &str {
        &self.text[self.committed..]
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the buffer's view of the full text and advances the split.
    ///
    /// `full` must extend the text seen so far; anything else is ignored.
    /// Returns whether the committed prefix grew.
    pub fn update(&mut self, full: &str) -> bool {
        if !full.starts_with(self.text.as_str()) {
            warn!(
                seen = self.text.len(),
                got = full.len(),
                "ignoring text that does not extend the buffer"
            );
            return false;
        }
        self.push(&full[self.text.len()..])
    }

    /// Appends `delta` and advances the split. Returns whether the committed
    /// prefix grew.
    pub fn push(&mut self, delta: &str) -> bool {
        if delta.is_empty() {
            return false;
        }
        self.text.push_str(delta);
        if self.finished {
            self.committed = self.text.len();
            return true;
        }

        match split_point(&self.text, self.committed, self.word_window) {
            Some(boundary) => {
                trace!(
                    from = self.committed,
                    to = boundary,
                    len = self.text.len(),
                    "advancing committed text"
                );
                self.committed = boundary;
                true
            }
            None => false,
        }
    }

    /// Commits everything regardless of fence state. Later text is committed
    /// as soon as it arrives.
    pub fn finish(&mut self) -> bool {
        self.finished = true;
        let grew = self.committed < self.text.len();
        self.committed = self.text.len();
        grew
    }
}

/// Finds the boundary to commit up to, or `None` to keep the current split.
fn split_point(text: &str, committed: usize, window: usize) -> Option<usize> {
    let layout = Layout::new(text);

    // Grapheme boundaries strictly after `committed`, in ascending order.
    let boundaries: Vec<usize> = text[committed..]
        .grapheme_indices(true)
        .skip(1)
        .map(|(offset, _)| committed + offset)
        .chain(std::iter::once(text.len()))
        .collect();

    let nearest_pos = boundaries.iter().rposition(|&b| layout.is_safe(b))?;
    let nearest = boundaries[nearest_pos];

    for &b in boundaries[..=nearest_pos].iter().rev() {
        if nearest - b > window {
            break;
        }
        if layout.starts_word(b) && layout.is_safe(b) {
            return Some(b);
        }
    }

    // The word in progress began at or before the split: wait for it to end.
    if nearest - committed <= window && layout.starts_word(committed) {
        return None;
    }

    Some(nearest)
}

struct Layout<'a> {
    text: &'a str,
    /// Every run of consecutive backticks.
    runs: Vec<Range<usize>>,
}

impl<'a> Layout<'a> {
    fn new(text: &'a str) -> Self {
        let mut runs = Vec::new();
        let mut start = None;
        for (offset, byte) in text.bytes().enumerate() {
            match (byte == b'`', start) {
                (true, None) => start = Some(offset),
                (false, Some(s)) => {
                    runs.push(s..offset);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push(s..text.len());
        }
        Self { text, runs }
    }

    fn fences(&self) -> impl Iterator<Item = &Range<usize>> {
        self.runs.iter().filter(|run| run.len() >= 3)
    }

    fn starts_word(&self, b: usize) -> bool {
        b == 0 || self.text[..b].ends_with(char::is_whitespace)
    }

    fn is_safe(&self, b: usize) -> bool {
        if b == self.text.len() && !self.text.ends_with(char::is_whitespace) {
            return false;
        }
        if self.runs.iter().any(|run| run.start < b && b < run.end) {
            return false;
        }
        if self.fences().filter(|run| run.end <= b).count() % 2 == 1 {
            return false;
        }
        self.line_allows(b)
    }

    fn line_allows(&self, b: usize) -> bool {
        let line_start = self.text[..b].rfind('\n').map_or(0, |i| i + 1);
        if line_start == b {
            return true;
        }
        let line_end = self.text[b..].find('\n').map_or(self.text.len(), |i| b + i);
        if self
            .fences()
            .any(|run| run.start >= b && run.start < line_end)
        {
            return false;
        }

        let line = &self.text[line_start..line_end];
        let head = line.trim_start_matches(' ');
        let indent = line.len() - head.len();
        !(indent <= 3 && head.starts_with(['`', '~', '|'])) && !self.in_table(line_start)
    }

    /// Whether the line at `line_start` continues a table, that is, the block
    /// above it contains a delimiter row.
    fn in_table(&self, line_start: usize) -> bool {
        self.text[..line_start]
            .lines()
            .rev()
            .take_while(|line| !line.trim().is_empty())
            .any(is_delimiter_row)
    }
}

/// `--- | :---:` style row, with or without outer pipes.
fn is_delimiter_row(line: &str) -> bool {
    let line = line.trim();
    if !line.contains('|') {
        return false;
    }
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').all(|cell| {
        let cell = cell.trim();
        let dashes = cell.strip_prefix(':').unwrap_or(cell);
        let dashes = dashes.strip_suffix(':').unwrap_or(dashes);
        !dashes.is_empty() && dashes.bytes().all(|b| b == b'-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_buffer() -> RenderBuffer {
        RenderBuffer::new(DEFAULT_WORD_WINDOW)
    }

    #[test]
    fn test_unclosed_fence_on_prose_line_holds_everything() {
        let mut buffer = new_buffer();
        let text = "Here is code: ```js\nlet x=1";
        assert!(!buffer.update(text));
        assert_eq!(buffer.committed(), "");
        assert_eq!(buffer.pending(), text);
    }

    #[test]
    fn test_closing_fence_releases_block() {
        let mut buffer = new_buffer();
        buffer.update("Here is code: ```js\nlet x=1");
        assert!(buffer.update("Here is code: ```js\nlet x=1\n```\n"));
        assert_eq!(buffer.pending(), "");
    }

    #[test]
    fn test_prefers_word_starts() {
        let mut buffer = new_buffer();
        assert!(buffer.update("Hello wor"));
        assert_eq!(buffer.committed(), "Hello ");

        assert!(!buffer.update("Hello world"));
        assert_eq!(buffer.committed(), "Hello ");

        assert!(buffer.update("Hello world, again"));
        assert_eq!(buffer.committed(), "Hello world, ");
    }

    #[test]
    fn test_first_word_waits_for_whitespace() {
        let mut buffer = new_buffer();
        assert!(!buffer.update("Hel"));
        assert!(buffer.update("Hello "));
        assert_eq!(buffer.committed(), "Hello ");
    }

    #[test]
    fn test_long_word_splits_past_window() {
        let mut buffer = RenderBuffer::new(8);
        let word = "a".repeat(20);
        assert!(buffer.update(&word));
        assert_eq!(buffer.committed().len(), 19);
    }

    #[test]
    fn test_never_splits_grapheme_clusters() {
        let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
        let mut buffer = new_buffer();
        buffer.update(&family.repeat(12));
        assert_eq!(buffer.committed().len(), 11 * family.len());

        let accented = "e\u{301}";
        let mut buffer = new_buffer();
        buffer.update(&accented.repeat(30));
        assert_eq!(buffer.committed().len(), 29 * accented.len());
    }

    #[test]
    fn test_table_rows_commit_whole() {
        let mut buffer = new_buffer();
        buffer.update("| a | b |\n|---|---|\n| 1 | 2");
        assert_eq!(buffer.committed(), "| a | b |\n|---|---|\n");
    }

    #[test]
    fn test_pipeless_table_rows_commit_whole() {
        let mut buffer = new_buffer();
        buffer.update("a | b\n--- | :-:\n1 | 2");
        assert_eq!(buffer.committed(), "a | b\n--- | :-:\n");

        buffer.update("a | b\n--- | :-:\n1 | 2\n");
        assert_eq!(buffer.pending(), "");
    }

    #[test]
    fn test_pipes_in_prose_do_not_hold_text() {
        let mut buffer = new_buffer();
        buffer.update("use a | b to pipe it");
        assert_eq!(buffer.committed(), "use a | b to pipe ");
    }

    #[test]
    fn test_commits_up_to_an_opening_fence_line() {
        let mut buffer = new_buffer();
        buffer.update("Intro\n```rust\nfn ma");
        assert_eq!(buffer.committed(), "Intro\n");
    }

    #[test]
    fn test_does_not_split_backtick_runs() {
        let mut buffer = new_buffer();
        buffer.update("Say ``");
        assert_eq!(buffer.committed(), "Say ");
        buffer.update("Say `` x `` ok ");
        assert_eq!(buffer.committed(), "Say `` x `` ok ");
    }

    #[test]
    fn test_committed_is_monotonic() {
        let doc = "# Title\n\nSome text with `code` and more.\n\n```rust\nfn main() {}\n```\n\n\
                   | a | b |\n|---|---|\n| 1 | 2 |\n\nDone, and a very long trailing sentence here.";
        let mut buffer = new_buffer();
        let mut previous = String::new();
        let mut fed = String::new();

        for ch in doc.chars() {
            fed.push(ch);
            buffer.update(&fed);
            assert!(buffer.committed().starts_with(&previous));
            assert_eq!(format!("{}{}", buffer.committed(), buffer.pending()), fed);
            if fed.ends_with("fn ma") {
                assert_eq!(
                    buffer.committed(),
                    "# Title\n\nSome text with `code` and more.\n\n"
                );
            }
            previous = buffer.committed().to_string();
        }

        buffer.finish();
        assert_eq!(buffer.committed(), doc);
    }

    #[test]
    fn test_finish_commits_everything() {
        let mut buffer = new_buffer();
        buffer.update("Here is code: ```js\nlet x=1");
        assert!(buffer.finish());
        assert_eq!(buffer.committed(), "Here is code: ```js\nlet x=1");
        assert!(buffer.push(" more"));
        assert_eq!(buffer.pending(), "");
    }

    #[test]
    fn test_ignores_non_extending_text() {
        let mut buffer = new_buffer();
        buffer.update("Hello there ");
        assert!(!buffer.update("Goodbye"));
        assert_eq!(buffer.text(), "Hello there ");
    }
}
