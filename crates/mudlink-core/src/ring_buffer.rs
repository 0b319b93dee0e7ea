//! Bounded, line-aware scrollback buffer.
//!
//! Received text is kept as a queue of line fragments (each holding its own
//! trailing `\n`, if any) plus a running byte total, so appends never rebuild
//! the whole history. When the total passes the ceiling, whole fragments are
//! dropped from the front; only a single oversized fragment is cut mid-line.

use std::collections::VecDeque;

/// A byte-bounded scrollback buffer of line fragments.
#[derive(Debug, Clone, Default)]
pub struct RingBuffer {
    fragments: VecDeque<String>,
    /// Sum of the UTF-8 lengths of all retained fragments.
    total_bytes: usize,
    /// Maximum retained bytes (0 = unbounded).
    ceiling: usize,
}

impl RingBuffer {
    /// Create a buffer that retains at most `ceiling` bytes (0 = never trim).
    pub fn new(ceiling: usize) -> Self {
        Self {
            fragments: VecDeque::new(),
            total_bytes: 0,
            ceiling,
        }
    }

    /// Append a chunk of received text.
    ///
    /// An unterminated last fragment is extended by the first line of the
    /// chunk, so a line delivered over several reads stays one fragment.
    pub fn append(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }

        let mut pieces = chunk.split_inclusive('\n');

        if let Some(last) = self.fragments.back_mut() {
            if !last.ends_with('\n') {
                if let Some(first) = pieces.next() {
                    last.push_str(first);
                    self.total_bytes += first.len();
                }
            }
        }

        for piece in pieces {
            self.total_bytes += piece.len();
            self.fragments.push_back(piece.to_owned());
        }

        self.trim();
    }

    /// The retained text as one contiguous string.
    pub fn full_text(&self) -> String {
        let mut text = String::with_capacity(self.total_bytes);
        for fragment in &self.fragments {
            text.push_str(fragment);
        }
        text
    }

    /// The newest `bytes` bytes of retained text (all of it if fewer are
    /// retained). Only walks the fragments it needs.
    pub fn tail(&self, bytes: usize) -> String {
        let bytes = bytes.min(self.total_bytes);
        let mut taken = 0;
        let mut parts = Vec::new();
        for fragment in self.fragments.iter().rev() {
            if taken >= bytes {
                break;
            }
            taken += fragment.len();
            parts.push(fragment.as_str());
        }

        let mut text = String::with_capacity(taken);
        for part in parts.iter().rev() {
            text.push_str(part);
        }
        let mut start = taken - bytes;
        while !text.is_char_boundary(start) {
            start += 1;
        }
        text.split_off(start)
    }

    /// Number of retained fragments.
    pub fn line_count(&self) -> usize {
        self.fragments.len()
    }

    /// Retained size in bytes.
    pub fn len(&self) -> usize {
        self.total_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.total_bytes == 0
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Change the ceiling, trimming immediately if the buffer is now over it.
    pub fn set_ceiling(&mut self, ceiling: usize) {
        self.ceiling = ceiling;
        self.trim();
    }

    /// Iterate over retained fragments, oldest first.
    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.total_bytes = 0;
    }

    fn trim(&mut self) {
        if self.ceiling == 0 || self.total_bytes <= self.ceiling {
            return;
        }

        while self.total_bytes > self.ceiling && self.fragments.len() > 1 {
            if let Some(oldest) = self.fragments.pop_front() {
                self.total_bytes -= oldest.len();
            }
        }

        if self.total_bytes > self.ceiling {
            // One fragment larger than the ceiling: keep its newest bytes.
            if let Some(only) = self.fragments.front_mut() {
                let mut cut = self.total_bytes - self.ceiling;
                while !only.is_char_boundary(cut) {
                    cut += 1;
                }
                only.drain(..cut);
                self.total_bytes -= cut;
            }
        }
    }
}
