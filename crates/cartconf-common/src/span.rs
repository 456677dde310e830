use serde::Serialize;

/// Byte-offset span into source text. Start is inclusive, end is exclusive.
///
/// Positions are tracked as byte offsets into the original UTF-8 source
/// string. Line/column information is computed on demand via [`LineIndex`]
/// when needed for diagnostics, not eagerly per token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a new span from byte offsets.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    /// A zero-length span at the given offset.
    pub fn point(at: u32) -> Self {
        Self { start: at, end: at }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether the span is empty (zero-length).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Pre-computed index of line start positions for on-demand line/column lookup.
#[derive(Debug)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    /// Build a line index by scanning the source text for newline characters.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a 1-based (line, column) pair.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line_idx = self.line_starts.partition_point(|&start| start <= offset);
        let line_idx = line_idx.saturating_sub(1);
        let line = (line_idx as u32) + 1;
        let col = offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Return the number of lines in the source.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of the start of a 1-based line number, clamped to the
    /// last known line start if `line` is out of range.
    pub fn line_start(&self, line: u32) -> u32 {
        let idx = (line.saturating_sub(1)) as usize;
        self.line_starts
            .get(idx)
            .copied()
            .unwrap_or(*self.line_starts.last().unwrap())
    }

    /// Span covering an entire 1-based line, excluding its trailing
    /// newline if any.
    pub fn line_span(&self, line: u32, source: &str) -> Span {
        let start = self.line_start(line);
        let end = source[start as usize..]
            .find('\n')
            .map(|rel| start + rel as u32)
            .unwrap_or(source.len() as u32);
        Span::new(start, end)
    }
}
