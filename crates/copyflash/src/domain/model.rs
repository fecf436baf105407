//! Domain models for carets, highlight targets, and blink timing.

use std::time::Duration;

use serde::Serialize;

use crate::domain::errors::DomainError;

/// Half-open character range within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    /// Build a range, swapping the bounds when given in reverse.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl From<(usize, usize)> for TextRange {
    fn from((start, end): (usize, usize)) -> Self {
        Self::new(start, end)
    }
}

/// Snapshot of one cursor at extraction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaretPosition {
    pub line: usize,
    pub column: usize,
    /// Selection start/end offsets carried by the caret, if any.
    pub selection: Option<(usize, usize)>,
}

impl CaretPosition {
    pub fn at(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            selection: None,
        }
    }

    pub fn with_selection(mut self, start: usize, end: usize) -> Self {
        self.selection = Some((start, end));
        self
    }

    /// The selection range when it spans at least one character.
    pub fn explicit_selection(&self) -> Option<TextRange> {
        self.selection
            .map(TextRange::from)
            .filter(|range| !range.is_empty())
    }
}

/// A document range to flash, tagged with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightTarget {
    pub start_offset: usize,
    pub end_offset: usize,
    /// `false` for a whole-line copy synthesized from an empty caret.
    pub was_explicit_selection: bool,
}

impl HighlightTarget {
    pub fn selection(range: TextRange) -> Self {
        Self {
            start_offset: range.start,
            end_offset: range.end,
            was_explicit_selection: true,
        }
    }

    pub fn whole_line(range: TextRange) -> Self {
        Self {
            start_offset: range.start,
            end_offset: range.end,
            was_explicit_selection: false,
        }
    }

    pub fn range(&self) -> TextRange {
        TextRange::new(self.start_offset, self.end_offset)
    }
}

/// Timing for one blink session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlinkConfig {
    blink_count: u32,
    blink_interval_ms: u64,
}

impl BlinkConfig {
    pub fn new(blink_count: u32, blink_interval_ms: u64) -> Result<Self, DomainError> {
        if blink_count == 0 {
            return Err(DomainError::ZeroBlinkCount);
        }
        if blink_interval_ms == 0 {
            return Err(DomainError::ZeroBlinkInterval);
        }
        Ok(Self {
            blink_count,
            blink_interval_ms,
        })
    }

    pub fn blink_count(&self) -> u32 {
        self.blink_count
    }

    pub fn blink_interval_ms(&self) -> u64 {
        self.blink_interval_ms
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms)
    }

    /// Number of ON/OFF transitions: one of each per blink.
    pub fn total_ticks(&self) -> u32 {
        self.blink_count.saturating_mul(2)
    }
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            blink_count: 1,
            blink_interval_ms: 150,
        }
    }
}

/// Opaque id of a decoration attached by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DecorationHandle(pub u64);

/// One caret of a restored layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaretPlacement {
    pub offset: usize,
    pub selection: Option<TextRange>,
}

impl From<&HighlightTarget> for CaretPlacement {
    fn from(target: &HighlightTarget) -> Self {
        Self {
            offset: target.end_offset,
            selection: target.was_explicit_selection.then(|| target.range()),
        }
    }
}
