//! In-memory editor surface backed by a rope.
//!
//! Used by the CLI and the test suite as a stand-in for a real editor. Every mutation is recorded
//! in a journal so callers can inspect what a blink session did and in which order.

use std::collections::BTreeMap;
use std::fmt;

use ropey::Rope;

use crate::domain::errors::HostError;
use crate::domain::model::{CaretPlacement, CaretPosition, DecorationHandle, TextRange};
use crate::infra::highlight::HighlightStyle;
use crate::infra::host::{EditorSurface, LineMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub offset: usize,
    pub selection: Option<TextRange>,
}

impl Caret {
    pub fn at(offset: usize) -> Self {
        Self {
            offset,
            selection: None,
        }
    }

    /// A caret sitting at the end of `range` with the range selected.
    pub fn selecting(range: TextRange) -> Self {
        Self {
            offset: range.end,
            selection: Some(range),
        }
    }
}

impl From<CaretPlacement> for Caret {
    fn from(placement: CaretPlacement) -> Self {
        Self {
            offset: placement.offset,
            selection: placement.selection,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub range: TextRange,
    pub style: HighlightStyle,
}

/// Mutations applied to a [`MemoryEditor`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    DecorationAdded {
        handle: DecorationHandle,
        range: TextRange,
    },
    DecorationRemoved(DecorationHandle),
    SelectionRemoved,
    SecondaryCaretsRemoved,
    PrimaryPlaced(CaretPlacement),
    SecondaryAdded(CaretPlacement),
}

impl fmt::Display for SurfaceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceEvent::DecorationAdded { handle, range } => {
                write!(f, "decorate #{} {}..{}", handle.0, range.start, range.end)
            }
            SurfaceEvent::DecorationRemoved(handle) => write!(f, "undecorate #{}", handle.0),
            SurfaceEvent::SelectionRemoved => f.write_str("hide selection"),
            SurfaceEvent::SecondaryCaretsRemoved => f.write_str("drop secondary carets"),
            SurfaceEvent::PrimaryPlaced(placement) => {
                write!(f, "primary {}", DisplayPlacement(placement))
            }
            SurfaceEvent::SecondaryAdded(placement) => {
                write!(f, "secondary {}", DisplayPlacement(placement))
            }
        }
    }
}

struct DisplayPlacement<'a>(&'a CaretPlacement);

impl fmt::Display for DisplayPlacement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0.offset)?;
        if let Some(range) = self.0.selection {
            write!(f, " [{}..{}]", range.start, range.end)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryEditor {
    rope: Rope,
    primary: Caret,
    secondary: Vec<Caret>,
    decorations: BTreeMap<DecorationHandle, Decoration>,
    next_decoration: u64,
    disposed: bool,
    journal: Vec<SurfaceEvent>,
}

impl MemoryEditor {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            primary: Caret::at(0),
            secondary: Vec::new(),
            decorations: BTreeMap::new(),
            next_decoration: 1,
            disposed: false,
            journal: Vec::new(),
        }
    }

    /// Length of the document in characters.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Character offset of `column` on `line`, clamped to the end of the line.
    pub fn offset_at(&self, line: usize, column: usize) -> Option<usize> {
        let range = self.line_range(line)?;
        Some(range.start + column.min(range.len()))
    }

    /// Replace the caret layout. The first caret becomes the primary one.
    pub fn set_carets(&mut self, carets: Vec<Caret>) -> Result<(), HostError> {
        for caret in &carets {
            self.check_offset(caret.offset)?;
            if let Some(range) = caret.selection {
                self.check_range(range)?;
            }
        }

        let mut carets = carets.into_iter();
        self.primary = carets.next().unwrap_or(Caret::at(0));
        self.secondary = carets.collect();
        Ok(())
    }

    pub fn primary(&self) -> Caret {
        self.primary
    }

    pub fn secondary(&self) -> &[Caret] {
        &self.secondary
    }

    /// All carets, primary first.
    pub fn caret_layout(&self) -> Vec<Caret> {
        std::iter::once(self.primary)
            .chain(self.secondary.iter().copied())
            .collect()
    }

    pub fn decorations(&self) -> impl Iterator<Item = (&DecorationHandle, &Decoration)> {
        self.decorations.iter()
    }

    pub fn live_decorations(&self) -> usize {
        self.decorations.len()
    }

    pub fn journal(&self) -> &[SurfaceEvent] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.journal)
    }

    /// Mark the editor as closed. Attached decorations stay until removed.
    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    fn check_offset(&self, offset: usize) -> Result<(), HostError> {
        if offset > self.rope.len_chars() {
            return Err(HostError::OffsetOutOfBounds(offset));
        }
        Ok(())
    }

    fn check_range(&self, range: TextRange) -> Result<(), HostError> {
        if range.end > self.rope.len_chars() {
            return Err(HostError::StaleRange {
                start: range.start,
                end: range.end,
            });
        }
        Ok(())
    }

    fn has_caret_at(&self, offset: usize) -> bool {
        self.primary.offset == offset || self.secondary.iter().any(|c| c.offset == offset)
    }

    fn position_of(&self, caret: &Caret) -> CaretPosition {
        let offset = caret.offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        CaretPosition {
            line,
            column: offset - self.rope.line_to_char(line),
            selection: caret.selection.map(|range| (range.start, range.end)),
        }
    }
}

impl LineMetrics for MemoryEditor {
    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_range(&self, line: usize) -> Option<TextRange> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let start = self.rope.line_to_char(line);
        let slice = self.rope.line(line);
        let mut end = start + slice.len_chars();

        if end > start {
            let last = self.rope.char(end - 1);
            if last == '\n' {
                end -= 1;
                if end > start && self.rope.char(end - 1) == '\r' {
                    end -= 1;
                }
            } else if is_line_break(last) {
                end -= 1;
            }
        }
        Some(TextRange::new(start, end))
    }
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

impl EditorSurface for MemoryEditor {
    fn carets(&self) -> Vec<CaretPosition> {
        std::iter::once(&self.primary)
            .chain(self.secondary.iter())
            .map(|caret| self.position_of(caret))
            .collect()
    }

    fn text(&self, range: TextRange) -> Option<String> {
        self.check_range(range).ok()?;
        Some(self.rope.slice(range.start..range.end).to_string())
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn add_decoration(
        &mut self,
        range: TextRange,
        style: &HighlightStyle,
    ) -> Result<DecorationHandle, HostError> {
        self.check_range(range)?;
        let handle = DecorationHandle(self.next_decoration);
        self.next_decoration += 1;
        self.decorations.insert(
            handle,
            Decoration {
                range,
                style: *style,
            },
        );
        self.journal
            .push(SurfaceEvent::DecorationAdded { handle, range });
        Ok(handle)
    }

    fn remove_decoration(&mut self, handle: DecorationHandle) -> Result<(), HostError> {
        self.decorations
            .remove(&handle)
            .ok_or(HostError::UnknownDecoration(handle.0))?;
        self.journal.push(SurfaceEvent::DecorationRemoved(handle));
        Ok(())
    }

    fn remove_selection(&mut self) {
        self.primary.selection = None;
        for caret in &mut self.secondary {
            caret.selection = None;
        }
        self.journal.push(SurfaceEvent::SelectionRemoved);
    }

    fn remove_secondary_carets(&mut self) {
        self.secondary.clear();
        self.journal.push(SurfaceEvent::SecondaryCaretsRemoved);
    }

    fn place_primary_caret(&mut self, placement: CaretPlacement) {
        let len = self.rope.len_chars();
        let placement = CaretPlacement {
            offset: placement.offset.min(len),
            selection: placement.selection.filter(|range| range.end <= len),
        };
        self.primary = placement.into();
        self.journal.push(SurfaceEvent::PrimaryPlaced(placement));
    }

    fn add_secondary_caret(&mut self, placement: CaretPlacement) -> Result<(), HostError> {
        self.check_offset(placement.offset)?;
        if let Some(range) = placement.selection {
            self.check_range(range)?;
        }
        if self.has_caret_at(placement.offset) {
            return Err(HostError::CaretExists(placement.offset));
        }
        self.secondary.push(placement.into());
        self.journal.push(SurfaceEvent::SecondaryAdded(placement));
        Ok(())
    }
}
