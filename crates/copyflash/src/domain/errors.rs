//! Domain-specific errors.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("blink count must be at least 1")]
    ZeroBlinkCount,
    #[error("blink interval must be at least 1ms")]
    ZeroBlinkInterval,
}

/// Failures reported by an editor host for a single primitive.
///
/// None of these abort a blink session: the affected target or caret is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("range {start}..{end} is outside the document")]
    StaleRange { start: usize, end: usize },
    #[error("offset {0} is outside the document")]
    OffsetOutOfBounds(usize),
    #[error("decoration {0} is not attached")]
    UnknownDecoration(u64),
    #[error("a caret already exists at offset {0}")]
    CaretExists(usize),
}
