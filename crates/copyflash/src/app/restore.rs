//! Rebuilding the caret layout once a blink session finishes.

use crate::domain::model::{CaretPlacement, HighlightTarget};
use crate::infra::host::EditorSurface;

/// Caret layout derived from the targets of a session.
///
/// Whole-line targets come back as bare carets so a line copy never turns into a visible
/// selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePlan {
    pub primary: CaretPlacement,
    pub secondary: Vec<CaretPlacement>,
}

impl RestorePlan {
    pub fn from_targets(targets: &[HighlightTarget]) -> Option<Self> {
        let (first, rest) = targets.split_first()?;
        Some(Self {
            primary: first.into(),
            secondary: rest.iter().map(CaretPlacement::from).collect(),
        })
    }

    pub fn apply(&self, surface: &mut dyn EditorSurface) {
        surface.remove_secondary_carets();
        surface.place_primary_caret(self.primary);
        for placement in &self.secondary {
            if let Err(err) = surface.add_secondary_caret(*placement) {
                tracing::debug!(offset = placement.offset, error = %err, "secondary caret skipped");
            }
        }
    }
}
