//! Turning caret snapshots into highlight targets.

use crate::domain::model::{CaretPosition, HighlightTarget};
use crate::infra::host::LineMetrics;

/// Produces the ranges a copy touched, in caret order.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectionExtractor;

impl SelectionExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract targets from `carets`.
    ///
    /// Carets carrying a selection always yield that selection. Empty carets yield the bounds of
    /// their line, once per line; carets past the end of the document yield nothing.
    pub fn extract(
        &self,
        carets: &[CaretPosition],
        metrics: &(impl LineMetrics + ?Sized),
    ) -> Vec<HighlightTarget> {
        let mut sorted = carets.to_vec();
        sorted.sort_by_key(|caret| (caret.line, caret.column));

        let line_count = metrics.line_count();
        let mut last_empty_line = None;
        let mut targets = Vec::with_capacity(sorted.len());

        for caret in &sorted {
            if let Some(range) = caret.explicit_selection() {
                targets.push(HighlightTarget::selection(range));
                continue;
            }

            if last_empty_line == Some(caret.line) || caret.line >= line_count {
                continue;
            }

            match metrics.line_range(caret.line) {
                Some(range) => {
                    targets.push(HighlightTarget::whole_line(range));
                    last_empty_line = Some(caret.line);
                }
                None => {
                    tracing::debug!(line = caret.line, "line metrics missing for caret");
                }
            }
        }

        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TextRange;

    /// Lines of fixed text separated by single `\n` characters.
    struct Lines(Vec<&'static str>);

    impl LineMetrics for Lines {
        fn line_count(&self) -> usize {
            self.0.len()
        }

        fn line_range(&self, line: usize) -> Option<TextRange> {
            let text = self.0.get(line)?;
            let start: usize = self.0[..line].iter().map(|l| l.chars().count() + 1).sum();
            Some(TextRange::new(start, start + text.chars().count()))
        }
    }

    fn doc() -> Lines {
        Lines(vec!["alpha", "beta gamma", "", "delta"])
    }

    #[test]
    fn empty_carets_on_distinct_lines_expand_to_lines() {
        let carets = [CaretPosition::at(3, 1), CaretPosition::at(0, 2)];
        let targets = SelectionExtractor::new().extract(&carets, &doc());

        assert_eq!(
            targets,
            vec![
                HighlightTarget::whole_line(TextRange::new(0, 5)),
                HighlightTarget::whole_line(TextRange::new(18, 23)),
            ]
        );
        assert!(targets.iter().all(|t| !t.was_explicit_selection));
    }

    #[test]
    fn empty_carets_on_same_line_emit_once() {
        let carets = [CaretPosition::at(1, 7), CaretPosition::at(1, 0)];
        let targets = SelectionExtractor::new().extract(&carets, &doc());
        assert_eq!(
            targets,
            vec![HighlightTarget::whole_line(TextRange::new(6, 16))]
        );
    }

    #[test]
    fn selections_bypass_line_dedup() {
        let carets = [
            CaretPosition::at(1, 4).with_selection(6, 10),
            CaretPosition::at(1, 10).with_selection(11, 16),
            CaretPosition::at(1, 2),
        ];
        let targets = SelectionExtractor::new().extract(&carets, &doc());

        assert_eq!(
            targets,
            vec![
                HighlightTarget::whole_line(TextRange::new(6, 16)),
                HighlightTarget::selection(TextRange::new(6, 10)),
                HighlightTarget::selection(TextRange::new(11, 16)),
            ]
        );
    }

    #[test]
    fn carets_past_the_document_are_dropped() {
        let carets = [CaretPosition::at(9, 0), CaretPosition::at(2, 0)];
        let targets = SelectionExtractor::new().extract(&carets, &doc());
        assert_eq!(
            targets,
            vec![HighlightTarget::whole_line(TextRange::new(17, 17))]
        );

        let targets = SelectionExtractor::new().extract(&[CaretPosition::at(4, 0)], &doc());
        assert!(targets.is_empty());
    }

    #[test]
    fn collapsed_selection_counts_as_empty_caret() {
        let carets = [CaretPosition::at(0, 3).with_selection(3, 3)];
        let targets = SelectionExtractor::new().extract(&carets, &doc());
        assert_eq!(
            targets,
            vec![HighlightTarget::whole_line(TextRange::new(0, 5))]
        );
    }
}
