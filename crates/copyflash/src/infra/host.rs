//! Seams between the copy-flash core and the editor that hosts it.
//!
//! The core never keeps a reference to editor state between ticks. Every read and mutation is
//! packaged as a [`UiTask`] and handed to [`EditorHost::run_on_ui`], which lends the live
//! [`EditorSurface`] to the task on the host's UI context.

use crate::domain::errors::HostError;
use crate::domain::model::{CaretPlacement, CaretPosition, DecorationHandle, TextRange};
use crate::infra::highlight::HighlightStyle;

/// Line geometry of a document.
pub trait LineMetrics {
    fn line_count(&self) -> usize;

    /// Character bounds of `line`, excluding its line separator. `None` past the last line.
    fn line_range(&self, line: usize) -> Option<TextRange>;
}

/// The editor as seen from the UI context.
pub trait EditorSurface: LineMetrics {
    /// Current carets in no particular order.
    fn carets(&self) -> Vec<CaretPosition>;

    fn text(&self, range: TextRange) -> Option<String>;

    /// Whether the editor (or its project) has been closed.
    fn is_disposed(&self) -> bool;

    fn add_decoration(
        &mut self,
        range: TextRange,
        style: &HighlightStyle,
    ) -> Result<DecorationHandle, HostError>;

    fn remove_decoration(&mut self, handle: DecorationHandle) -> Result<(), HostError>;

    /// Drop the visible selection of every caret without moving them.
    fn remove_selection(&mut self);

    fn remove_secondary_carets(&mut self);

    fn place_primary_caret(&mut self, placement: CaretPlacement);

    fn add_secondary_caret(&mut self, placement: CaretPlacement) -> Result<(), HostError>;
}

/// Unit of work executed on the host's UI context.
pub type UiTask = Box<dyn FnOnce(&mut dyn EditorSurface) + Send + 'static>;

/// Dispatch into the host's UI context.
///
/// Implementations run tasks in submission order. A host whose editor is gone may drop a task
/// without running it; sessions treat that as disposal.
pub trait EditorHost: Send + Sync + 'static {
    fn run_on_ui(&self, task: UiTask);
}

impl<H: EditorHost + ?Sized> EditorHost for std::sync::Arc<H> {
    fn run_on_ui(&self, task: UiTask) {
        (**self).run_on_ui(task)
    }
}
