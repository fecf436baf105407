//! Reacting to copy actions: build the clipboard text, then flash what was copied.

use anyhow::{Context, Result};
use parking_lot::Mutex;

use crate::app::blink::{BlinkHandle, BlinkScheduler};
use crate::app::selection::SelectionExtractor;
use crate::domain::model::{BlinkConfig, HighlightTarget};
use crate::infra::clipboard::ClipboardSink;
use crate::infra::config::Config;
use crate::infra::highlight::HighlightStyle;
use crate::infra::host::{EditorHost, EditorSurface};

/// Action id hosts use for their built-in copy.
pub const COPY_ACTION_ID: &str = "$Copy";

/// Whether an action that just ran should be treated as a copy.
pub fn is_copy_action(action_id: Option<&str>, action_name: &str) -> bool {
    action_id == Some(COPY_ACTION_ID) || action_name.contains("Copy")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// We perform the copy: write the clipboard, then flash.
    Action,
    /// The host already copied; only flash.
    Listener,
}

/// Text placed on the clipboard for `targets`: one range verbatim, several joined by newlines.
pub fn clipboard_text(surface: &dyn EditorSurface, targets: &[HighlightTarget]) -> String {
    targets
        .iter()
        .filter_map(|target| surface.text(target.range()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of handling one copy.
#[derive(Debug)]
pub struct CopyOutcome {
    pub targets: Vec<HighlightTarget>,
    /// Text written to the clipboard, in [`CopyMode::Action`] only.
    pub copied: Option<String>,
    pub session: Option<BlinkHandle>,
}

impl CopyOutcome {
    fn nothing() -> Self {
        Self {
            targets: Vec::new(),
            copied: None,
            session: None,
        }
    }
}

/// Glues extraction, clipboard, and blink scheduling together for one host.
pub struct CopyHighlighter<H> {
    extractor: SelectionExtractor,
    scheduler: BlinkScheduler<H>,
    clipboard: Mutex<Box<dyn ClipboardSink + Send>>,
    style: HighlightStyle,
    blink: BlinkConfig,
}

impl<H: EditorHost> CopyHighlighter<H> {
    pub fn new(
        host: H,
        clipboard: Box<dyn ClipboardSink + Send>,
        style: HighlightStyle,
        blink: BlinkConfig,
    ) -> Self {
        Self {
            extractor: SelectionExtractor::new(),
            scheduler: BlinkScheduler::new(host),
            clipboard: Mutex::new(clipboard),
            style,
            blink,
        }
    }

    pub fn from_config(
        host: H,
        clipboard: Box<dyn ClipboardSink + Send>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self::new(
            host,
            clipboard,
            config.highlight_style(),
            config.blink_config()?,
        ))
    }

    pub fn scheduler(&self) -> &BlinkScheduler<H> {
        &self.scheduler
    }

    /// Handle a copy in the active editor. Must run on the host UI context.
    pub fn on_copy(&self, surface: &mut dyn EditorSurface, mode: CopyMode) -> Result<CopyOutcome> {
        if surface.is_disposed() {
            return Ok(CopyOutcome::nothing());
        }

        let targets = self.extractor.extract(&surface.carets(), &*surface);
        if targets.is_empty() {
            tracing::debug!("copy touched no ranges");
            return Ok(CopyOutcome::nothing());
        }

        let copied = match mode {
            CopyMode::Action => {
                let text = clipboard_text(&*surface, &targets);
                self.clipboard
                    .lock()
                    .copy(&text)
                    .context("failed to write copied text to the clipboard")?;
                Some(text)
            }
            CopyMode::Listener => None,
        };

        let session = self
            .scheduler
            .start(targets.clone(), self.blink, self.style)?;

        Ok(CopyOutcome {
            targets,
            copied,
            session,
        })
    }

    /// Hook for "an action ran" notifications. Ignores anything that is not a copy.
    pub fn after_action(
        &self,
        action_id: Option<&str>,
        action_name: &str,
        surface: &mut dyn EditorSurface,
    ) -> Result<Option<CopyOutcome>> {
        if !is_copy_action(action_id, action_name) {
            return Ok(None);
        }
        self.on_copy(surface, CopyMode::Listener).map(Some)
    }
}
