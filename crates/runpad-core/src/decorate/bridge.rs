//! Line decorations on the host's code editor.

use super::locator::ErrorLocation;

/// Visual style of a whole-line decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationStyle {
    /// The line a run failed on.
    ErrorLine,
}

/// The host editor widget, as seen by the run flow.
///
/// Passed explicitly to every call so several surfaces can each own their
/// editor.
pub trait EditorSurface {
    /// Number of lines currently in the editor.
    fn line_count(&self) -> usize;

    /// Mark a whole line (1-indexed).
    fn apply_line_decoration(&mut self, line: usize, style: DecorationStyle);

    /// Remove every decoration.
    fn clear_decorations(&mut self);

    /// Bring a line (1-indexed) into view.
    fn scroll_to_line(&mut self, line: usize);
}

/// Applies and retires error highlights on an [`EditorSurface`].
#[derive(Debug, Default)]
pub struct DecorationBridge {
    /// Highlight currently shown, if any
    active: Option<ErrorLocation>,
}

impl DecorationBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight `location` and scroll to it, replacing any previous highlight.
    ///
    /// Lines past the end of the editor are clamped to the last line.
    pub fn highlight(&mut self, editor: &mut dyn EditorSurface, location: ErrorLocation) {
        editor.clear_decorations();

        let last = editor.line_count().max(1);
        let line = location.line.clamp(1, last);
        if line != location.line {
            tracing::debug!("error line {} clamped to {}", location.line, line);
        }

        editor.apply_line_decoration(line, DecorationStyle::ErrorLine);
        editor.scroll_to_line(line);
        self.active = Some(ErrorLocation { line });
    }

    /// Remove all highlights.
    pub fn clear(&mut self, editor: &mut dyn EditorSurface) {
        self.active = None;
        editor.clear_decorations();
    }

    /// The source changed; a highlight may now point at the wrong line.
    pub fn on_source_edited(&mut self, editor: &mut dyn EditorSurface) {
        if self.active.is_some() {
            self.clear(editor);
        }
    }

    /// The language changed; the previous error no longer applies.
    pub fn on_language_changed(&mut self, editor: &mut dyn EditorSurface) {
        if self.active.is_some() {
            self.clear(editor);
        }
    }

    /// The highlighted location, if any.
    pub fn active(&self) -> Option<ErrorLocation> {
        self.active
    }
}
