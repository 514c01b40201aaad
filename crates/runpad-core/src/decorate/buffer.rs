//! Headless editor surface.

use std::collections::BTreeMap;

use super::bridge::{DecorationStyle, EditorSurface};

/// An in-memory editor: source text plus decoration and scroll state.
///
/// Hosts without a widget of their own (terminal, tests) render from this.
#[derive(Debug, Clone, Default)]
pub struct SourceBuffer {
    text: String,
    decorations: BTreeMap<usize, DecorationStyle>,
    scroll: usize,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            decorations: BTreeMap::new(),
            scroll: 1,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the whole text. Decorations are left for the bridge to retire.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    /// Decoration on a line (1-indexed), if any.
    pub fn decoration(&self, line: usize) -> Option<DecorationStyle> {
        self.decorations.get(&line).copied()
    }

    /// Decorated lines, ascending.
    pub fn decorated_lines(&self) -> Vec<usize> {
        self.decorations.keys().copied().collect()
    }

    /// Line most recently scrolled to.
    pub fn scroll_position(&self) -> usize {
        self.scroll
    }
}

impl EditorSurface for SourceBuffer {
    fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    fn apply_line_decoration(&mut self, line: usize, style: DecorationStyle) {
        self.decorations.insert(line, style);
    }

    fn clear_decorations(&mut self) {
        self.decorations.clear();
    }

    fn scroll_to_line(&mut self, line: usize) {
        self.scroll = line;
    }
}
