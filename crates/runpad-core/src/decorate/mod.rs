//! Error location and editor decorations.
//!
//! [`ErrorLocator`] turns failure text into a source line using the language
//! registry; [`DecorationBridge`] shows that line on an [`EditorSurface`] and
//! retires the highlight once it goes stale.

mod bridge;
mod buffer;
mod locator;

pub use bridge::{DecorationBridge, DecorationStyle, EditorSurface};
pub use buffer::SourceBuffer;
pub use locator::{ErrorLocation, ErrorLocator, locate};
