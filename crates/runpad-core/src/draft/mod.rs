//! Draft persistence for editing surfaces.
//!
//! This module provides:
//! - [`DraftRecord`] field maps keyed by [`DraftKey`]
//! - Storage backends (JSON files, in-memory)
//! - The [`DraftStore`] with autosave, dirty tracking and the unload guard

mod backend;
mod record;
mod store;

pub use backend::{DraftBackend, FileBackend, MemoryBackend};
pub use record::{DRAFT_FORMAT_VERSION, DraftFields, DraftKey, DraftRecord};
pub use store::{AutosavePolicy, DraftStats, DraftStore, MAX_DEBOUNCE, UnloadDecision};
