//! Core of the runpad "run code" editing surface.
//!
//! This crate provides:
//! - A language-capability registry shared by input detection and error location
//! - Static detection of programs that read standard input
//! - Draft persistence with autosave and an unload guard
//! - The run state machine and the HTTP client for the execution service
//! - Error-line location and editor decorations

pub mod config;
pub mod decorate;
pub mod detect;
pub mod draft;
pub mod error;
pub mod execute;
pub mod language;

pub use config::RunnerConfig;
pub use decorate::{DecorationBridge, EditorSurface, ErrorLocation, ErrorLocator, SourceBuffer};
pub use detect::{InputDetector, InputRequirement};
pub use draft::{AutosavePolicy, DraftFields, DraftKey, DraftRecord, DraftStore, UnloadDecision};
pub use error::{Error, Result, StorageError, TransportError, ValidationError};
pub use execute::{
    AbortHandle, ExecutionBackend, ExecutionRequest, ExecutionResult, HttpExecutionBackend,
    Notification, NotificationLevel, NotificationSink, RunOrchestrator, RunState, RunStep,
};
pub use language::{LanguageId, LanguageRegistry};
