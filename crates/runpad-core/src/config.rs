//! Runtime configuration.

use std::path::PathBuf;

use crate::draft::AutosavePolicy;
use crate::execute::DEFAULT_MAX_INPUT_ROUNDS;

/// Execution service used when none is configured.
pub const DEFAULT_EXECUTOR_URL: &str = "http://127.0.0.1:8000";

/// Settings for one editing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Base URL of the execution service. Requests go to `<url>/execute`.
    pub executor_url: String,

    /// Directory holding one JSON file per draft key.
    pub drafts_dir: PathBuf,

    pub autosave: AutosavePolicy,

    /// Resubmissions allowed after the runner reports missing input.
    pub max_input_rounds: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            executor_url: DEFAULT_EXECUTOR_URL.to_string(),
            drafts_dir: default_drafts_dir(),
            autosave: AutosavePolicy::default(),
            max_input_rounds: DEFAULT_MAX_INPUT_ROUNDS,
        }
    }
}

impl RunnerConfig {
    pub fn with_executor_url(mut self, url: impl Into<String>) -> Self {
        self.executor_url = url.into();
        self
    }

    pub fn with_drafts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.drafts_dir = dir.into();
        self
    }
}

/// Platform data directory for drafts, e.g. `~/.local/share/runpad/drafts`.
///
/// Falls back to `.runpad/drafts` under the working directory when the
/// platform has no data directory.
pub fn default_drafts_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("runpad"))
        .unwrap_or_else(|| PathBuf::from(".runpad"))
        .join("drafts")
}
