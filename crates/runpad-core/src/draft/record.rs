//! Draft keys and records.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Current on-disk format of a [`DraftRecord`].
pub const DRAFT_FORMAT_VERSION: u32 = 1;

/// Field name to value map of one draft.
pub type DraftFields = BTreeMap<String, Value>;

/// Namespace of one editing surface. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DraftKey(String);

impl DraftKey {
    /// Create a key, rejecting empty or whitespace-only names.
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ValidationError::EmptyDraftKey);
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-system safe stem for this key.
    ///
    /// Unsafe characters become `_`, and a hash of the raw key is appended so
    /// that keys differing only in replaced characters do not collide.
    pub fn file_stem(&self) -> String {
        let safe: String = self
            .0
            .chars()
            .take(64)
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        let mut hasher = FxHasher::default();
        self.0.hash(&mut hasher);
        format!("{}-{:016x}", safe, hasher.finish())
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DraftKey {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for DraftKey {
    type Error = ValidationError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DraftKey> for String {
    fn from(key: DraftKey) -> Self {
        key.0
    }
}

/// In-progress editor state of one surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    /// Format tag for tolerating shape changes across releases.
    #[serde(default = "default_format_version")]
    pub format_version: u32,

    /// Current field values.
    pub fields: DraftFields,

    /// When the record last reached durable storage.
    #[serde(default)]
    pub last_saved_at: Option<DateTime<Utc>>,

    /// Whether any field was written since the record was created or cleared.
    #[serde(default)]
    pub dirty: bool,

    /// Revision of the last write this record was based on.
    #[serde(default)]
    pub revision: u64,
}

fn default_format_version() -> u32 {
    DRAFT_FORMAT_VERSION
}

impl DraftRecord {
    /// A clean record holding `defaults`.
    pub fn with_defaults(defaults: &DraftFields) -> Self {
        Self {
            format_version: DRAFT_FORMAT_VERSION,
            fields: defaults.clone(),
            last_saved_at: None,
            dirty: false,
            revision: 0,
        }
    }

    /// Get a field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a field as a string slice.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Whether any field differs from `defaults`.
    ///
    /// Fields without a default count as content unless they are null or an
    /// empty string.
    pub fn differs_from(&self, defaults: &DraftFields) -> bool {
        let changed = self.fields.iter().any(|(name, value)| match defaults.get(name) {
            Some(default) => value != default,
            None => !is_blank(value),
        });
        // A default that was removed from the record also counts as a change.
        changed || defaults.keys().any(|name| !self.fields.contains_key(name))
    }

    /// Fill in defaults for fields this record does not have.
    pub(crate) fn backfill(&mut self, defaults: &DraftFields) {
        for (name, value) in defaults {
            self.fields.entry(name.clone()).or_insert_with(|| value.clone());
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
