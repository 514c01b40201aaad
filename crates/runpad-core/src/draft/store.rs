//! Draft store with autosave.
//!
//! The store never fails towards the editing surface. Storage errors are
//! logged, the store switches to in-memory operation, and editing carries on
//! without autosave.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;

use crate::error::StorageError;

use super::backend::{DraftBackend, FileBackend};
use super::record::{DRAFT_FORMAT_VERSION, DraftFields, DraftKey, DraftRecord};

/// Upper bound on the debounce window, bounding how much typing a crash can lose.
pub const MAX_DEBOUNCE: Duration = Duration::from_secs(3);

/// When field writes reach storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutosavePolicy {
    /// Persist on every write.
    #[default]
    WriteThrough,

    /// Persist at most once per window, measured from the first unsaved write.
    Debounced(Duration),
}

impl AutosavePolicy {
    /// Debounced policy with the window clamped to [`MAX_DEBOUNCE`].
    pub fn debounced(window: Duration) -> Self {
        Self::Debounced(window.min(MAX_DEBOUNCE))
    }
}

/// Whether leaving the surface needs confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnloadDecision {
    /// Nothing would be lost.
    Allow,

    /// These drafts hold content; ask before leaving.
    Prompt { keys: Vec<DraftKey> },
}

impl UnloadDecision {
    pub fn needs_prompt(&self) -> bool {
        matches!(self, UnloadDecision::Prompt { .. })
    }
}

/// Persistent per-surface draft state.
pub struct DraftStore {
    /// Durable storage, unused once degraded
    backend: Box<dyn DraftBackend>,

    /// Autosave policy
    policy: AutosavePolicy,

    /// Records of every managed key
    records: HashMap<DraftKey, DraftRecord>,

    /// Declared defaults per key
    defaults: HashMap<DraftKey, DraftFields>,

    /// Keys with unsaved writes, with the time of the first one
    pending: HashMap<DraftKey, Instant>,

    /// Writes that found a newer revision in storage
    conflicts: usize,

    /// Storage failed; operating in memory only
    degraded: bool,
}

impl DraftStore {
    /// Create a store on top of `backend`.
    pub fn new(backend: impl DraftBackend + 'static, policy: AutosavePolicy) -> Self {
        Self {
            backend: Box::new(backend),
            policy,
            records: HashMap::new(),
            defaults: HashMap::new(),
            pending: HashMap::new(),
            conflicts: 0,
            degraded: false,
        }
    }

    /// Create a store persisting into `dir`.
    ///
    /// If the directory cannot be used the store starts degraded.
    pub fn open_dir(dir: impl AsRef<Path>, policy: AutosavePolicy) -> Self {
        match FileBackend::open(dir) {
            Ok(backend) => Self::new(backend, policy),
            Err(e) => {
                tracing::warn!("Draft storage unavailable, autosave disabled: {}", e);
                let mut store = Self::new(super::MemoryBackend::new(), policy);
                store.degraded = true;
                store
            }
        }
    }

    /// Store that keeps drafts for the lifetime of the process only.
    pub fn in_memory() -> Self {
        Self::new(super::MemoryBackend::new(), AutosavePolicy::WriteThrough)
    }

    /// Declare default field values for `key`.
    ///
    /// Defaults are used when the record is first created and by [`clear`](Self::clear).
    pub fn register_defaults(&mut self, key: &DraftKey, defaults: DraftFields) {
        if let Some(record) = self.records.get_mut(key) {
            record.backfill(&defaults);
        }
        self.defaults.insert(key.clone(), defaults);
    }

    /// Current record for `key`, created from defaults (or storage) on first use.
    pub fn get(&mut self, key: &DraftKey) -> &DraftRecord {
        self.ensure_loaded(key)
    }

    /// Declare defaults and return the record in one step.
    pub fn open(&mut self, key: &DraftKey, defaults: DraftFields) -> &DraftRecord {
        self.register_defaults(key, defaults);
        self.ensure_loaded(key)
    }

    /// Write one field.
    pub fn set_field(&mut self, key: &DraftKey, field: impl Into<String>, value: impl Into<Value>) {
        let record = self.ensure_loaded(key);
        record.fields.insert(field.into(), value.into());
        record.dirty = true;
        self.schedule_persist(key);
    }

    /// Write several fields at once; persisted as a single write.
    pub fn set_fields(&mut self, key: &DraftKey, fields: DraftFields) {
        let record = self.ensure_loaded(key);
        record.fields.extend(fields);
        record.dirty = true;
        self.schedule_persist(key);
    }

    /// Reset `key` to its defaults.
    ///
    /// Returns `false` if the record was already at its defaults.
    pub fn clear(&mut self, key: &DraftKey) -> bool {
        let defaults = self.defaults.get(key).cloned().unwrap_or_default();
        let record = self.ensure_loaded(key);
        let at_defaults = !record.differs_from(&defaults);

        record.fields = defaults;
        record.dirty = false;
        record.last_saved_at = None;
        self.pending.remove(key);

        if !self.degraded
            && let Err(e) = self.backend.remove(key)
        {
            self.degrade(key, &e);
        }

        !at_defaults
    }

    /// Whether any field of `key` differs from its default.
    pub fn has_content(&mut self, key: &DraftKey) -> bool {
        let defaults = self.defaults.get(key).cloned().unwrap_or_default();
        self.ensure_loaded(key).differs_from(&defaults)
    }

    /// Whether leaving now would discard draft content.
    pub fn unload_guard(&self) -> UnloadDecision {
        let empty = DraftFields::new();
        let mut keys: Vec<DraftKey> = self
            .records
            .iter()
            .filter(|(key, record)| record.differs_from(self.defaults.get(*key).unwrap_or(&empty)))
            .map(|(key, _)| key.clone())
            .collect();

        if keys.is_empty() {
            return UnloadDecision::Allow;
        }
        keys.sort();
        UnloadDecision::Prompt { keys }
    }

    /// When `key` last reached storage.
    pub fn last_saved_at(&self, key: &DraftKey) -> Option<chrono::DateTime<Utc>> {
        self.records.get(key).and_then(|r| r.last_saved_at)
    }

    /// Whether storage failed and the store runs in memory only.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Persist every pending write now.
    pub fn flush(&mut self) {
        let keys: Vec<DraftKey> = self.pending.drain().map(|(key, _)| key).collect();
        for key in keys {
            self.persist(&key);
        }
    }

    /// Persist pending writes whose debounce window has elapsed at `now`.
    ///
    /// Returns the number of records written.
    pub fn flush_due(&mut self, now: Instant) -> usize {
        let AutosavePolicy::Debounced(window) = self.policy else {
            return 0;
        };
        let due: Vec<DraftKey> = self
            .pending
            .iter()
            .filter(|(_, since)| now.saturating_duration_since(**since) >= window)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &due {
            self.pending.remove(key);
            self.persist(key);
        }
        due.len()
    }

    /// Get statistics about the store.
    pub fn stats(&self) -> DraftStats {
        DraftStats {
            managed_keys: self.records.len(),
            pending_writes: self.pending.len(),
            conflicts: self.conflicts,
            degraded: self.degraded,
        }
    }

    fn ensure_loaded(&mut self, key: &DraftKey) -> &mut DraftRecord {
        if !self.records.contains_key(key) {
            let defaults = self.defaults.get(key).cloned().unwrap_or_default();
            let record = self.load_or_default(key, &defaults);
            self.records.insert(key.clone(), record);
        }
        self.records
            .entry(key.clone())
            .or_insert_with(|| DraftRecord::with_defaults(&DraftFields::new()))
    }

    fn load_or_default(&mut self, key: &DraftKey, defaults: &DraftFields) -> DraftRecord {
        if self.degraded {
            return DraftRecord::with_defaults(defaults);
        }

        match self.backend.load(key) {
            Ok(Some(mut record)) if record.format_version <= DRAFT_FORMAT_VERSION => {
                record.backfill(defaults);
                tracing::debug!("Restored draft {} (revision {})", key, record.revision);
                record
            }
            Ok(Some(record)) => {
                tracing::warn!(
                    "Ignoring draft {} written by a newer format (v{} > v{})",
                    key,
                    record.format_version,
                    DRAFT_FORMAT_VERSION
                );
                let mut fresh = DraftRecord::with_defaults(defaults);
                // Keep the revision so the next write does not look like a conflict.
                fresh.revision = record.revision;
                fresh
            }
            Ok(None) => DraftRecord::with_defaults(defaults),
            Err(StorageError::Serialization(e)) => {
                tracing::warn!("Discarding unreadable draft {}: {}", key, e);
                DraftRecord::with_defaults(defaults)
            }
            Err(e) => {
                self.degrade(key, &e);
                DraftRecord::with_defaults(defaults)
            }
        }
    }

    fn schedule_persist(&mut self, key: &DraftKey) {
        match self.policy {
            AutosavePolicy::WriteThrough => self.persist(key),
            AutosavePolicy::Debounced(_) => {
                self.pending.entry(key.clone()).or_insert_with(Instant::now);
            }
        }
    }

    /// Write the in-memory record of `key` to storage.
    fn persist(&mut self, key: &DraftKey) {
        if self.degraded {
            return;
        }
        let Some(record) = self.records.get(key) else {
            return;
        };

        let stored_revision = match self.backend.load(key) {
            Ok(stored) => stored.map(|r| r.revision).unwrap_or(0),
            // An unreadable record will be overwritten.
            Err(StorageError::Serialization(_)) => 0,
            Err(e) => {
                self.degrade(key, &e);
                return;
            }
        };

        let mut next = record.clone();
        if stored_revision > record.revision {
            // Another writer (tab, window, process) saved this key since we
            // last did. Ours is the latest user intent: overwrite, but count it.
            self.conflicts += 1;
            tracing::warn!(
                "Draft {} was changed elsewhere (revision {} > {}); overwriting",
                key,
                stored_revision,
                record.revision
            );
        }
        next.revision = stored_revision.max(record.revision) + 1;
        next.last_saved_at = Some(Utc::now());

        match self.backend.store(key, &next) {
            Ok(()) => {
                tracing::trace!("Saved draft {} (revision {})", key, next.revision);
                self.records.insert(key.clone(), next);
            }
            Err(e) => self.degrade(key, &e),
        }
    }

    fn degrade(&mut self, key: &DraftKey, err: &StorageError) {
        if !self.degraded {
            tracing::warn!(
                "Draft storage failed for {}, continuing without autosave: {}",
                key,
                err
            );
        }
        self.degraded = true;
        self.pending.clear();
    }
}

impl Drop for DraftStore {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            self.flush();
        }
    }
}

/// Statistics about the draft store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftStats {
    /// Number of keys with a record in memory
    pub managed_keys: usize,

    /// Number of keys with writes not yet persisted
    pub pending_writes: usize,

    /// Number of writes that overwrote a newer stored revision
    pub conflicts: usize,

    /// Whether the store runs without persistence
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::MemoryBackend;
    use serde_json::json;
    use std::sync::Arc;

    fn key() -> DraftKey {
        DraftKey::new("code-runner").unwrap()
    }

    fn defaults() -> DraftFields {
        let mut d = DraftFields::new();
        d.insert("code".to_string(), json!(""));
        d.insert("language".to_string(), json!("python"));
        d
    }

    /// Backend whose every call fails, as with storage disabled.
    struct BrokenBackend;

    impl DraftBackend for BrokenBackend {
        fn load(&self, _: &DraftKey) -> Result<Option<DraftRecord>, StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
        fn store(&self, _: &DraftKey, _: &DraftRecord) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
        fn remove(&self, _: &DraftKey) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
    }

    #[test]
    fn test_get_creates_from_defaults() {
        let mut store = DraftStore::in_memory();
        let record = store.open(&key(), defaults()).clone();
        assert_eq!(record.field_str("language"), Some("python"));
        assert!(!record.dirty);
        assert!(record.last_saved_at.is_none());

        // Second call sees the same record.
        assert_eq!(store.get(&key()), &record);
    }

    #[test]
    fn test_set_field_marks_dirty_and_saves() {
        let mut store = DraftStore::in_memory();
        store.register_defaults(&key(), defaults());
        store.set_field(&key(), "code", "print('hi')");

        let record = store.get(&key());
        assert!(record.dirty);
        assert_eq!(record.field_str("code"), Some("print('hi')"));
        assert_eq!(record.revision, 1);
        assert!(store.last_saved_at(&key()).is_some());
    }

    #[test]
    fn test_round_trip_through_backend() {
        let backend = Arc::new(MemoryBackend::new());
        let mut fields = DraftFields::new();
        fields.insert("code".to_string(), json!("x = 1"));
        fields.insert("language".to_string(), json!("ruby"));
        fields.insert("meta".to_string(), json!({"tab": 2, "wrap": true}));

        {
            let mut store = DraftStore::new(backend.clone(), AutosavePolicy::WriteThrough);
            store.register_defaults(&key(), defaults());
            store.set_fields(&key(), fields.clone());
        }

        let mut reloaded = DraftStore::new(backend, AutosavePolicy::WriteThrough);
        let record = reloaded.open(&key(), defaults());
        for (name, value) in &fields {
            assert_eq!(record.field(name), Some(value));
        }
        assert!(record.dirty);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut store = DraftStore::in_memory();
        store.register_defaults(&key(), defaults());
        store.set_field(&key(), "code", "1 + 1");

        assert!(store.clear(&key()));
        assert!(!store.clear(&key()));
        assert_eq!(store.get(&key()).fields, defaults());
    }

    #[test]
    fn test_clear_after_edit_reverted() {
        let mut store = DraftStore::in_memory();
        store.register_defaults(&key(), defaults());
        store.set_field(&key(), "code", "x");
        store.set_field(&key(), "code", "");

        assert!(store.get(&key()).dirty);
        assert!(!store.has_content(&key()));
        assert!(!store.clear(&key()));
        assert!(!store.get(&key()).dirty);
    }

    #[test]
    fn test_has_content_lifecycle() {
        let mut store = DraftStore::in_memory();
        store.register_defaults(&key(), defaults());

        assert!(!store.has_content(&key()));
        store.set_field(&key(), "code", "print(1)");
        assert!(store.has_content(&key()));
        store.clear(&key());
        assert!(!store.has_content(&key()));
    }

    #[test]
    fn test_unload_guard() {
        let mut store = DraftStore::in_memory();
        store.register_defaults(&key(), defaults());
        let other = DraftKey::new("manual-note").unwrap();

        store.get(&key());
        assert_eq!(store.unload_guard(), UnloadDecision::Allow);

        store.set_field(&other, "body", "notes");
        store.set_field(&key(), "code", "x");
        assert_eq!(
            store.unload_guard(),
            UnloadDecision::Prompt {
                keys: vec![key(), other.clone()]
            }
        );

        store.clear(&key());
        store.clear(&other);
        assert!(!store.unload_guard().needs_prompt());
    }

    #[test]
    fn test_storage_failure_degrades_to_memory() {
        let mut store = DraftStore::new(BrokenBackend, AutosavePolicy::WriteThrough);
        store.register_defaults(&key(), defaults());

        store.set_field(&key(), "code", "still editable");
        assert!(store.is_degraded());
        assert_eq!(store.get(&key()).field_str("code"), Some("still editable"));
        assert!(store.last_saved_at(&key()).is_none());
        assert!(store.clear(&key()));
    }

    #[test]
    fn test_debounced_writes() {
        let backend = Arc::new(MemoryBackend::new());
        let mut store = DraftStore::new(
            backend.clone(),
            AutosavePolicy::debounced(Duration::from_millis(500)),
        );
        store.set_field(&key(), "code", "a");
        store.set_field(&key(), "code", "ab");

        // Visible in memory immediately, not yet persisted.
        assert_eq!(store.get(&key()).field_str("code"), Some("ab"));
        assert!(backend.load(&key()).unwrap().is_none());
        assert_eq!(store.stats().pending_writes, 1);

        assert_eq!(store.flush_due(Instant::now()), 0);
        assert_eq!(store.flush_due(Instant::now() + Duration::from_secs(1)), 1);
        let stored = backend.load(&key()).unwrap().unwrap();
        assert_eq!(stored.field_str("code"), Some("ab"));
        assert_eq!(stored.revision, 1);
    }

    #[test]
    fn test_debounce_window_clamped() {
        assert_eq!(
            AutosavePolicy::debounced(Duration::from_secs(60)),
            AutosavePolicy::Debounced(MAX_DEBOUNCE)
        );
    }

    #[test]
    fn test_drop_flushes_pending() {
        let backend = Arc::new(MemoryBackend::new());
        {
            let mut store = DraftStore::new(
                backend.clone(),
                AutosavePolicy::debounced(Duration::from_secs(2)),
            );
            store.set_field(&key(), "code", "unsaved");
        }
        assert_eq!(
            backend.load(&key()).unwrap().unwrap().field_str("code"),
            Some("unsaved")
        );
    }

    #[test]
    fn test_conflicting_writers_detected() {
        let backend = Arc::new(MemoryBackend::new());
        let mut tab_a = DraftStore::new(backend.clone(), AutosavePolicy::WriteThrough);
        let mut tab_b = DraftStore::new(backend.clone(), AutosavePolicy::WriteThrough);

        tab_a.get(&key());
        tab_b.get(&key());

        tab_a.set_field(&key(), "code", "from a");
        tab_b.set_field(&key(), "code", "from b");

        assert_eq!(tab_a.stats().conflicts, 0);
        assert_eq!(tab_b.stats().conflicts, 1);

        let stored = backend.load(&key()).unwrap().unwrap();
        assert_eq!(stored.field_str("code"), Some("from b"));
        assert_eq!(stored.revision, 2);
    }

    #[test]
    fn test_newer_format_ignored() {
        let backend = Arc::new(MemoryBackend::new());
        let mut future = DraftRecord::with_defaults(&DraftFields::new());
        future.format_version = DRAFT_FORMAT_VERSION + 1;
        future.revision = 7;
        future.fields.insert("code".to_string(), json!("from the future"));
        backend.store(&key(), &future).unwrap();

        let mut store = DraftStore::new(backend.clone(), AutosavePolicy::WriteThrough);
        let record = store.open(&key(), defaults());
        assert_eq!(record.field_str("code"), Some(""));

        store.set_field(&key(), "code", "now");
        assert_eq!(store.stats().conflicts, 0);
        assert_eq!(backend.load(&key()).unwrap().unwrap().revision, 8);
    }
}
