//! Per-user read/hidden/archive-clear state with debounced persistence.
//!
//! Three independent fields are stored under three separate keys per user
//! namespace. Loading tolerates missing keys and malformed JSON per key:
//! a bad value resets only that field, never the other two.
//!
//! Writes are debounced: mutations arm a deadline and the host loop drives
//! `flush_due`. An unchanged mutation (marking an already-read id read) is a
//! no-op and does not re-arm the deadline.

use std::collections::HashSet;
use std::sync::Arc;

use crate::constants::{storage_keys, READ_STATE_DEBOUNCE};
use crate::models::Notification;
use crate::storage::KeyValueStorage;
use crate::store::debounce::{Clock, Debounce};

/// The three persisted fields, independent of storage concerns.
#[derive(Debug, Clone, Default)]
pub struct ReadState {
    /// Ever-marked-read ids. Explicit unmark is supported.
    pub read_ids: HashSet<i64>,
    /// Permanently removed-from-view ids. There is no unhide.
    pub hidden_ids: HashSet<i64>,
    /// Blanket archive-clear watermark, epoch millis; 0 means never cleared.
    pub archive_cleared_at: i64,
}

impl ReadState {
    pub fn is_read(&self, id: i64) -> bool {
        self.read_ids.contains(&id)
    }

    pub fn is_hidden(&self, id: i64) -> bool {
        self.hidden_ids.contains(&id)
    }

    /// Clearing is a blanket operation evaluated live: while the watermark is
    /// set, every notification that is currently read counts as cleared.
    /// Marking a cleared notification unread brings it back.
    pub fn is_cleared_from_archive(&self, notification: &Notification) -> bool {
        self.archive_cleared_at > 0 && self.is_read(notification.id)
    }
}

/// Durable per-user read state.
pub struct ReadStateStore {
    storage: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    namespace: String,
    state: ReadState,
    debounce: Debounce,
}

impl ReadStateStore {
    /// Load state for `user` (or the guest namespace) from storage.
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        clock: Arc<dyn Clock>,
        user: Option<&str>,
    ) -> Self {
        let namespace = user
            .filter(|u| !u.is_empty())
            .unwrap_or(storage_keys::GUEST_NAMESPACE)
            .to_string();
        let state = Self::load(storage.as_ref(), &namespace);
        tracing::debug!(
            "read_state: loaded namespace={} read={} hidden={} cleared_at={}",
            namespace,
            state.read_ids.len(),
            state.hidden_ids.len(),
            state.archive_cleared_at
        );
        Self {
            storage,
            clock,
            namespace,
            state,
            debounce: Debounce::default(),
        }
    }

    fn key(prefix: &str, namespace: &str) -> String {
        format!("{}_{}", prefix, namespace)
    }

    fn load(storage: &dyn KeyValueStorage, namespace: &str) -> ReadState {
        let mut state = ReadState::default();
        state.read_ids = Self::load_id_set(storage, &Self::key(storage_keys::READ, namespace));
        state.hidden_ids = Self::load_id_set(storage, &Self::key(storage_keys::HIDDEN, namespace));
        state.archive_cleared_at =
            Self::load_watermark(storage, &Self::key(storage_keys::ARCHIVE_CLEARED, namespace));
        state
    }

    fn load_id_set(storage: &dyn KeyValueStorage, key: &str) -> HashSet<i64> {
        match storage.get(key) {
            Some(raw) => match serde_json::from_str::<Vec<i64>>(&raw) {
                Ok(ids) => ids.into_iter().collect(),
                Err(err) => {
                    tracing::warn!("read_state: malformed value for {} — resetting: {}", key, err);
                    HashSet::new()
                }
            },
            None => HashSet::new(),
        }
    }

    fn load_watermark(storage: &dyn KeyValueStorage, key: &str) -> i64 {
        match storage.get(key) {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(millis) => millis,
                Err(err) => {
                    tracing::warn!("read_state: malformed value for {} — resetting: {}", key, err);
                    0
                }
            },
            None => 0,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn state(&self) -> &ReadState {
        &self.state
    }

    // ===== Predicates =====

    pub fn is_read(&self, id: i64) -> bool {
        self.state.is_read(id)
    }

    pub fn is_hidden(&self, id: i64) -> bool {
        self.state.is_hidden(id)
    }

    pub fn is_cleared_from_archive(&self, notification: &Notification) -> bool {
        self.state.is_cleared_from_archive(notification)
    }

    // ===== Mutations =====

    /// Returns true if membership changed (and persistence was armed).
    pub fn mark_read(&mut self, id: i64) -> bool {
        if !self.state.read_ids.insert(id) {
            return false;
        }
        self.arm();
        true
    }

    pub fn mark_unread(&mut self, id: i64) -> bool {
        if !self.state.read_ids.remove(&id) {
            return false;
        }
        self.arm();
        true
    }

    /// Bulk mark-read; arms persistence at most once.
    pub fn mark_many_read(&mut self, ids: &[i64]) -> usize {
        let mut changed = 0;
        for &id in ids {
            if self.state.read_ids.insert(id) {
                changed += 1;
            }
        }
        if changed > 0 {
            self.arm();
        }
        changed
    }

    pub fn hide(&mut self, id: i64) -> bool {
        if !self.state.hidden_ids.insert(id) {
            return false;
        }
        self.arm();
        true
    }

    /// Record the archive-clear watermark at the current wall-clock time.
    pub fn clear_archive(&mut self) {
        self.state.archive_cleared_at = self.clock.now_millis();
        self.arm();
    }

    // ===== Persistence =====

    fn arm(&mut self) {
        let deadline = self.clock.now_millis() + READ_STATE_DEBOUNCE.as_millis() as i64;
        self.debounce.schedule(deadline);
    }

    /// True while a write is pending.
    pub fn has_pending_write(&self) -> bool {
        self.debounce.is_armed()
    }

    /// Write out the state if the debounce deadline has passed.
    /// Returns true if a flush happened.
    pub fn flush_due(&mut self) -> bool {
        if !self.debounce.is_due(self.clock.now_millis()) {
            return false;
        }
        self.debounce.cancel();
        self.persist();
        true
    }

    /// Write out immediately if anything is pending (logout/teardown path).
    pub fn flush_now(&mut self) {
        if self.debounce.cancel() {
            self.persist();
        }
    }

    fn persist(&self) {
        // Each key is serialized independently so one failure cannot corrupt
        // the other two.
        let mut read_ids: Vec<i64> = self.state.read_ids.iter().copied().collect();
        read_ids.sort_unstable();
        if let Ok(json) = serde_json::to_string(&read_ids) {
            self.storage
                .set(&Self::key(storage_keys::READ, &self.namespace), &json);
        }

        let mut hidden_ids: Vec<i64> = self.state.hidden_ids.iter().copied().collect();
        hidden_ids.sort_unstable();
        if let Ok(json) = serde_json::to_string(&hidden_ids) {
            self.storage
                .set(&Self::key(storage_keys::HIDDEN, &self.namespace), &json);
        }

        self.storage.set(
            &Self::key(storage_keys::ARCHIVE_CLEARED, &self.namespace),
            &self.state.archive_cleared_at.to_string(),
        );

        tracing::debug!(
            "read_state: persisted namespace={} read={} hidden={}",
            self.namespace,
            self.state.read_ids.len(),
            self.state.hidden_ids.len()
        );
    }

    // ===== Cross-tab reconciliation =====

    /// Apply a storage-change notification from another tab.
    ///
    /// The changed field is REPLACED from the raw value, not merged; a
    /// removed key resets the field. Keys outside this store's namespace are
    /// ignored. Returns true if a field of this store was replaced.
    pub fn reconcile(&mut self, key: &str, raw: Option<&str>) -> bool {
        if key == Self::key(storage_keys::READ, &self.namespace) {
            self.state.read_ids = match raw {
                Some(raw) => serde_json::from_str::<Vec<i64>>(raw)
                    .map(|ids| ids.into_iter().collect())
                    .unwrap_or_default(),
                None => HashSet::new(),
            };
            true
        } else if key == Self::key(storage_keys::HIDDEN, &self.namespace) {
            self.state.hidden_ids = match raw {
                Some(raw) => serde_json::from_str::<Vec<i64>>(raw)
                    .map(|ids| ids.into_iter().collect())
                    .unwrap_or_default(),
                None => HashSet::new(),
            };
            true
        } else if key == Self::key(storage_keys::ARCHIVE_CLEARED, &self.namespace) {
            self.state.archive_cleared_at = raw.and_then(|r| r.trim().parse().ok()).unwrap_or(0);
            true
        } else {
            false
        }
    }
}

impl Drop for ReadStateStore {
    fn drop(&mut self) {
        self.flush_now();
    }
}
