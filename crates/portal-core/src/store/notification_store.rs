//! Aggregate notification store.
//!
//! Composes the service (cache + fallback), the per-user read state and the
//! categorizer behind one handle. The categorized view is memoized and
//! invalidated on every mutation, so a read immediately after `mark_read`
//! in the same synchronous turn observes the new state.
//!
//! Overlapping fetches of the same logical slot are de-duplicated with a
//! generation counter: starting a new fetch bumps the generation, and a
//! continuation holding a stale generation discards its result entirely —
//! success and error branches alike touch no shared state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::api::ListParams;
use crate::models::Notification;
use crate::service::{Notice, NotificationService};
use crate::storage::KeyValueStorage;
use crate::store::categorize::{categorize, unread_stats, CategorizedView, UnreadStats};
use crate::store::debounce::Clock;
use crate::store::read_state::ReadStateStore;

struct StoreState {
    notifications: Vec<Notification>,
    read_state: ReadStateStore,
    /// Memoized categorization; None means dirty.
    view: Option<Arc<CategorizedView>>,
    loading: bool,
    error: Option<String>,
    last_update: Option<i64>,
    current_user: Option<String>,
}

pub struct NotificationStore {
    service: NotificationService,
    storage: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    state: Mutex<StoreState>,
    list_generation: AtomicU64,
    detail_generation: AtomicU64,
}

impl NotificationStore {
    /// New store bound to the guest namespace until a user is set.
    pub fn new(
        service: NotificationService,
        storage: Arc<dyn KeyValueStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let read_state = ReadStateStore::new(storage.clone(), clock.clone(), None);
        Self {
            service,
            storage,
            clock,
            state: Mutex::new(StoreState {
                notifications: Vec::new(),
                read_state,
                view: None,
                loading: false,
                error: None,
                last_update: None,
                current_user: None,
            }),
            list_generation: AtomicU64::new(0),
            detail_generation: AtomicU64::new(0),
        }
    }

    pub fn service(&self) -> &NotificationService {
        &self.service
    }

    // ===== Session =====

    /// Rebind the read state to `user`'s namespace. Passing None is the
    /// logout path: the in-memory list and flags are cleared, persisted
    /// storage stays untouched, and the read state falls back to guest.
    pub fn set_current_user(&self, user: Option<&str>) {
        let mut state = self.state.lock();
        state.read_state.flush_now();
        state.read_state =
            ReadStateStore::new(self.storage.clone(), self.clock.clone(), user);
        state.current_user = user.map(str::to_string);
        if user.is_none() {
            state.notifications.clear();
            state.loading = false;
            state.error = None;
            state.last_update = None;
        }
        state.view = None;
        tracing::debug!(
            "store: bound read state to namespace {}",
            state.read_state.namespace()
        );
    }

    pub fn current_user(&self) -> Option<String> {
        self.state.lock().current_user.clone()
    }

    // ===== Fetch =====

    /// Fetch the list through the cache and replace the in-memory feed.
    pub async fn fetch(&self, params: &ListParams) {
        self.fetch_with(params, true).await;
    }

    /// Force a server round-trip, dropping cached lists first.
    pub async fn refresh(&self) {
        self.service
            .invalidate_cache(Some(crate::constants::cache_keys::LIST_PREFIX));
        self.fetch_with(&ListParams::default(), false).await;
    }

    async fn fetch_with(&self, params: &ListParams, use_cache: bool) {
        let generation = self.list_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let params = self.service.effective_params(params);
        let key = params.cache_key();

        // A synchronous cache hit cannot be superseded mid-turn.
        if use_cache {
            if let Some(list) = self.service.cached_list(&key) {
                let targets = self.apply_feed(list);
                self.spawn_preload(targets);
                return;
            }
        }

        {
            let mut state = self.state.lock();
            state.loading = true;
            state.error = None;
        }

        let result = self.service.list_from_api(&params).await;

        // A newer fetch superseded this one: its continuation must not touch
        // anything — not the feed, not the cache, not the notices, not the
        // loading/error flags. The newer fetch owns all of them now.
        if self.list_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("store: discarding stale list response (gen {})", generation);
            return;
        }

        let list = match result {
            Ok(list) => {
                if use_cache {
                    self.service.cache_list(key, &list);
                }
                list
            }
            Err(err) if err.is_cancelled() => {
                self.state.lock().loading = false;
                return;
            }
            Err(err) => self.service.degrade_to_fallback(&err),
        };

        let targets = self.apply_feed(list);
        self.spawn_preload(targets);
    }

    /// Replace the in-memory feed and recompute the view. Returns the unread
    /// priority slice for detail pre-warming.
    fn apply_feed(&self, list: Vec<Notification>) -> Vec<Notification> {
        let mut state = self.state.lock();
        state.loading = false;
        state.error = None;
        state.notifications = list;
        state.last_update = Some(self.clock.now_millis());
        state.view = None;
        let view = Self::rebuild_view(&mut state);
        view.unread_priority.clone()
    }

    /// Best-effort pre-warm of high-priority details; failures are swallowed
    /// inside the service. Skipped when no runtime is available.
    fn spawn_preload(&self, targets: Vec<Notification>) {
        if targets.is_empty() {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let service = self.service.clone();
            handle.spawn(async move {
                service.preload_priority_details(&targets).await;
            });
        }
    }

    /// Fetch a single notification's detail, de-duplicated against newer
    /// detail requests: a superseded request resolves to None and leaves the
    /// cache and notices untouched.
    pub async fn fetch_detail(&self, id: i64) -> Option<Notification> {
        if let Some(hit) = self.service.cached_detail(id) {
            return Some(hit);
        }

        let generation = self.detail_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.service.detail_from_api(id).await;
        if self.detail_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("store: discarding stale detail response for {}", id);
            return None;
        }

        match result {
            Ok(notification) => {
                self.service.cache_detail(&notification);
                Some(notification)
            }
            Err(err) if err.is_cancelled() => None,
            Err(err) => {
                self.service.notify_detail_failure(id, &err);
                None
            }
        }
    }

    // ===== Derived views =====

    fn rebuild_view(state: &mut StoreState) -> Arc<CategorizedView> {
        if state.view.is_none() {
            state.view = Some(Arc::new(categorize(
                &state.notifications,
                state.read_state.state(),
            )));
        }
        state.view.as_ref().cloned().unwrap_or_default()
    }

    /// The categorized view, recomputed if any input changed since the last
    /// read.
    pub fn view(&self) -> Arc<CategorizedView> {
        let mut state = self.state.lock();
        Self::rebuild_view(&mut state)
    }

    pub fn unread_stats(&self) -> UnreadStats {
        unread_stats(&self.view())
    }

    /// The raw feed, uncategorized.
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().notifications.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// Epoch millis of the last applied fetch.
    pub fn last_update(&self) -> Option<i64> {
        self.state.lock().last_update
    }

    // ===== Read-state mutations =====

    pub fn mark_read(&self, id: i64) {
        let mut state = self.state.lock();
        if state.read_state.mark_read(id) {
            state.view = None;
        }
    }

    pub fn mark_unread(&self, id: i64) {
        let mut state = self.state.lock();
        if state.read_state.mark_unread(id) {
            state.view = None;
        }
    }

    pub fn mark_many_read(&self, ids: &[i64]) -> usize {
        let mut state = self.state.lock();
        let changed = state.read_state.mark_many_read(ids);
        if changed > 0 {
            state.view = None;
        }
        changed
    }

    /// Permanently remove a notification from view. Irreversible.
    /// Hidden ids stay a subset of known ids: an id not in the current feed
    /// is a no-op.
    pub fn hide(&self, id: i64) {
        let mut state = self.state.lock();
        if !state.notifications.iter().any(|n| n.id == id) {
            return;
        }
        if state.read_state.hide(id) {
            state.view = None;
        }
    }

    /// Blanket-clear the read archive by stamping the watermark.
    pub fn clear_archive(&self) {
        let mut state = self.state.lock();
        state.read_state.clear_archive();
        state.view = None;
    }

    pub fn is_read(&self, id: i64) -> bool {
        self.state.lock().read_state.is_read(id)
    }

    pub fn is_hidden(&self, id: i64) -> bool {
        self.state.lock().read_state.is_hidden(id)
    }

    // ===== Persistence plumbing =====

    /// Drive the debounced read-state write; host loops call this on tick.
    pub fn flush_read_state(&self) -> bool {
        self.state.lock().read_state.flush_due()
    }

    /// Apply a storage-change notification from another tab. The changed
    /// field is replaced, not merged, and the view is invalidated.
    pub fn on_storage_change(&self, key: &str, raw: Option<&str>) {
        let mut state = self.state.lock();
        if state.read_state.reconcile(key, raw) {
            state.view = None;
            tracing::debug!("store: reconciled cross-tab change for {}", key);
        }
    }

    /// Drain pending one-shot user notices.
    pub fn take_notices(&self) -> Vec<Notice> {
        self.service.take_notices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::MockApi;
    use crate::api::DetailResponse;
    use crate::error::ApiError;
    use crate::storage::MemoryStorage;
    use crate::store::debounce::ManualClock;
    use std::time::Duration;

    fn record(id: i64, level: i32, create_time: &str) -> Notification {
        Notification {
            id,
            title: format!("n{}", id),
            content: String::new(),
            level,
            publisher_name: String::new(),
            publisher_role: String::new(),
            create_time: create_time.to_string(),
            scope: String::new(),
            status: String::new(),
            summary: None,
            is_read: false,
        }
    }

    fn store_with(api: Arc<MockApi>) -> (NotificationStore, Arc<MemoryStorage>, Arc<ManualClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(1_000_000));
        let service = NotificationService::new(api);
        let store = NotificationStore::new(service, storage.clone(), clock.clone());
        (store, storage, clock)
    }

    #[tokio::test]
    async fn test_workbench_scenario() {
        let api = Arc::new(MockApi::new());
        api.push_list(MockApi::ok_list(vec![
            record(1, 1, "2024-01-02"),
            record(2, 4, "2024-01-01"),
        ]));
        let (store, _, _) = store_with(api);

        store.fetch(&ListParams::default()).await;

        let view = store.view();
        assert_eq!(view.unread_priority.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(view.level4_messages.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2]);
        assert!(view.read_archive.is_empty());

        store.mark_read(2);
        // Same synchronous turn: the view must already reflect it.
        let view = store.view();
        assert!(view.level4_messages.is_empty());
        assert_eq!(view.read_archive.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn test_unread_stats_consistent_with_views() {
        let api = Arc::new(MockApi::new());
        api.push_list(MockApi::ok_list(vec![
            record(1, 1, "2024-01-01"),
            record(2, 2, "2024-01-02"),
            record(3, 4, "2024-01-03"),
        ]));
        let (store, _, _) = store_with(api);
        store.fetch(&ListParams::default()).await;

        let stats = store.unread_stats();
        let view = store.view();
        assert_eq!(stats.total, view.unread_priority.len() + view.level4_messages.len());
        assert_eq!(stats.emergency, 1);
        assert_eq!(stats.important, 1);
        assert_eq!(stats.level4, 1);

        store.mark_read(1);
        let stats = store.unread_stats();
        assert_eq!(stats.emergency, 0);
        assert_eq!(stats.total, 2);
    }

    #[tokio::test]
    async fn test_cross_user_isolation() {
        let api = Arc::new(MockApi::new());
        let (store, _, _) = store_with(api);

        store.set_current_user(Some("A"));
        store.mark_read(5);
        assert!(store.is_read(5));

        store.set_current_user(Some("B"));
        assert!(!store.is_read(5));

        // A's state was flushed on rebind and survives the round-trip.
        store.set_current_user(Some("A"));
        assert!(store.is_read(5));
    }

    #[tokio::test]
    async fn test_logout_clears_memory_not_storage() {
        let api = Arc::new(MockApi::new());
        api.push_list(MockApi::ok_list(vec![record(1, 1, "2024-01-01")]));
        let (store, storage, _) = store_with(api);

        store.set_current_user(Some("A"));
        store.fetch(&ListParams::default()).await;
        store.mark_read(1);
        assert_eq!(store.notifications().len(), 1);

        store.set_current_user(None);
        assert!(store.notifications().is_empty());
        assert!(store.error().is_none());
        assert!(!store.is_loading());
        // Persisted state is untouched by logout.
        assert!(storage
            .get("campus_portal_read_notifications_A")
            .is_some());
    }

    #[tokio::test]
    async fn test_stale_list_response_discarded() {
        let api = Arc::new(MockApi::new());
        // The slow call sleeps through its delay, so the fast call pops the
        // first queued response and the slow one pops the second.
        api.push_list(MockApi::ok_list(vec![record(2, 3, "2024-01-02")]));
        api.push_list(MockApi::ok_list(vec![record(1, 3, "2024-01-01")]));
        api.list_delays
            .lock()
            .push_back(Duration::from_millis(100));
        let (store, _, _) = store_with(api);
        let store = Arc::new(store);

        // Bypass the cache so both calls hit the mock.
        let slow = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .fetch_with(&ListParams { page_no: Some(1), ..Default::default() }, false)
                    .await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        store
            .fetch_with(&ListParams { page_no: Some(2), ..Default::default() }, false)
            .await;
        slow.await.unwrap();

        // The slow (superseded) response must not have overwritten the feed.
        let ids: Vec<i64> = store.notifications().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2]);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_stale_error_branch_discarded() {
        let api = Arc::new(MockApi::new());
        // Fast call succeeds; the superseded slow call fails. Its error
        // branch must not degrade to fallback, flag an error, or queue a
        // notice.
        api.push_list(MockApi::ok_list(vec![record(2, 3, "2024-01-02")]));
        api.push_list(Err(ApiError::Transport("late failure".to_string())));
        api.list_delays
            .lock()
            .push_back(Duration::from_millis(100));
        let (store, _, _) = store_with(api);
        let store = Arc::new(store);

        let slow = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .fetch_with(&ListParams { page_no: Some(1), ..Default::default() }, false)
                    .await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        store
            .fetch_with(&ListParams { page_no: Some(2), ..Default::default() }, false)
            .await;
        slow.await.unwrap();

        assert!(store.error().is_none());
        let ids: Vec<i64> = store.notifications().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2]);
        assert!(store.take_notices().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_uses_fallback() {
        let api = Arc::new(MockApi::new());
        api.push_list(Err(ApiError::Transport("offline".to_string())));
        let (store, _, _) = store_with(api);

        store.fetch(&ListParams::default()).await;
        assert_eq!(store.notifications().len(), 2);
        assert!(store.error().is_none());
        assert_eq!(store.take_notices().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_triggers_preload_of_top_unread() {
        let api = Arc::new(MockApi::new());
        api.push_list(MockApi::ok_list(vec![
            record(1, 1, "2024-01-03"),
            record(2, 2, "2024-01-02"),
            record(3, 3, "2024-01-01"),
        ]));
        for id in [1, 2] {
            api.push_detail(Ok(DetailResponse {
                success: true,
                data: Some(record(id, 1, "2024-01-01")),
                message: None,
            }));
        }
        let (store, _, _) = store_with(api.clone());

        store.fetch(&ListParams::default()).await;
        // Give the fire-and-forget task a moment.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(api.detail_calls(), 2);
    }

    #[tokio::test]
    async fn test_archive_clear_watermark() {
        let api = Arc::new(MockApi::new());
        api.push_list(MockApi::ok_list(vec![
            record(1, 2, "2024-01-01"),
            record(2, 2, "2024-01-02"),
        ]));
        let (store, _, clock) = store_with(api);
        store.fetch(&ListParams::default()).await;

        store.mark_read(1);
        assert_eq!(store.view().read_archive.len(), 1);

        clock.advance(10_000);
        store.clear_archive();
        assert!(store.view().read_archive.is_empty());

        // Reading after the clear is also blanket-cleared (live watermark).
        store.mark_read(2);
        assert!(store.view().read_archive.is_empty());

        // Unmarking resurfaces the notification as unread.
        store.mark_unread(1);
        assert!(store
            .view()
            .unread_priority
            .iter()
            .any(|n| n.id == 1));
    }

    #[tokio::test]
    async fn test_cross_tab_reconcile_replaces() {
        let api = Arc::new(MockApi::new());
        api.push_list(MockApi::ok_list(vec![record(1, 2, "2024-01-01")]));
        let (store, _, _) = store_with(api);
        store.set_current_user(Some("A"));
        store.fetch(&ListParams::default()).await;

        store.mark_read(1);
        assert_eq!(store.view().read_archive.len(), 1);

        // Another tab unmarked everything.
        store.on_storage_change("campus_portal_read_notifications_A", Some("[]"));
        assert!(store.view().read_archive.is_empty());
        assert_eq!(store.view().unread_priority.len(), 1);
    }

    #[tokio::test]
    async fn test_debounced_flush_through_store() {
        let api = Arc::new(MockApi::new());
        let (store, storage, clock) = store_with(api);
        store.set_current_user(Some("A"));
        let baseline = storage.write_count();

        store.mark_read(1);
        store.mark_read(2);
        store.mark_read(3);
        assert!(!store.flush_read_state());
        assert_eq!(storage.write_count(), baseline);

        clock.advance(400);
        assert!(store.flush_read_state());
        assert_eq!(storage.write_count(), baseline + 3);
    }

    #[tokio::test]
    async fn test_hide_requires_known_id() {
        let api = Arc::new(MockApi::new());
        api.push_list(MockApi::ok_list(vec![record(1, 1, "2024-01-01")]));
        let (store, _, _) = store_with(api);
        store.fetch(&ListParams::default()).await;

        store.hide(999);
        assert!(!store.is_hidden(999));

        store.hide(1);
        assert!(store.is_hidden(1));
        assert!(store.view().unread_priority.is_empty());
        assert!(store.view().emergency.is_empty());
    }

    #[tokio::test]
    async fn test_stale_detail_response_discarded() {
        let api = Arc::new(MockApi::new());
        // The fast request pops the first queued response; the slow one,
        // still sleeping, pops the second afterwards.
        api.push_detail(Ok(DetailResponse {
            success: true,
            data: Some(record(2, 1, "2024-01-01")),
            message: None,
        }));
        api.push_detail(Ok(DetailResponse {
            success: true,
            data: Some(record(1, 1, "2024-01-01")),
            message: None,
        }));
        api.detail_delays
            .lock()
            .push_back(Duration::from_millis(100));
        let (store, _, _) = store_with(api);
        let store = Arc::new(store);

        let slow = {
            let store = store.clone();
            tokio::spawn(async move { store.fetch_detail(1).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let fast = store.fetch_detail(2).await;

        assert_eq!(fast.unwrap().id, 2);
        // The superseded request resolves to None rather than a stale record.
        assert!(slow.await.unwrap().is_none());
    }
}
