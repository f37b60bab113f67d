//! Filter/sort/page pipeline and detail-open orchestration for UI embedding.
//!
//! The browser owns the user-driven listing state (filter object, selection,
//! dialog flag) and layers it over the aggregate store. It holds no copy of
//! the feed: every read goes back through the store so derived data can
//! never go stale.

use std::sync::Arc;

use crate::models::{Notification, NotificationFilter, ReadStatusFilter, SortBy};
use crate::service::NoticeLevel;
use crate::store::NotificationStore;

pub struct NotificationBrowser {
    store: Arc<NotificationStore>,
    filter: NotificationFilter,
    selected: Option<Notification>,
    show_detail: bool,
}

impl NotificationBrowser {
    pub fn new(store: Arc<NotificationStore>) -> Self {
        Self {
            store,
            filter: NotificationFilter::default(),
            selected: None,
            show_detail: false,
        }
    }

    pub fn with_page_size(store: Arc<NotificationStore>, page_size: usize) -> Self {
        let mut browser = Self::new(store);
        browser.filter.page_size = page_size.max(1);
        browser
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.store
    }

    pub fn filter(&self) -> &NotificationFilter {
        &self.filter
    }

    // ===== Filter pipeline =====

    /// The feed after level/scope/read-status/search/date filters and the
    /// active sort mode, before paging.
    pub fn filtered(&self) -> Vec<Notification> {
        let filter = &self.filter;
        let search = filter.search.trim().to_lowercase();

        let mut list: Vec<Notification> = self
            .store
            .notifications()
            .into_iter()
            .filter(|n| {
                if let Some(level) = filter.level {
                    if n.level != level {
                        return false;
                    }
                }
                if let Some(scope) = &filter.scope {
                    if &n.scope != scope {
                        return false;
                    }
                }
                match filter.read_status {
                    ReadStatusFilter::All => {}
                    ReadStatusFilter::Read => {
                        if !self.store.is_read(n.id) {
                            return false;
                        }
                    }
                    ReadStatusFilter::Unread => {
                        if self.store.is_read(n.id) {
                            return false;
                        }
                    }
                }
                if !search.is_empty() {
                    let haystack = format!(
                        "{}\n{}\n{}",
                        n.title.to_lowercase(),
                        n.content.to_lowercase(),
                        n.publisher_name.to_lowercase()
                    );
                    if !haystack.contains(&search) {
                        return false;
                    }
                }
                if !filter.date_range.is_unbounded()
                    && !filter.date_range.contains(n.created_at_millis())
                {
                    return false;
                }
                true
            })
            .collect();

        match filter.sort_by {
            SortBy::TimeDesc => {
                list.sort_by(|a, b| b.created_at_millis().cmp(&a.created_at_millis()));
            }
            SortBy::TimeAsc => {
                list.sort_by(|a, b| a.created_at_millis().cmp(&b.created_at_millis()));
            }
            SortBy::LevelThenTime => {
                list.sort_by(|a, b| {
                    a.level
                        .cmp(&b.level)
                        .then_with(|| b.created_at_millis().cmp(&a.created_at_millis()))
                });
            }
            SortBy::Publisher => {
                list.sort_by(|a, b| a.publisher_name.cmp(&b.publisher_name));
            }
        }

        list
    }

    /// `ceil(filtered / page_size)`, zero when nothing matches.
    pub fn total_pages(&self) -> usize {
        let count = self.filtered().len();
        count.div_ceil(self.filter.page_size)
    }

    /// The current 1-indexed page slice of the filtered feed.
    pub fn paged(&self) -> Vec<Notification> {
        let filtered = self.filtered();
        let start = (self.filter.page - 1).saturating_mul(self.filter.page_size);
        filtered
            .into_iter()
            .skip(start)
            .take(self.filter.page_size)
            .collect()
    }

    /// Apply a filter edit. Any change resets to the first page.
    pub fn edit_filter(&mut self, edit: impl FnOnce(&mut NotificationFilter)) {
        edit(&mut self.filter);
        self.filter.page_size = self.filter.page_size.max(1);
        self.filter.page = 1;
    }

    pub fn search(&mut self, term: &str) {
        self.edit_filter(|f| f.search = term.to_string());
    }

    pub fn reset_filter(&mut self) {
        self.filter.reset();
    }

    // ===== Paging =====

    pub fn next_page(&mut self) {
        if self.filter.page < self.total_pages() {
            self.filter.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.filter.page > 1 {
            self.filter.page -= 1;
        }
    }

    pub fn go_to_page(&mut self, page: usize) {
        if page >= 1 && page <= self.total_pages() {
            self.filter.page = page;
        }
    }

    // ===== Detail orchestration =====

    pub fn selected(&self) -> Option<&Notification> {
        self.selected.as_ref()
    }

    pub fn is_detail_open(&self) -> bool {
        self.show_detail
    }

    /// Load and open a notification's detail. A superseded or failed load
    /// leaves the dialog state untouched (the service already queued any
    /// user-visible notice). Returns whether the dialog opened.
    pub async fn open_detail(&mut self, id: i64) -> bool {
        match self.store.fetch_detail(id).await {
            Some(notification) => {
                self.selected = Some(notification);
                self.show_detail = true;
                true
            }
            None => false,
        }
    }

    pub fn close_detail(&mut self) {
        self.show_detail = false;
        self.selected = None;
    }

    /// Click-through: open the detail and optionally mark the notification
    /// read once it is on screen.
    pub async fn on_click(&mut self, notification: &Notification, auto_mark_read: bool) {
        let opened = self.open_detail(notification.id).await;
        if opened && auto_mark_read && !self.store.is_read(notification.id) {
            self.store.mark_read(notification.id);
        }
    }

    // ===== Bulk actions =====

    /// Mark every currently-filtered unread notification as read.
    pub fn mark_filtered_read(&mut self) -> usize {
        let ids: Vec<i64> = self
            .filtered()
            .iter()
            .filter(|n| !self.store.is_read(n.id))
            .map(|n| n.id)
            .collect();
        let changed = self.store.mark_many_read(&ids);
        if changed > 0 {
            self.store.service().push_notice(
                NoticeLevel::Success,
                &format!("Marked {} notifications as read", changed),
            );
        }
        changed
    }
}
