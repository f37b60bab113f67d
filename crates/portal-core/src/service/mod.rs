//! Notification service — the caching/fallback layer over the API client.
//!
//! List reads never fail: transport and server errors degrade to a fixed
//! fallback dataset plus a one-shot user notice. The only error that
//! crosses this boundary is `ApiError::Cancelled`, so callers can tell a
//! superseded request apart from a real (already degraded) failure.

pub mod cache;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;

use crate::api::{fallback_notifications, ListParams, NotificationApi};
use crate::config::CacheConfig;
use crate::constants::{
    cache_keys, DEFAULT_LIST_PAGE_SIZE, PRELOAD_DETAIL_COUNT, PRELOAD_MAX_LEVEL,
};
use crate::error::ApiError;
use crate::models::Notification;
use cache::TtlCache;

/// Severity of a one-shot user notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Toast-style message queued for the embedding UI to drain and show once.
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Cache diagnostics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

#[derive(Clone)]
enum CachedValue {
    List(Vec<Notification>),
    Detail(Notification),
}

struct ServiceInner {
    api: Arc<dyn NotificationApi>,
    cache: Mutex<TtlCache<CachedValue>>,
    config: Mutex<CacheConfig>,
    notices: Mutex<Vec<Notice>>,
}

/// Cheaply cloneable handle; clones share cache, config and notices.
#[derive(Clone)]
pub struct NotificationService {
    inner: Arc<ServiceInner>,
}

impl NotificationService {
    pub fn new(api: Arc<dyn NotificationApi>) -> Self {
        Self::with_config(api, CacheConfig::default())
    }

    pub fn with_config(api: Arc<dyn NotificationApi>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                api,
                cache: Mutex::new(TtlCache::new(config.max_size)),
                config: Mutex::new(config),
                notices: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Fetch the notification list, preferring the cache.
    ///
    /// Transport failures and server-reported failures both degrade to the
    /// fallback dataset with a warning notice — they are never an `Err`.
    /// The only `Err` is `Cancelled`, which callers swallow silently.
    pub async fn get_notifications(
        &self,
        params: &ListParams,
        use_cache: bool,
    ) -> Result<Vec<Notification>, ApiError> {
        let params = self.effective_params(params);
        let key = params.cache_key();

        if use_cache {
            if let Some(list) = self.cached_list(&key) {
                return Ok(list);
            }
        }

        match self.list_from_api(&params).await {
            Ok(list) => {
                if use_cache {
                    self.cache_list(key, &list);
                }
                Ok(list)
            }
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => Ok(self.degrade_to_fallback(&err)),
        }
    }

    /// Fetch a single notification's detail. Failures become a notice and
    /// `None`; cancellation is silent.
    pub async fn get_notification_detail(
        &self,
        id: i64,
        use_cache: bool,
    ) -> Option<Notification> {
        if use_cache {
            if let Some(notification) = self.cached_detail(id) {
                return Some(notification);
            }
        }

        match self.detail_from_api(id).await {
            Ok(notification) => {
                if use_cache {
                    self.cache_detail(&notification);
                }
                Some(notification)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.notify_detail_failure(id, &err);
                }
                None
            }
        }
    }

    // The aggregate store composes the pieces below directly, so its
    // generation check can sit between the network await and any cache or
    // notice mutation: a superseded continuation touches nothing.

    /// Cache read for a list key. None when disabled, missing or expired.
    pub(crate) fn cached_list(&self, key: &str) -> Option<Vec<Notification>> {
        if !self.cache_enabled() {
            return None;
        }
        match self.inner.cache.lock().get(key) {
            Some(CachedValue::List(list)) => {
                tracing::debug!("service: list cache hit for {}", key);
                Some(list)
            }
            _ => None,
        }
    }

    pub(crate) fn cache_list(&self, key: String, list: &[Notification]) {
        if !self.cache_enabled() {
            return;
        }
        let ttl = self.cache_ttl();
        self.inner
            .cache
            .lock()
            .insert(key, CachedValue::List(list.to_vec()), ttl);
    }

    /// Network-only list fetch: no cache interaction, no notices.
    pub(crate) async fn list_from_api(
        &self,
        params: &ListParams,
    ) -> Result<Vec<Notification>, ApiError> {
        match self.inner.api.list(params).await {
            Ok(response) if response.success => {
                tracing::debug!("service: fetched {} notifications", response.data.list.len());
                Ok(response.data.list)
            }
            Ok(response) => Err(ApiError::Server(
                response
                    .message
                    .unwrap_or_else(|| "backend reported list failure".to_string()),
            )),
            Err(err) => Err(err),
        }
    }

    /// Queue the offline warning and hand back the fallback dataset.
    pub(crate) fn degrade_to_fallback(&self, err: &ApiError) -> Vec<Notification> {
        tracing::warn!("service: list fetch failed, degrading: {}", err);
        self.push_notice(
            NoticeLevel::Warning,
            "Notifications are temporarily unavailable; showing offline data",
        );
        fallback_notifications()
    }

    pub(crate) fn cached_detail(&self, id: i64) -> Option<Notification> {
        if !self.cache_enabled() {
            return None;
        }
        let key = format!("{}{}", cache_keys::DETAIL_PREFIX, id);
        match self.inner.cache.lock().get(&key) {
            Some(CachedValue::Detail(notification)) => {
                tracing::debug!("service: detail cache hit for {}", id);
                Some(notification)
            }
            _ => None,
        }
    }

    pub(crate) fn cache_detail(&self, notification: &Notification) {
        if !self.cache_enabled() {
            return;
        }
        let key = format!("{}{}", cache_keys::DETAIL_PREFIX, notification.id);
        let ttl = self.cache_ttl();
        self.inner
            .cache
            .lock()
            .insert(key, CachedValue::Detail(notification.clone()), ttl);
    }

    /// Network-only detail fetch: no cache interaction, no notices.
    pub(crate) async fn detail_from_api(&self, id: i64) -> Result<Notification, ApiError> {
        match self.inner.api.detail(id).await {
            Ok(response) if response.success => response
                .data
                .ok_or_else(|| ApiError::Decode("detail response had no data".to_string())),
            Ok(response) => Err(ApiError::Server(
                response
                    .message
                    .unwrap_or_else(|| "backend reported detail failure".to_string()),
            )),
            Err(err) => Err(err),
        }
    }

    pub(crate) fn notify_detail_failure(&self, id: i64, err: &ApiError) {
        tracing::warn!("service: detail {} fetch failed: {}", id, err);
        let level = match err {
            ApiError::Server(_) => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        self.push_notice(level, "Could not load notification detail");
    }

    /// Pre-warm detail caches for the top high-priority notifications.
    /// Best-effort: failures are already swallowed per item.
    pub async fn preload_priority_details(&self, notifications: &[Notification]) {
        let targets: Vec<i64> = notifications
            .iter()
            .filter(|n| n.level >= 1 && n.level <= PRELOAD_MAX_LEVEL)
            .take(PRELOAD_DETAIL_COUNT)
            .map(|n| n.id)
            .collect();
        if targets.is_empty() {
            return;
        }
        tracing::debug!("service: pre-warming {} detail entries", targets.len());
        join_all(
            targets
                .into_iter()
                .map(|id| self.get_notification_detail(id, true)),
        )
        .await;
    }

    /// Drop cached lists and refetch from the server.
    pub async fn refresh_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.invalidate_cache(Some(cache_keys::LIST_PREFIX));
        self.get_notifications(&ListParams::default(), false).await
    }

    /// Clear all cached entries (no prefix) or those under `prefix`.
    pub fn invalidate_cache(&self, prefix: Option<&str>) {
        self.inner.cache.lock().invalidate(prefix);
    }

    pub fn cache_stats(&self) -> CacheStats {
        let cache = self.inner.cache.lock();
        CacheStats {
            size: cache.len(),
            keys: cache.keys(),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        self.inner.config.lock().clone()
    }

    /// Replace the cache configuration at runtime. Shrinking `max_size`
    /// evicts oldest-inserted entries immediately.
    pub fn update_cache_config(&self, config: CacheConfig) {
        self.inner.cache.lock().set_max_size(config.max_size);
        *self.inner.config.lock() = config;
    }

    pub(crate) fn push_notice(&self, level: NoticeLevel, message: &str) {
        self.inner.notices.lock().push(Notice {
            level,
            message: message.to_string(),
        });
    }

    /// Drain pending one-shot notices for display.
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.inner.notices.lock())
    }

    pub(crate) fn effective_params(&self, params: &ListParams) -> ListParams {
        let mut params = params.clone();
        if params.page_size.is_none() {
            params.page_size = Some(DEFAULT_LIST_PAGE_SIZE);
        }
        params
    }

    fn cache_enabled(&self) -> bool {
        self.inner.config.lock().enabled
    }

    fn cache_ttl(&self) -> Duration {
        self.inner.config.lock().ttl
    }
}
