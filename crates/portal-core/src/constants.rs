//! Application-wide constants
//!
//! Centralized location for magic strings and tuning values
//! that are used across multiple modules.

use std::time::Duration;

/// List endpoint path on the portal backend.
pub const LIST_PATH: &str = "/admin-api/test/notification/api/list";

/// Detail endpoint path on the portal backend.
pub const DETAIL_PATH: &str = "/admin-api/test/notification/api/detail";

/// Debounce window for read-state persistence. A burst of mutations inside
/// this window yields a single write.
pub const READ_STATE_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default TTL for cached list/detail responses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Default upper bound on cached entries. Oldest-inserted is evicted first.
pub const DEFAULT_CACHE_MAX_SIZE: usize = 200;

/// Page size requested from the list endpoint when the caller does not set one.
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 100;

/// Number of high-priority notifications whose details are pre-warmed after
/// a successful list fetch.
pub const PRELOAD_DETAIL_COUNT: usize = 3;

/// Highest level (inclusive) eligible for detail pre-warming.
pub const PRELOAD_MAX_LEVEL: i32 = 2;

// Notification levels as delivered by the backend
pub mod levels {
    /// Level 1 - emergency
    pub const EMERGENCY: i32 = 1;
    /// Level 2 - important
    pub const IMPORTANT: i32 = 2;
    /// Level 3 - normal
    pub const NORMAL: i32 = 3;
    /// Level 4 - reminder, rendered in its own workbench section
    pub const REMINDER: i32 = 4;
}

/// Storage key prefixes for per-user read state. The full key is
/// `<prefix>_<namespace>` where the namespace is the user id or `guest`.
pub mod storage_keys {
    pub const READ: &str = "campus_portal_read_notifications";
    pub const HIDDEN: &str = "campus_portal_hidden_notifications";
    pub const ARCHIVE_CLEARED: &str = "campus_portal_archive_cleared_time";

    /// Namespace used when no user is logged in.
    pub const GUEST_NAMESPACE: &str = "guest";
}

/// Cache key prefixes for the notification service.
pub mod cache_keys {
    pub const LIST_PREFIX: &str = "notifications_";
    pub const DETAIL_PREFIX: &str = "notification_detail_";
}

/// Publisher roles treated as the system publisher.
pub const SYSTEM_ROLES: [&str; 2] = ["SYSTEM_ADMIN", "SYSTEM"];

/// Publisher-name substrings that also mark a system publisher.
/// Kept as loose as the portal backend's historical data requires.
pub const SYSTEM_NAME_MARKERS: [&str; 2] = ["System", "系统"];
