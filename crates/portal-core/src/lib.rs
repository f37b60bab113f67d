pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod presentation;
pub mod service;
pub mod storage;
pub mod store;

// Re-export the main surface at the crate root for convenience
pub use api::{HttpNotificationApi, ListParams, NotificationApi};
pub use config::CacheConfig;
pub use error::ApiError;
pub use models::{Notification, NotificationFilter, ReadStatusFilter, SortBy};
pub use presentation::NotificationBrowser;
pub use service::{Notice, NoticeLevel, NotificationService};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{CategorizedView, NotificationStore, ReadState, SystemClock, UnreadStats};
