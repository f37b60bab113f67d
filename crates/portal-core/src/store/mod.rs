pub mod categorize;
pub mod debounce;
pub mod notification_store;
pub mod read_state;

pub use categorize::{categorize, unread_stats, CategorizedView, UnreadStats};
pub use debounce::{Clock, Debounce, ManualClock, SystemClock};
pub use notification_store::NotificationStore;
pub use read_state::{ReadState, ReadStateStore};
