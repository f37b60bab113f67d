pub mod filter;
pub mod notification;

pub use filter::{DateRange, NotificationFilter, ReadStatusFilter, SortBy};
pub use notification::Notification;
