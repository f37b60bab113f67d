//! Single-pass notification classification.
//!
//! One forward pass over the feed plus a post-pass sort produces every
//! derived view the workbench renders. Hidden and archive-cleared
//! notifications are dropped before any other rule runs, so no bucket can
//! ever disagree about visibility.
//!
//! The pass is total: a record with an out-of-range level lands in no
//! level-based bucket (it can still surface as the system announcement), and
//! nothing in here can fail, which is what lets the aggregate store expose
//! the views without per-view guards.

use crate::constants::levels;
use crate::models::Notification;
use crate::store::read_state::ReadState;

/// The derived views, recomputed from `(records, read_state)` on demand.
#[derive(Debug, Clone, Default)]
pub struct CategorizedView {
    /// Unread level 1-3, sorted level ascending then newest first.
    pub unread_priority: Vec<Notification>,
    /// Read notifications of any level, newest first.
    pub read_archive: Vec<Notification>,
    /// Unread level 4 reminders only; read reminders move to the archive.
    pub level4_messages: Vec<Notification>,
    /// At most the single most recent system announcement. Level 4 system
    /// notices belong to the reminder section, never here.
    pub system_announcements: Vec<Notification>,
    /// Every visible level 1 notification, read or not.
    pub emergency: Vec<Notification>,
    /// Every visible level 2-3 notification, read or not.
    pub important: Vec<Notification>,
}

/// Unread counters derivable from the view sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnreadStats {
    pub total: usize,
    pub emergency: usize,
    pub important: usize,
    pub level4: usize,
}

/// Classify the feed in a single forward pass.
///
/// Relative input order is preserved for equal sort keys (stable sorts), so
/// the output is deterministic for a given input order.
pub fn categorize(records: &[Notification], state: &ReadState) -> CategorizedView {
    let mut view = CategorizedView::default();

    for record in records {
        if state.is_hidden(record.id) || state.is_cleared_from_archive(record) {
            continue;
        }

        let is_read = state.is_read(record.id);
        let mut item = record.clone();
        item.is_read = is_read;

        // Level 4 system notices are excluded: they belong to the reminder
        // section only.
        if item.is_system_publisher() && item.level != levels::REMINDER {
            view.system_announcements.push(item.clone());
        }

        match item.level {
            levels::EMERGENCY => {
                view.emergency.push(item.clone());
                if is_read {
                    view.read_archive.push(item);
                } else {
                    view.unread_priority.push(item);
                }
            }
            levels::IMPORTANT | levels::NORMAL => {
                view.important.push(item.clone());
                if is_read {
                    view.read_archive.push(item);
                } else {
                    view.unread_priority.push(item);
                }
            }
            levels::REMINDER => {
                if is_read {
                    view.read_archive.push(item);
                } else {
                    view.level4_messages.push(item);
                }
            }
            _ => {
                // Out-of-range level: no level-based bucket.
            }
        }
    }

    view.unread_priority.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then_with(|| b.created_at_millis().cmp(&a.created_at_millis()))
    });
    view.read_archive
        .sort_by(|a, b| b.created_at_millis().cmp(&a.created_at_millis()));
    view.level4_messages
        .sort_by(|a, b| b.created_at_millis().cmp(&a.created_at_millis()));
    view.system_announcements
        .sort_by(|a, b| b.created_at_millis().cmp(&a.created_at_millis()));
    view.system_announcements.truncate(1);

    view
}

/// Unread counters over the categorized view.
///
/// `total` always equals `unread_priority.len() + level4_messages.len()`.
pub fn unread_stats(view: &CategorizedView) -> UnreadStats {
    let emergency = view
        .unread_priority
        .iter()
        .filter(|n| n.level == levels::EMERGENCY)
        .count();
    let important = view.unread_priority.len() - emergency;
    let level4 = view.level4_messages.len();
    UnreadStats {
        total: emergency + important + level4,
        emergency,
        important,
        level4,
    }
}
