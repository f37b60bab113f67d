/// Sort modes offered by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// Newest first (default).
    #[default]
    TimeDesc,
    /// Oldest first.
    TimeAsc,
    /// Level ascending, then newest first within a level.
    LevelThenTime,
    /// Publisher name, lexicographic.
    Publisher,
}

/// Read-status filter applied by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadStatusFilter {
    #[default]
    All,
    Unread,
    Read,
}

/// Inclusive date range over `create_time`, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl DateRange {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, millis: i64) -> bool {
        if let Some(start) = self.start {
            if millis < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if millis > end {
                return false;
            }
        }
        true
    }
}

/// Filter, sort and paging state for a notification listing.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationFilter {
    pub level: Option<i32>,
    pub scope: Option<String>,
    pub read_status: ReadStatusFilter,
    pub search: String,
    pub date_range: DateRange,
    pub sort_by: SortBy,
    /// 1-indexed page number.
    pub page: usize,
    pub page_size: usize,
}

impl Default for NotificationFilter {
    fn default() -> Self {
        Self {
            level: None,
            scope: None,
            read_status: ReadStatusFilter::All,
            search: String::new(),
            date_range: DateRange::default(),
            sort_by: SortBy::TimeDesc,
            page: 1,
            page_size: 20,
        }
    }
}

impl NotificationFilter {
    /// Reset everything except the page size.
    pub fn reset(&mut self) {
        let page_size = self.page_size;
        *self = Self {
            page_size,
            ..Self::default()
        };
    }
}
