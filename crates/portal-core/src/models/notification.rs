use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::constants::{levels, SYSTEM_NAME_MARKERS, SYSTEM_ROLES};

/// A single notification as delivered by the list endpoint.
///
/// `level` is kept as the raw integer so out-of-range values survive
/// deserialization; the categorizer decides what to do with them. `is_read`
/// is derived client-side at categorization time and is never part of server
/// truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub level: i32,
    #[serde(default)]
    pub publisher_name: String,
    #[serde(default)]
    pub publisher_role: String,
    #[serde(default)]
    pub create_time: String,
    /// The live backend sends `targetScope`, older payloads send `scope`.
    #[serde(default, alias = "targetScope")]
    pub scope: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub is_read: bool,
}

impl Notification {
    /// Parse `create_time` into epoch milliseconds for ordering.
    ///
    /// The backend has emitted several formats over time (RFC 3339, space- or
    /// `T`-separated local datetimes, bare dates). Unparseable values sort
    /// last via 0 rather than failing the record.
    pub fn created_at_millis(&self) -> i64 {
        let raw = self.create_time.trim();
        if raw.is_empty() {
            return 0;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return dt.timestamp_millis();
        }
        for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                return dt.and_utc().timestamp_millis();
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return dt.and_utc().timestamp_millis();
            }
        }
        0
    }

    /// Whether this notification comes from the system publisher.
    ///
    /// Matches the role enum first, then falls back to a name-substring
    /// check for historical data where the role field is unreliable.
    pub fn is_system_publisher(&self) -> bool {
        if SYSTEM_ROLES.contains(&self.publisher_role.as_str()) {
            return true;
        }
        SYSTEM_NAME_MARKERS
            .iter()
            .any(|marker| self.publisher_name.contains(marker))
    }

    pub fn is_emergency(&self) -> bool {
        self.level == levels::EMERGENCY
    }

    pub fn is_reminder(&self) -> bool {
        self.level == levels::REMINDER
    }

    /// Display label for the level.
    pub fn level_label(&self) -> &'static str {
        match self.level {
            levels::EMERGENCY => "emergency",
            levels::IMPORTANT => "important",
            levels::NORMAL => "normal",
            levels::REMINDER => "reminder",
            _ => "unknown",
        }
    }

    /// Accent color for the level, as used by the portal widgets.
    pub fn level_color(&self) -> &'static str {
        match self.level {
            levels::EMERGENCY => "#F56C6C",
            levels::IMPORTANT => "#E6A23C",
            levels::NORMAL => "#409EFF",
            levels::REMINDER => "#67C23A",
            _ => "#909399",
        }
    }

    /// Display label for the target scope.
    pub fn scope_label(&self) -> &str {
        match self.scope.as_str() {
            "SCHOOL_WIDE" => "school-wide",
            "DEPARTMENT" => "department",
            "GRADE" => "grade",
            "CLASS" => "class",
            other => other,
        }
    }
}
