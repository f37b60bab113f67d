//! HTTP client for the portal notification endpoints.
//!
//! The backend has shipped several envelope shapes over time (`code == 0`
//! vs `success`, the list under `list`/`notifications`/`records` or as a
//! bare array), so decoding is deliberately lenient: recognize what we can,
//! skip records that do not decode, and report a failed envelope as
//! `success = false` rather than an error. The service layer decides how to
//! degrade.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::constants::{DETAIL_PATH, LIST_PATH};
use crate::error::ApiError;
use crate::models::Notification;

/// Query parameters for the list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page_no: Option<u32>,
    pub page_size: Option<u32>,
    pub level: Option<i32>,
    pub scope: Option<String>,
}

impl ListParams {
    /// Cache key: the request signature under the list prefix.
    pub(crate) fn cache_key(&self) -> String {
        let signature = serde_json::to_string(self).unwrap_or_default();
        format!("{}{}", crate::constants::cache_keys::LIST_PREFIX, signature)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub list: Vec<Notification>,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct ListResponse {
    pub success: bool,
    pub data: ListPage,
    /// Set when `data` is the client-side fallback dataset, not server truth.
    pub is_fallback: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DetailResponse {
    pub success: bool,
    pub data: Option<Notification>,
    pub message: Option<String>,
}

/// The notification backend, abstracted for tests and transports.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn list(&self, params: &ListParams) -> Result<ListResponse, ApiError>;
    async fn detail(&self, id: i64) -> Result<DetailResponse, ApiError>;
}

/// `reqwest`-backed client against the portal backend.
pub struct HttpNotificationApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotificationApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn list_query(params: &ListParams) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("pageNo", params.page_no.unwrap_or(1).to_string()),
            ("pageSize", params.page_size.unwrap_or(20).to_string()),
        ];
        if let Some(level) = params.level {
            query.push(("level", level.to_string()));
        }
        if let Some(scope) = &params.scope {
            query.push(("scope", scope.clone()));
        }
        query
    }

    fn envelope_ok(body: &Value) -> bool {
        body.get("code").and_then(Value::as_i64) == Some(0)
            || body.get("success").and_then(Value::as_bool) == Some(true)
    }

    fn envelope_message(body: &Value) -> Option<String> {
        body.get("msg")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Decode a list envelope, tolerating every payload shape the backend
    /// has used. Records that fail to decode are skipped, not fatal.
    fn decode_list(body: Value) -> ListResponse {
        if !Self::envelope_ok(&body) {
            return ListResponse {
                success: false,
                data: ListPage::default(),
                is_fallback: false,
                message: Self::envelope_message(&body),
            };
        }

        let data = body.get("data").cloned().unwrap_or(Value::Null);
        let raw_list = if data.is_array() {
            data.clone()
        } else {
            ["notifications", "list", "records"]
                .iter()
                .find_map(|field| data.get(field).filter(|v| v.is_array()).cloned())
                .unwrap_or(Value::Array(Vec::new()))
        };

        let mut list = Vec::new();
        if let Value::Array(items) = raw_list {
            for item in items {
                match serde_json::from_value::<Notification>(item) {
                    Ok(notification) => list.push(notification),
                    Err(err) => {
                        tracing::warn!("api: skipping undecodable notification: {}", err);
                    }
                }
            }
        }

        let total = data
            .get("total")
            .or_else(|| data.get("totalCount"))
            .and_then(Value::as_u64)
            .map(|t| t as usize)
            .unwrap_or(list.len());

        ListResponse {
            success: true,
            data: ListPage { list, total },
            is_fallback: false,
            message: None,
        }
    }

    fn decode_detail(body: Value) -> DetailResponse {
        if !Self::envelope_ok(&body) {
            return DetailResponse {
                success: false,
                data: None,
                message: Self::envelope_message(&body),
            };
        }
        let data = body
            .get("data")
            .cloned()
            .and_then(|v| serde_json::from_value::<Notification>(v).ok());
        DetailResponse {
            success: data.is_some(),
            data,
            message: None,
        }
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn list(&self, params: &ListParams) -> Result<ListResponse, ApiError> {
        let url = format!("{}{}", self.base_url, LIST_PATH);
        let response = self
            .client
            .get(&url)
            .query(&Self::list_query(params))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Server(format!(
                "list request failed with status {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(Self::decode_list(body))
    }

    async fn detail(&self, id: i64) -> Result<DetailResponse, ApiError> {
        let url = format!("{}{}", self.base_url, DETAIL_PATH);
        let response = self
            .client
            .get(&url)
            .query(&[("id", id.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Server(format!(
                "detail request failed with status {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(Self::decode_detail(body))
    }
}

/// Fixed offline dataset served when the backend is unreachable or reports
/// failure. Content mirrors the portal's standing notices.
pub fn fallback_notifications() -> Vec<Notification> {
    vec![
        Notification {
            id: 1,
            title: "Final exam schedule".to_string(),
            content: "Spring term finals begin on January 15. Check your seat assignments in advance.".to_string(),
            level: 2,
            publisher_name: "Academic Affairs Office".to_string(),
            publisher_role: "ACADEMIC_ADMIN".to_string(),
            create_time: "2025-01-06 08:00:00".to_string(),
            scope: "SCHOOL_WIDE".to_string(),
            status: "PUBLISHED".to_string(),
            summary: None,
            is_read: false,
        },
        Notification {
            id: 2,
            title: "Campus safety reminder".to_string(),
            content: "Walkways may be icy in the early morning. Please take care between buildings.".to_string(),
            level: 1,
            publisher_name: "Security Office".to_string(),
            publisher_role: "PRINCIPAL".to_string(),
            create_time: "2025-01-06 06:30:00".to_string(),
            scope: "SCHOOL_WIDE".to_string(),
            status: "PUBLISHED".to_string(),
            summary: None,
            is_read: false,
        },
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    /// Scriptable in-memory backend for service/store tests.
    pub struct MockApi {
        responses: Mutex<VecDeque<Result<ListResponse, ApiError>>>,
        pub detail_responses: Mutex<VecDeque<Result<DetailResponse, ApiError>>>,
        list_calls: AtomicU64,
        detail_calls: AtomicU64,
        /// Per-call artificial latency, for cancellation tests.
        pub list_delays: Mutex<VecDeque<Duration>>,
        pub detail_delays: Mutex<VecDeque<Duration>>,
    }

    impl MockApi {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                detail_responses: Mutex::new(VecDeque::new()),
                list_calls: AtomicU64::new(0),
                detail_calls: AtomicU64::new(0),
                list_delays: Mutex::new(VecDeque::new()),
                detail_delays: Mutex::new(VecDeque::new()),
            }
        }

        pub fn ok_list(list: Vec<Notification>) -> Result<ListResponse, ApiError> {
            let total = list.len();
            Ok(ListResponse {
                success: true,
                data: ListPage { list, total },
                is_fallback: false,
                message: None,
            })
        }

        pub fn failed_list(message: &str) -> Result<ListResponse, ApiError> {
            Ok(ListResponse {
                success: false,
                data: ListPage::default(),
                is_fallback: false,
                message: Some(message.to_string()),
            })
        }

        pub fn push_list(&self, response: Result<ListResponse, ApiError>) {
            self.responses.lock().push_back(response);
        }

        pub fn push_detail(&self, response: Result<DetailResponse, ApiError>) {
            self.detail_responses.lock().push_back(response);
        }

        pub fn list_calls(&self) -> u64 {
            self.list_calls.load(Ordering::SeqCst)
        }

        pub fn detail_calls(&self) -> u64 {
            self.detail_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NotificationApi for MockApi {
        async fn list(&self, _params: &ListParams) -> Result<ListResponse, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.list_delays.lock().pop_front();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Transport("no scripted response".to_string())))
        }

        async fn detail(&self, id: i64) -> Result<DetailResponse, ApiError> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.detail_delays.lock().pop_front();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.detail_responses.lock().pop_front().unwrap_or_else(|| {
                Ok(DetailResponse {
                    success: false,
                    data: None,
                    message: Some(format!("no scripted detail for {}", id)),
                })
            })
        }
    }
}
