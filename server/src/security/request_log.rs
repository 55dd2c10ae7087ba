use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use shared::types::log_entry::ApiLogEntry;

/// Bounded, newest-first request log.
///
/// Insertion pushes to the front and truncates, so after any sequence of
/// records the buffer holds exactly the newest `capacity` entries in
/// arrival order (newest first).  This is a sink: it never errors and never
/// blocks a request beyond the lock it takes to append.
#[derive(Clone, Debug)]
pub struct RequestLog {
    inner: Arc<RequestLogInner>,
}

#[derive(Debug)]
struct RequestLogInner {
    entries: RwLock<VecDeque<ApiLogEntry>>,
    capacity: usize,
}

/// Filters and pagination for [`RequestLog::query`].
#[derive(Debug, Clone)]
pub struct LogFilter {
    /// Exact method match, e.g. `"POST"`.
    pub method: Option<String>,
    /// Substring match on the request path.
    pub path: Option<String>,
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            method: None,
            path: None,
            page: 1,
            limit: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogPage {
    pub logs: Vec<ApiLogEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub pages: usize,
}

impl RequestLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RequestLogInner {
                entries: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
                capacity,
            }),
        }
    }

    /// Append a finalized entry, evicting the oldest past capacity.
    pub async fn record(&self, entry: ApiLogEntry) {
        let mut entries = self.inner.entries.write().await;
        entries.push_front(entry);
        entries.truncate(self.inner.capacity);
    }

    /// Filter and paginate a snapshot of the buffer (newest first).
    pub async fn query(&self, filter: &LogFilter) -> LogPage {
        let entries = self.inner.entries.read().await;

        let filtered: Vec<ApiLogEntry> = entries
            .iter()
            .filter(|entry| {
                filter
                    .method
                    .as_deref()
                    .is_none_or(|m| entry.method == m)
            })
            .filter(|entry| {
                filter
                    .path
                    .as_deref()
                    .is_none_or(|p| entry.path.contains(p))
            })
            .cloned()
            .collect();

        let total = filtered.len();
        let limit = filter.limit.max(1);
        let page = filter.page.max(1);
        let pages = total.div_ceil(limit);

        let start = (page - 1).saturating_mul(limit).min(total);
        let end = page.saturating_mul(limit).min(total);

        LogPage {
            logs: filtered[start..end].to_vec(),
            pagination: Pagination {
                total,
                page,
                limit,
                pages,
            },
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(method: &str, path: &str, status: u16, ts: u64) -> ApiLogEntry {
        ApiLogEntry {
            timestamp: ts,
            method: method.to_string(),
            path: path.to_string(),
            query: HashMap::new(),
            ip: None,
            user_agent: None,
            response_time: 1,
            status_code: status,
            error: None,
        }
    }

    #[tokio::test]
    async fn capacity_is_never_exceeded() {
        let log = RequestLog::new(10);
        for i in 0..25 {
            log.record(entry("GET", "/api/products", 200, i)).await;
        }
        assert_eq!(log.len().await, 10);
    }

    #[tokio::test]
    async fn newest_entries_survive_eviction() {
        let log = RequestLog::new(3);
        for i in 0..5 {
            log.record(entry("GET", "/health", 200, i)).await;
        }

        let page = log.query(&LogFilter::default()).await;
        let stamps: Vec<u64> = page.logs.iter().map(|e| e.timestamp).collect();
        // Newest first, oldest two evicted.
        assert_eq!(stamps, vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn method_filter_is_exact() {
        let log = RequestLog::new(10);
        log.record(entry("GET", "/api/products", 200, 1)).await;
        log.record(entry("POST", "/api/products", 201, 2)).await;

        let page = log
            .query(&LogFilter {
                method: Some("POST".to_string()),
                ..LogFilter::default()
            })
            .await;

        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.logs[0].status_code, 201);
    }

    #[tokio::test]
    async fn path_filter_is_substring() {
        let log = RequestLog::new(10);
        log.record(entry("GET", "/api/products", 200, 1)).await;
        log.record(entry("GET", "/api/admin/logs", 200, 2)).await;

        let page = log
            .query(&LogFilter {
                path: Some("admin".to_string()),
                ..LogFilter::default()
            })
            .await;

        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.logs[0].path, "/api/admin/logs");
    }

    #[tokio::test]
    async fn pagination_slices_and_counts_pages() {
        let log = RequestLog::new(50);
        for i in 0..7 {
            log.record(entry("GET", "/health", 200, i)).await;
        }

        let filter = LogFilter {
            page: 2,
            limit: 3,
            ..LogFilter::default()
        };
        let page = log.query(&filter).await;

        assert_eq!(page.pagination.total, 7);
        assert_eq!(page.pagination.pages, 3);
        assert_eq!(page.logs.len(), 3);
        // Newest first: page 2 of limit 3 holds timestamps 3, 2, 1.
        assert_eq!(page.logs[0].timestamp, 3);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_not_a_panic() {
        let log = RequestLog::new(10);
        log.record(entry("GET", "/health", 200, 1)).await;

        let page = log
            .query(&LogFilter {
                page: 99,
                limit: 10,
                ..LogFilter::default()
            })
            .await;

        assert!(page.logs.is_empty());
        assert_eq!(page.pagination.total, 1);
    }
}
