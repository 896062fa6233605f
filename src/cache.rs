use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::ApiResult;
use crate::session::SessionScoped;

pub const APPLICATIONS_KEY: &str = "applications";
pub const PROFILE_QUERY_KEY: &str = "profile";

pub fn jobs_key(query: &str) -> String {
    format!("jobs:{}", query.trim().to_lowercase())
}

struct Entry {
    value: serde_json::Value,
    fetched_at: Instant,
}

/// Short-lived keyed cache of query results sitting above the API modules.
///
/// Values are held as JSON so one cache can serve every domain type.
/// Read failures are retried `retry` extra times, except 401s.
pub struct QueryCache {
    stale_after: Duration,
    retry: u32,
    entries: Mutex<HashMap<String, Entry>>,
}

impl QueryCache {
    pub fn new(stale_after: Duration, retry: u32) -> Self {
        Self {
            stale_after,
            retry,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serve a fresh entry, or run `fetcher` and store what it returns.
    pub async fn fetch<T, F, Fut>(&self, key: &str, fetcher: F) -> ApiResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        if let Some(value) = self.fresh(key) {
            debug!(key, "query cache hit");
            return Ok(value);
        }
        self.refetch(key, fetcher).await
    }

    /// Always go to the fetcher, ignoring any cached entry.
    pub async fn refetch<T, F, Fut>(&self, key: &str, mut fetcher: F) -> ApiResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(value) => {
                    self.set(key, &value);
                    return Ok(value);
                }
                Err(e) if attempt < self.retry && !e.is_unauthorized() => {
                    attempt += 1;
                    debug!(key, attempt, error = %e, "retrying query");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Cached value regardless of age.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries();
        let entry = entries.get(key)?;
        serde_json::from_value(entry.value.clone()).ok()
    }

    fn fresh<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries();
        let entry = entries.get(key)?;
        if entry.fetched_at.elapsed() >= self.stale_after {
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.entries().insert(
                    key.to_string(),
                    Entry {
                        value,
                        fetched_at: Instant::now(),
                    },
                );
            }
            Err(e) => debug!(key, error = %e, "value not cacheable"),
        }
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn invalidate(&self, prefix: &str) {
        self.entries().retain(|key, _| !key.starts_with(prefix));
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionScoped for QueryCache {
    fn clear_session_data(&self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_fresh_entry_skips_fetcher() {
        let cache = QueryCache::new(Duration::from_secs(60), 0);
        let calls = &AtomicU32::new(0);

        for _ in 0..3 {
            let value: Vec<u32> = cache
                .fetch(APPLICATIONS_KEY, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2])
                })
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let cache = QueryCache::new(Duration::ZERO, 0);
        let calls = &AtomicU32::new(0);
        for _ in 0..2 {
            let _: u32 = cache
                .fetch("k", move || async move { Ok(calls.fetch_add(1, Ordering::SeqCst)) })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get::<u32>("k"), Some(1));
    }

    #[tokio::test]
    async fn test_retries_failed_reads() {
        let cache = QueryCache::new(Duration::from_secs(60), 1);
        let calls = &AtomicU32::new(0);

        let value: String = cache
            .refetch("k", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ApiError::network())
                } else {
                    Ok("second time".to_string())
                }
            })
            .await
            .unwrap();
        assert_eq!(value, "second time");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let cache = QueryCache::new(Duration::from_secs(60), 3);
        let calls = &AtomicU32::new(0);

        let result: ApiResult<String> = cache
            .refetch("k", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::unauthorized())
            })
            .await;
        assert!(result.unwrap_err().is_unauthorized());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_by_prefix_and_clear() {
        let cache = QueryCache::new(Duration::from_secs(60), 0);
        cache.set(&jobs_key("React"), &1);
        cache.set(&jobs_key("rust"), &2);
        cache.set(APPLICATIONS_KEY, &3);

        cache.invalidate("jobs:");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get::<u32>(APPLICATIONS_KEY), Some(3));

        cache.clear_session_data();
        assert!(cache.is_empty());
    }
}
