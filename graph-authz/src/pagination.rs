//! Paginated filtering with a cached total count.
//!
//! Counting every matching object is the expensive part of a paged listing,
//! so the total is cached per (subject, action, object type). A cached total
//! can be stale until its entry expires.

use crate::cache::CountCache;
use crate::error::{AuthzError, Result};
use crate::executor::GraphExecutor;
use crate::mapper::map_count;
use crate::models::Subject;
use crate::policy::Policy;
use crate::query::{count_query, filter_query, GraphQuery};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A windowed filter query plus the number of pages available
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedQuery {
    pub query: GraphQuery,
    pub total_pages: u64,
}

/// Cache key of the total count for a (subject, action, object type) tuple
pub fn count_cache_key(subject: &Subject, action: &str, object_type: &str) -> String {
    format!(
        "{}_{}_{}_{}_total",
        subject.subject_type, subject.id, action, object_type
    )
}

/// Ceiling division of `total` by `limit`. `limit` must be non-zero.
pub fn total_pages(total: u64, limit: u64) -> u64 {
    total.div_ceil(limit)
}

pub struct Paginator {
    executor: Arc<dyn GraphExecutor>,
    cache: Arc<dyn CountCache>,
}

impl Paginator {
    pub fn new(executor: Arc<dyn GraphExecutor>, cache: Arc<dyn CountCache>) -> Self {
        Self { executor, cache }
    }

    /// Number of distinct objects the subject may act on, served from the
    /// cache when possible
    pub async fn total_count(
        &self,
        subject: &Subject,
        action: &str,
        object_type: &str,
        policy: &Policy,
    ) -> Result<u64> {
        let key = count_cache_key(subject, action, object_type);

        if let Some(cached) = self.cache.get(&key).await {
            debug!("Count cache hit: {}", key);
            return cached
                .as_u64()
                .ok_or(AuthzError::CacheValueTypeMismatch(key));
        }

        debug!("Count cache miss: {}", key);
        let query = count_query(subject, action, object_type, policy)?;
        let rows = self.executor.run(&query).await?;
        let total = map_count(&rows)?;

        self.cache.set(key, Value::from(total)).await;
        Ok(total)
    }

    /// Build the filter query for a 1-based `page` of `limit` identifiers
    pub async fn paginate(
        &self,
        subject: &Subject,
        action: &str,
        object_type: &str,
        policy: &Policy,
        limit: i64,
        page: i64,
    ) -> Result<PaginatedQuery> {
        if page <= 0 {
            return Err(AuthzError::InvalidPage(page));
        }
        let page_size = u64::try_from(limit)
            .ok()
            .filter(|l| *l > 0)
            .ok_or(AuthzError::InvalidLimit(limit))?;
        let page_number = page.unsigned_abs();

        // Compile before touching the cache or the database
        let query = filter_query(subject, action, object_type, policy)?;

        let total = self.total_count(subject, action, object_type, policy).await?;
        let total_pages = total_pages(total, page_size);

        if page_number > total_pages {
            return Err(AuthzError::PageOutOfRange { page, total_pages });
        }

        let skip = (page_number - 1).saturating_mul(page_size);
        debug!(
            "Page {}/{} of {} {} {} (skip {}, limit {})",
            page, total_pages, subject, action, object_type, skip, page_size
        );

        Ok(PaginatedQuery {
            query: query.with_window(skip, page_size),
            total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MockCountCache, MokaCountCache};
    use crate::executor::{MockGraphExecutor, Row};
    use crate::policy::ObjectType;
    use crate::query::{Projection, LIMIT_PARAM, SKIP_PARAM};
    use proptest::prelude::*;
    use std::time::Duration;

    fn policy() -> Policy {
        Policy::new("docs").with_type(
            ObjectType::new("Document")
                .with_relation("owner", "User")
                .with_action("read", "owner"),
        )
    }

    fn counting_executor(total: u64, times: usize) -> MockGraphExecutor {
        let mut executor = MockGraphExecutor::new();
        executor
            .expect_run()
            .withf(|q| q.plan.projection == Projection::CountDistinct)
            .times(times)
            .returning(move |_| Ok(vec![Row::new().with("total", total)]));
        executor
    }

    fn fresh_cache() -> Arc<dyn CountCache> {
        Arc::new(MokaCountCache::new(Duration::from_secs(300), 100))
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(30, 10), 3);
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(
            count_cache_key(&Subject::new("User", "1"), "read", "Document"),
            "User_1_read_Document_total"
        );
    }

    #[tokio::test]
    async fn test_window_bounds() {
        let paginator = Paginator::new(Arc::new(counting_executor(25, 1)), fresh_cache());

        let page = paginator
            .paginate(&Subject::new("User", "1"), "read", "Document", &policy(), 10, 3)
            .await
            .unwrap();

        assert_eq!(page.total_pages, 3);
        assert_eq!(page.query.param(SKIP_PARAM), Some(&Value::from(20u64)));
        assert_eq!(page.query.param(LIMIT_PARAM), Some(&Value::from(10u64)));
    }

    #[tokio::test]
    async fn test_page_past_the_end() {
        let paginator = Paginator::new(Arc::new(counting_executor(25, 1)), fresh_cache());

        let err = paginator
            .paginate(&Subject::new("User", "1"), "read", "Document", &policy(), 10, 4)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthzError::PageOutOfRange { page: 4, total_pages: 3 }));
    }

    #[tokio::test]
    async fn test_empty_result_has_no_pages() {
        let paginator = Paginator::new(Arc::new(counting_executor(0, 1)), fresh_cache());

        let err = paginator
            .paginate(&Subject::new("User", "1"), "read", "Document", &policy(), 10, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthzError::PageOutOfRange { page: 1, total_pages: 0 }));
    }

    #[tokio::test]
    async fn test_invalid_page_and_limit_never_execute() {
        let paginator = Paginator::new(Arc::new(counting_executor(25, 0)), fresh_cache());
        let subject = Subject::new("User", "1");

        for page in [0, -1] {
            let err = paginator
                .paginate(&subject, "read", "Document", &policy(), 10, page)
                .await
                .unwrap_err();
            assert!(matches!(err, AuthzError::InvalidPage(p) if p == page));
        }

        let err = paginator
            .paginate(&subject, "read", "Document", &policy(), 0, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InvalidLimit(0)));
    }

    #[tokio::test]
    async fn test_compile_errors_precede_execution() {
        let paginator = Paginator::new(Arc::new(counting_executor(25, 0)), fresh_cache());

        let err = paginator
            .paginate(&Subject::new("User", "1"), "write", "Document", &policy(), 10, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthzError::ActionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_count_is_cached_across_calls() {
        let paginator = Paginator::new(Arc::new(counting_executor(25, 1)), fresh_cache());
        let subject = Subject::new("User", "1");

        let first = paginator
            .paginate(&subject, "read", "Document", &policy(), 10, 1)
            .await
            .unwrap();
        let second = paginator
            .paginate(&subject, "read", "Document", &policy(), 10, 2)
            .await
            .unwrap();

        assert_eq!(first.total_pages, second.total_pages);
    }

    #[tokio::test]
    async fn test_cached_value_of_wrong_type() {
        let mut cache = MockCountCache::new();
        cache
            .expect_get()
            .returning(|_| Some(Value::from("twenty-five")));
        cache.expect_set().never();

        let paginator = Paginator::new(Arc::new(counting_executor(25, 0)), Arc::new(cache));
        let err = paginator
            .paginate(&Subject::new("User", "1"), "read", "Document", &policy(), 10, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthzError::CacheValueTypeMismatch(key) if key == "User_1_read_Document_total"));
    }

    #[tokio::test]
    async fn test_count_failure_is_not_cached() {
        let mut executor = MockGraphExecutor::new();
        executor
            .expect_run()
            .times(1)
            .returning(|_| Err(AuthzError::QueryExecution("connection reset".to_string())));
        let mut cache = MockCountCache::new();
        cache.expect_get().returning(|_| None);
        cache.expect_set().never();

        let paginator = Paginator::new(Arc::new(executor), Arc::new(cache));
        let err = paginator
            .paginate(&Subject::new("User", "1"), "read", "Document", &policy(), 10, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthzError::QueryExecution(_)));
    }

    proptest! {
        #[test]
        fn prop_total_pages_is_ceiling(total in 0u64..1_000_000, limit in 1u64..1_000) {
            let pages = total_pages(total, limit);
            prop_assert!(pages * limit >= total);
            prop_assert!(pages == 0 || (pages - 1) * limit < total);
        }
    }
}
