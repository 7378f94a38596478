use crate::{
    cache::{CountCache, MokaCountCache},
    config::AuthzConfig,
    error::{AuthzError, Result},
    executor::GraphExecutor,
    mapper::{map_access, map_identifiers},
    models::*,
    pagination::Paginator,
    policy::Policy,
    query::{access_query, filter_query},
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Answers access questions for one policy against a graph database
pub struct AccessEngine {
    /// Graph database the compiled queries run against
    executor: Arc<dyn GraphExecutor>,

    /// Policy the rules are compiled from
    policy: Arc<Policy>,

    /// Paged filtering with the shared total-count cache
    paginator: Paginator,

    /// Page size for `filter_access_page`
    default_page_size: i64,

    /// Expired-entry sweep of a cache owned by this engine
    cache_sweep: Option<JoinHandle<()>>,
}

impl AccessEngine {
    /// Create an engine with an explicit count cache
    pub fn new(
        executor: Arc<dyn GraphExecutor>,
        cache: Arc<dyn CountCache>,
        policy: Arc<Policy>,
    ) -> Self {
        let paginator = Paginator::new(executor.clone(), cache);

        Self {
            executor,
            policy,
            paginator,
            default_page_size: AuthzConfig::default().default_page_size,
            cache_sweep: None,
        }
    }

    /// Create an engine whose count cache is built from `config`.
    ///
    /// Spawns the periodic cache sweep on the current tokio runtime; the task
    /// is aborted when the engine is dropped.
    pub fn from_config(
        executor: Arc<dyn GraphExecutor>,
        policy: Arc<Policy>,
        config: &AuthzConfig,
    ) -> Result<Self> {
        config.validate()?;
        tokio::runtime::Handle::try_current().map_err(|e| {
            AuthzError::Configuration(format!("Cache sweep needs a tokio runtime: {}", e))
        })?;

        let cache = MokaCountCache::from_config(&config.cache);
        let sweep = cache.spawn_cleanup(config.cache.cleanup_interval());

        let mut engine = Self::new(executor, Arc::new(cache), policy)
            .with_default_page_size(config.default_page_size);
        engine.cache_sweep = Some(sweep);
        Ok(engine)
    }

    /// Like [`Self::from_config`], loading the policy from `config.policy_path`
    pub fn from_config_file(
        executor: Arc<dyn GraphExecutor>,
        config: &AuthzConfig,
    ) -> Result<Self> {
        let path = config.policy_path.as_ref().ok_or_else(|| {
            AuthzError::Configuration("policy_path is not set".to_string())
        })?;
        let policy = Policy::from_file(path)?;
        info!("Loaded policy '{}' from {}", policy.namespace, path.display());

        Self::from_config(executor, Arc::new(policy), config)
    }

    pub fn with_default_page_size(mut self, page_size: i64) -> Self {
        self.default_page_size = page_size;
        self
    }

    /// Whether a background cache sweep is attached to this engine
    pub fn has_cache_sweep(&self) -> bool {
        self.cache_sweep
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn policy(&self) -> Arc<Policy> {
        self.policy.clone()
    }

    // =============================================================================
    // Point checks
    // =============================================================================

    /// Evaluate every clause of `action` for a subject/object pair.
    ///
    /// Returns one entry per clause so callers can see why access was or was
    /// not granted. Use [`is_allowed`] for the overall decision.
    pub async fn check_access(
        &self,
        subject: &Subject,
        action: &str,
        object: &Object,
    ) -> Result<Vec<AccessResult>> {
        let query = access_query(subject, action, object, &self.policy)?;
        let rows = self.executor.run(&query).await?;
        let audits = map_access(&rows)?;

        info!(
            "Access check {} {} {}: {}",
            subject,
            action,
            object,
            if is_allowed(&audits) { "granted" } else { "denied" }
        );
        Ok(audits)
    }

    // =============================================================================
    // Filtering
    // =============================================================================

    /// List every object of `object_type` the subject may perform `action` on
    pub async fn filter_access(
        &self,
        subject: &Subject,
        action: &str,
        object_type: &str,
    ) -> Result<FilterResult> {
        let query = filter_query(subject, action, object_type, &self.policy)?;
        let rows = self.executor.run(&query).await?;
        let identifiers = map_identifiers(&rows)?;

        debug!(
            "Filter {} {} {}: {} objects",
            subject,
            action,
            object_type,
            identifiers.len()
        );
        Ok(FilterResult { identifiers })
    }

    /// One page of [`Self::filter_access`], `page` is 1-based
    pub async fn filter_access_paginated(
        &self,
        subject: &Subject,
        action: &str,
        object_type: &str,
        limit: i64,
        page: i64,
    ) -> Result<PaginatedFilterResult> {
        let paginated = self
            .paginator
            .paginate(subject, action, object_type, &self.policy, limit, page)
            .await?;
        let rows = self.executor.run(&paginated.query).await?;
        let identifiers = map_identifiers(&rows)?;

        debug!(
            "Filter {} {} {}: page {}/{} with {} objects",
            subject,
            action,
            object_type,
            page,
            paginated.total_pages,
            identifiers.len()
        );
        Ok(PaginatedFilterResult {
            total: paginated.total_pages,
            current_page: page,
            data: vec![FilterResult { identifiers }],
        })
    }

    /// [`Self::filter_access_paginated`] with the configured page size
    pub async fn filter_access_page(
        &self,
        subject: &Subject,
        action: &str,
        object_type: &str,
        page: i64,
    ) -> Result<PaginatedFilterResult> {
        self.filter_access_paginated(subject, action, object_type, self.default_page_size, page)
            .await
    }

    /// Number of objects the subject may act on, through the count cache
    pub async fn count_access(
        &self,
        subject: &Subject,
        action: &str,
        object_type: &str,
    ) -> Result<u64> {
        self.paginator
            .total_count(subject, action, object_type, &self.policy)
            .await
    }
}

impl Drop for AccessEngine {
    fn drop(&mut self) {
        if let Some(sweep) = self.cache_sweep.take() {
            sweep.abort();
        }
    }
}
