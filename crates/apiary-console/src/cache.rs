//! Per-view result memo
//!
//! Keyed by view id plus the active filter fingerprint, bounded and
//! TTL-expired. Purely an optimization: correctness never depends on a
//! hit, and entity mutations invalidate the affected views.

use crate::views::{ViewData, ViewId};
use moka::future::Cache;
use std::time::Duration;

/// Cache key: one view under one filter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    view: ViewId,
    params: String,
}

impl CacheKey {
    /// Key for a view's unfiltered default load
    #[inline]
    #[must_use]
    pub fn of(view: ViewId) -> Self {
        Self {
            view,
            params: String::new(),
        }
    }

    /// Key for a view under a filter fingerprint
    #[inline]
    #[must_use]
    pub fn filtered(view: ViewId, params: impl Into<String>) -> Self {
        Self {
            view,
            params: params.into(),
        }
    }
}

/// The per-view memo
#[derive(Debug, Clone)]
pub struct DataCache {
    inner: Cache<CacheKey, ViewData>,
}

impl DataCache {
    /// Cache with max capacity and entry TTL
    #[must_use]
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .support_invalidation_closures()
                .build(),
        }
    }

    /// Cached data for a key, if fresh
    #[inline]
    pub async fn get(&self, key: &CacheKey) -> Option<ViewData> {
        self.inner.get(key).await
    }

    /// Store a loader result
    #[inline]
    pub async fn insert(&self, key: CacheKey, data: ViewData) {
        self.inner.insert(key, data).await;
    }

    /// Drop every entry of one view, across all filters.
    ///
    /// Called after any mutation that could change what the view shows.
    pub fn invalidate_view(&self, view: ViewId) {
        if let Err(err) = self
            .inner
            .invalidate_entries_if(move |key, _| key.view == view)
        {
            tracing::warn!(error = %err, "cache invalidation predicate rejected");
        }
    }

    /// Drop everything
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Approximate number of live entries
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for DataCache {
    /// Cache with default capacity (256 entries, 60s TTL)
    fn default() -> Self {
        Self::new(256, Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::DashboardData;

    fn data(n: u64) -> ViewData {
        ViewData::Dashboard(DashboardData {
            total_users: n,
            total_nodes: 0,
            online_nodes: 0,
            total_attacks: 0,
        })
    }

    #[tokio::test]
    async fn insert_and_get() {
        let cache = DataCache::default();
        let key = CacheKey::of(ViewId::Dashboard);

        assert!(cache.get(&key).await.is_none());
        cache.insert(key.clone(), data(3)).await;
        assert_eq!(cache.get(&key).await, Some(data(3)));
    }

    #[tokio::test]
    async fn filters_key_separately() {
        let cache = DataCache::default();
        let all = CacheKey::filtered(ViewId::Users, "limit=50");
        let active = CacheKey::filtered(ViewId::Users, "limit=50&status=active");

        cache.insert(all.clone(), data(10)).await;
        assert!(cache.get(&active).await.is_none());
        assert_eq!(cache.get(&all).await, Some(data(10)));
    }

    #[tokio::test]
    async fn view_invalidation_spares_other_views() {
        let cache = DataCache::default();
        let users = CacheKey::of(ViewId::Users);
        let stats = CacheKey::of(ViewId::Stats);
        cache.insert(users.clone(), data(1)).await;
        cache.insert(stats.clone(), data(2)).await;

        cache.invalidate_view(ViewId::Users);
        // Invalidation predicates apply eagerly on read
        assert!(cache.get(&users).await.is_none());
        assert_eq!(cache.get(&stats).await, Some(data(2)));
    }

    #[tokio::test]
    async fn ttl_expires_entries() {
        let cache = DataCache::new(16, Duration::from_millis(20));
        let key = CacheKey::of(ViewId::Stats);
        cache.insert(key.clone(), data(9)).await;
        assert!(cache.get(&key).await.is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get(&key).await.is_none());
    }
}
