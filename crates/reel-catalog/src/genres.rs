use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::CatalogResult;

/// A miss only triggers a reload once the current map is at least this old.
const MISS_REFRESH_COOLDOWN: Duration = Duration::from_secs(60);

struct Snapshot {
    loaded_at: Instant,
    /// Lowercased genre names and stringified ids, both mapped to the id.
    by_key: HashMap<String, u32>,
}

/// Process-wide read-through cache of the catalog's genre table.
///
/// Reloads when empty, when older than the TTL, or on a miss once the
/// cooldown has passed. A failed reload keeps serving the previous table.
pub struct GenreCache {
    ttl: Duration,
    miss_cooldown: Duration,
    state: RwLock<Option<Snapshot>>,
}

enum Cached {
    Hit(u32),
    Miss,
    Reload,
}

impl GenreCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_cooldown(ttl, MISS_REFRESH_COOLDOWN)
    }

    pub fn with_cooldown(ttl: Duration, miss_cooldown: Duration) -> Self {
        Self {
            ttl,
            miss_cooldown,
            state: RwLock::new(None),
        }
    }

    /// Look `key` up, calling `load` for a fresh `(id, name)` table when the
    /// cached one is missing, expired, or misses after the cooldown.
    pub async fn resolve<F, Fut>(&self, key: &str, load: F) -> CatalogResult<Option<u32>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CatalogResult<Vec<(u32, String)>>>,
    {
        let key = key.trim().to_lowercase();

        match self.cached(&key).await {
            Cached::Hit(id) => return Ok(Some(id)),
            Cached::Miss => return Ok(None),
            Cached::Reload => {}
        }

        match load().await {
            Ok(genres) => {
                let by_key = index(&genres);
                let found = by_key.get(&key).copied();
                info!(count = genres.len(), "Genre table loaded");
                *self.state.write().await = Some(Snapshot {
                    loaded_at: Instant::now(),
                    by_key,
                });
                Ok(found)
            }
            Err(e) => {
                let state = self.state.read().await;
                match state.as_ref() {
                    Some(snapshot) => {
                        warn!(error = %e, "Genre reload failed, serving previous table");
                        Ok(snapshot.by_key.get(&key).copied())
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn cached(&self, key: &str) -> Cached {
        let state = self.state.read().await;
        let Some(snapshot) = state.as_ref() else {
            return Cached::Reload;
        };

        let age = snapshot.loaded_at.elapsed();
        if age >= self.ttl {
            return Cached::Reload;
        }
        match snapshot.by_key.get(key) {
            Some(id) => Cached::Hit(*id),
            None if age >= self.miss_cooldown => Cached::Reload,
            None => Cached::Miss,
        }
    }
}

fn index(genres: &[(u32, String)]) -> HashMap<String, u32> {
    let mut by_key = HashMap::with_capacity(genres.len() * 2);
    for (id, name) in genres {
        by_key.insert(name.trim().to_lowercase(), *id);
        by_key.insert(id.to_string(), *id);
    }
    by_key
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::CatalogError;

    fn table() -> Vec<(u32, String)> {
        vec![(28, "Action".into()), (18, "Drama".into())]
    }

    #[tokio::test]
    async fn loads_once_and_serves_hits() {
        let cache = GenreCache::new(Duration::from_secs(3600));
        let loads = AtomicUsize::new(0);
        let counter = &loads;
        let load = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CatalogError>(table())
        };

        assert_eq!(cache.resolve("drama", load).await.unwrap(), Some(18));
        assert_eq!(cache.resolve(" ACTION ", load).await.unwrap(), Some(28));
        assert_eq!(cache.resolve("28", load).await.unwrap(), Some(28));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn misses_within_cooldown_do_not_reload() {
        let cache = GenreCache::new(Duration::from_secs(3600));
        let loads = AtomicUsize::new(0);
        let counter = &loads;
        let load = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CatalogError>(table())
        };

        cache.resolve("drama", load).await.unwrap();
        assert_eq!(cache.resolve("western", load).await.unwrap(), None);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn misses_after_cooldown_reload() {
        let cache = GenreCache::with_cooldown(Duration::from_secs(3600), Duration::ZERO);
        let loads = AtomicUsize::new(0);
        let counter = &loads;
        let load = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CatalogError>(table())
        };

        cache.resolve("drama", load).await.unwrap();
        cache.resolve("western", load).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_table_reloads() {
        let cache = GenreCache::new(Duration::ZERO);
        let loads = AtomicUsize::new(0);
        let counter = &loads;
        let load = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CatalogError>(table())
        };

        cache.resolve("drama", load).await.unwrap();
        cache.resolve("drama", load).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        let cache = GenreCache::new(Duration::from_secs(3600));
        cache.resolve("drama", load).await.unwrap();
        cache.resolve("drama", load).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_table() {
        let cache = GenreCache::new(Duration::ZERO);
        cache.resolve("drama", || async { Ok(table()) }).await.unwrap();

        let found = cache
            .resolve("drama", || async {
                Err(CatalogError::Unavailable("down".into()))
            })
            .await
            .unwrap();
        assert_eq!(found, Some(18));
    }

    #[tokio::test]
    async fn failed_first_load_is_an_error() {
        let cache = GenreCache::new(Duration::from_secs(60));
        let res = cache
            .resolve("drama", || async {
                Err(CatalogError::Unavailable("down".into()))
            })
            .await;
        assert!(res.is_err());
    }
}
