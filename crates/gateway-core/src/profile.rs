//! Profile cache (C4): bounded LRU map from digest to profile, guarded by a
//! single lock (spec.md §5: "contention is acceptable because the hot path
//! is a hit"). A sharded cache is flagged in spec.md §9 as a drop-in
//! improvement, not implemented here.

use crate::digest::digest;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub display_name: String,
    pub mobile: String,
}

/// The external profile lookup (spec.md §1: `LoadProfile(customerId) ->
/// Profile`), consumed over HTTP.
pub struct ProfileLoader {
    client: reqwest::Client,
    base_url: String,
}

impl ProfileLoader {
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builds with a plain timeout"),
            base_url: base_url.into(),
        }
    }

    async fn load(&self, customer_id: &str) -> Option<Profile> {
        let url = format!("{}/profiles/{customer_id}", self.base_url);
        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.json::<Profile>().await.ok()
    }
}

pub struct ProfileCache {
    cache: Mutex<lru::LruCache<String, Profile>>,
    loader: ProfileLoader,
}

impl ProfileCache {
    #[must_use]
    pub fn new(loader: ProfileLoader, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1000).unwrap());
        Self {
            cache: Mutex::new(lru::LruCache::new(capacity)),
            loader,
        }
    }

    /// Looks up `raw_user_id`'s profile: cache hit on `digest(raw_user_id)`,
    /// else loads via the external profile service and populates the cache
    /// on success. Failures are never cached (spec.md §4.8).
    pub async fn get(&self, raw_user_id: &str) -> Option<Profile> {
        let key = digest(raw_user_id);
        if let Some(profile) = {
            let mut cache = self.cache.lock().expect("profile cache mutex poisoned");
            cache.get(&key).cloned()
        } {
            return Some(profile);
        }

        match self.loader.load(raw_user_id).await {
            Some(profile) => {
                let mut cache = self.cache.lock().expect("profile cache mutex poisoned");
                cache.put(key, profile.clone());
                Some(profile)
            }
            None => {
                warn!(user_id = raw_user_id, "profile load failed, not caching");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_based_keys_keep_raw_ids_out_of_the_cache() {
        let mut cache: lru::LruCache<String, Profile> =
            lru::LruCache::new(NonZeroUsize::new(2).unwrap());
        let key = digest("customer-1");
        cache.put(
            key.clone(),
            Profile {
                display_name: "Alice".to_owned(),
                mobile: "555-0100".to_owned(),
            },
        );
        assert!(cache.contains(&key));
        assert!(!cache.contains(&"customer-1".to_owned()));
    }

    #[tokio::test]
    async fn get_returns_none_when_loader_has_nothing_and_does_not_panic() {
        let loader = ProfileLoader::new("http://127.0.0.1:1", Duration::from_millis(500));
        let cache = ProfileCache::new(loader, 10);
        assert!(cache.get("customer-1").await.is_none());
    }
}
