//! Visual Cache
//!
//! Shares generated visuals between runs that ask for the same
//! (prompt, style, model). Entries point at files on disk; an entry whose
//! file has disappeared is dropped on lookup.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::core::generative::VisualRequest;
use crate::core::VisualAsset;

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualCacheStats {
    pub entry_count: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because their file was gone
    pub evictions: u64,
}

/// Hex SHA-256 over the normalized request fields
pub fn visual_cache_key(request: &VisualRequest) -> String {
    let mut hasher = Sha256::new();
    for field in [&request.prompt, &request.style, &request.model] {
        hasher.update(field.trim().as_bytes());
        // Separator so ("ab", "c") and ("a", "bc") differ.
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// In-memory map from request key to generated asset.
///
/// Cloning shares the underlying map. Reads run concurrently; a second
/// insert for the same key replaces the first.
#[derive(Debug, Clone, Default)]
pub struct VisualCache {
    entries: Arc<RwLock<HashMap<String, VisualAsset>>>,
    stats: Arc<RwLock<VisualCacheStats>>,
}

impl VisualCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached asset if its file still exists
    pub async fn get(&self, request: &VisualRequest) -> Option<VisualAsset> {
        let key = visual_cache_key(request);
        let found = self.entries.read().await.get(&key).cloned();

        match found {
            Some(asset) if tokio::fs::try_exists(&asset.path).await.unwrap_or(false) => {
                self.stats.write().await.hits += 1;
                Some(asset)
            }
            Some(_) => {
                let mut entries = self.entries.write().await;
                entries.remove(&key);
                let mut stats = self.stats.write().await;
                stats.evictions += 1;
                stats.misses += 1;
                stats.entry_count = entries.len();
                None
            }
            None => {
                self.stats.write().await.misses += 1;
                None
            }
        }
    }

    /// Stores an asset, replacing any previous entry for the request
    pub async fn insert(&self, request: &VisualRequest, asset: VisualAsset) {
        let mut entries = self.entries.write().await;
        entries.insert(visual_cache_key(request), asset);
        self.stats.write().await.entry_count = entries.len();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        self.stats.write().await.entry_count = 0;
    }

    pub async fn stats(&self) -> VisualCacheStats {
        self.stats.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(prompt: &str) -> VisualRequest {
        VisualRequest {
            prompt: prompt.to_string(),
            style: "cinematic".to_string(),
            model: "flux".to_string(),
        }
    }

    #[test]
    fn test_key_depends_on_every_field() {
        let base = request("red planet");
        let mut other_style = base.clone();
        other_style.style = "anime".to_string();
        let mut other_model = base.clone();
        other_model.model = "sdxl".to_string();

        let key = visual_cache_key(&base);
        assert_eq!(key.len(), 64);
        assert_eq!(key, visual_cache_key(&request("  red planet ")));
        assert_ne!(key, visual_cache_key(&other_style));
        assert_ne!(key, visual_cache_key(&other_model));
    }

    #[test]
    fn test_key_fields_are_separated() {
        let a = VisualRequest {
            prompt: "ab".to_string(),
            style: "c".to_string(),
            model: "m".to_string(),
        };
        let b = VisualRequest {
            prompt: "a".to_string(),
            style: "bc".to_string(),
            model: "m".to_string(),
        };
        assert_ne!(visual_cache_key(&a), visual_cache_key(&b));
    }

    #[tokio::test]
    async fn test_hit_after_insert() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("visual.mp4");
        std::fs::write(&path, b"video").unwrap();

        let cache = VisualCache::new();
        assert!(cache.get(&request("moons")).await.is_none());

        cache
            .insert(&request("moons"), VisualAsset::generated(&path, 4.0))
            .await;
        let hit = cache.get(&request("moons")).await.unwrap();
        assert_eq!(hit.path, path);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.mp4");
        let second = dir.path().join("b.mp4");
        std::fs::write(&first, b"a").unwrap();
        std::fs::write(&second, b"b").unwrap();

        let cache = VisualCache::new();
        cache
            .insert(&request("x"), VisualAsset::generated(&first, 1.0))
            .await;
        cache
            .insert(&request("x"), VisualAsset::generated(&second, 1.0))
            .await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&request("x")).await.unwrap().path, second);
    }

    #[tokio::test]
    async fn test_missing_file_is_evicted() {
        let dir = TempDir::new().unwrap();
        let cache = VisualCache::new();
        cache
            .insert(
                &request("gone"),
                VisualAsset::generated(dir.path().join("deleted.mp4"), 1.0),
            )
            .await;

        assert!(cache.get(&request("gone")).await.is_none());
        assert!(cache.is_empty().await);
        assert_eq!(cache.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.mp4");
        std::fs::write(&path, b"v").unwrap();

        let cache = VisualCache::new();
        let clone = cache.clone();
        clone
            .insert(&request("shared"), VisualAsset::generated(&path, 2.0))
            .await;
        assert!(cache.get(&request("shared")).await.is_some());

        cache.clear().await;
        assert!(clone.is_empty().await);
    }
}
