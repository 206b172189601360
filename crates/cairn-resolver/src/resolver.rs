use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use cairn_core::config::ResolverConfig;
use cairn_core::types::CacheStatus;
use cairn_core::ProjectId;
use cairn_manifest::{ContentHash, Manifest};
use cairn_storage::AssetStore;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::ResolveError;

/// Content served for a resolved path
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub hash: ContentHash,
    pub data: Bytes,
    pub content_type: String,
    /// HIT when the read finished within the configured threshold
    pub cache_status: CacheStatus,
}

impl ResolvedAsset {
    /// Public cache identifier: the content hash in hex
    pub fn etag(&self) -> String {
        self.hash.to_hex()
    }
}

struct CachedManifest {
    manifest: Arc<Manifest>,
    loaded_at: Instant,
}

/// Path resolution for one project.
pub struct Resolver {
    store: AssetStore,
    project: ProjectId,
    cache: RwLock<Option<CachedManifest>>,
    /// Bumped by every invalidation; a load only fills the cache if it is unchanged
    generation: AtomicU64,
    ttl: Duration,
    hit_threshold: Duration,
}

impl Resolver {
    pub fn new(store: AssetStore, project: ProjectId, config: &ResolverConfig) -> Self {
        Resolver {
            store,
            project,
            cache: RwLock::new(None),
            generation: AtomicU64::new(0),
            ttl: Duration::from_secs(config.manifest_ttl_secs),
            hit_threshold: Duration::from_millis(config.hit_threshold_ms),
        }
    }

    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    /// Content hash committed for `path`, or `None` if the path is not deployed.
    pub async fn exists(&self, path: &str) -> Result<Option<ContentHash>, ResolveError> {
        let manifest = self.manifest().await?;
        Ok(manifest.lookup(path))
    }

    /// Read content by hash, timing the read to classify it as HIT or MISS.
    pub async fn fetch(&self, hash: &ContentHash) -> Result<Option<ResolvedAsset>, ResolveError> {
        let started = Instant::now();
        let Some(asset) = self.store.get_asset(hash).await? else {
            warn!(project = %self.project, hash = %hash, "manifest references missing content");
            return Ok(None);
        };
        let elapsed = started.elapsed();

        let cache_status = if elapsed <= self.hit_threshold {
            CacheStatus::Hit
        } else {
            CacheStatus::Miss
        };
        debug!(
            hash = %hash,
            bytes = asset.data.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            status = cache_status.as_str(),
            "fetched asset"
        );

        Ok(Some(ResolvedAsset {
            hash: *hash,
            data: asset.data,
            content_type: asset.content_type,
            cache_status,
        }))
    }

    pub async fn fetch_by_path(&self, path: &str) -> Result<Option<ResolvedAsset>, ResolveError> {
        match self.exists(path).await? {
            Some(hash) => self.fetch(&hash).await,
            None => Ok(None),
        }
    }

    /// Drop the cached manifest; the next lookup reloads it from the store.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        *cache = None;
        drop(cache);
        debug!(project = %self.project, "manifest cache invalidated");
    }

    async fn manifest(&self) -> Result<Arc<Manifest>, ResolveError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.manifest));
            }
        }

        let generation = self.generation.load(Ordering::Acquire);
        let bytes = self
            .store
            .get_manifest(&self.project)
            .await?
            .ok_or_else(|| ResolveError::ManifestMissing(self.project.clone()))?;
        let manifest = Arc::new(Manifest::from_bytes(bytes)?);
        debug!(project = %self.project, entries = manifest.len(), "loaded manifest");

        self.cache_loaded(generation, Arc::clone(&manifest)).await;
        Ok(manifest)
    }

    /// Cache `manifest` unless an invalidation happened since its load began.
    async fn cache_loaded(&self, generation: u64, manifest: Arc<Manifest>) -> bool {
        let mut cache = self.cache.write().await;
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(project = %self.project, "discarding manifest loaded before invalidation");
            return false;
        }
        *cache = Some(CachedManifest {
            manifest,
            loaded_at: Instant::now(),
        });
        true
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("project", &self.project)
            .field("ttl", &self.ttl)
            .finish()
    }
}
