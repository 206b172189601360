use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cairn_core::config::ResolverConfig;
use cairn_core::ProjectId;
use cairn_manifest::ContentHash;
use cairn_storage::AssetStore;
use tracing::debug;

use crate::error::ResolveError;
use crate::resolver::{ResolvedAsset, Resolver};

/// One [`Resolver`] per project.
///
/// A resolver only joins the pool once its project's manifest has loaded, so
/// lookups for projects that were never deployed leave no entry behind.
pub struct ResolverPool {
    store: AssetStore,
    config: ResolverConfig,
    resolvers: Mutex<HashMap<ProjectId, Arc<Resolver>>>,
    /// Bumped by [`ResolverPool::invalidate`]; resolvers checked out before
    /// a bump are not pooled
    generation: AtomicU64,
}

impl ResolverPool {
    pub fn new(store: AssetStore, config: ResolverConfig) -> Self {
        ResolverPool {
            store,
            config,
            resolvers: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Pooled resolver for `project`, if one has served a lookup.
    pub fn get(&self, project: &ProjectId) -> Option<Arc<Resolver>> {
        self.resolvers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(project)
            .cloned()
    }

    pub async fn exists(
        &self,
        project: &ProjectId,
        path: &str,
    ) -> Result<Option<ContentHash>, ResolveError> {
        let (resolver, generation) = self.checkout(project);
        let result = resolver.exists(path).await;
        self.settle(&resolver, generation, &result);
        result
    }

    pub async fn fetch_by_path(
        &self,
        project: &ProjectId,
        path: &str,
    ) -> Result<Option<ResolvedAsset>, ResolveError> {
        let (resolver, generation) = self.checkout(project);
        let result = resolver.fetch_by_path(path).await;
        self.settle(&resolver, generation, &result);
        result
    }

    /// Called after a new manifest is committed for `project`.
    pub async fn invalidate(&self, project: &ProjectId) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(resolver) = self.get(project) {
            resolver.invalidate().await;
        }
    }

    pub fn len(&self) -> usize {
        self.resolvers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn checkout(&self, project: &ProjectId) -> (Arc<Resolver>, u64) {
        let map = self.resolvers.lock().unwrap_or_else(|e| e.into_inner());
        let generation = self.generation.load(Ordering::Acquire);
        let resolver = map.get(project).cloned().unwrap_or_else(|| {
            Arc::new(Resolver::new(self.store.clone(), project.clone(), &self.config))
        });
        (resolver, generation)
    }

    /// Keep `resolver` after a successful lookup; drop it when its project
    /// has no manifest.
    fn settle<T>(
        &self,
        resolver: &Arc<Resolver>,
        generation: u64,
        result: &Result<T, ResolveError>,
    ) {
        let project = resolver.project();
        let mut map = self.resolvers.lock().unwrap_or_else(|e| e.into_inner());
        match result {
            Ok(_) => {
                // may hold a manifest from before a commit nobody told it about
                if self.generation.load(Ordering::Acquire) != generation
                    && !map.get(project).is_some_and(|r| Arc::ptr_eq(r, resolver))
                {
                    return;
                }
                map.entry(project.clone())
                    .or_insert_with(|| Arc::clone(resolver));
            }
            Err(ResolveError::ManifestMissing(_)) => {
                if map.get(project).is_some_and(|r| Arc::ptr_eq(r, resolver)) {
                    map.remove(project);
                    debug!(project = %project, "dropped resolver for project without manifest");
                }
            }
            Err(_) => {}
        }
    }
}
