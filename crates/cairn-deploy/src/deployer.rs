use cairn_core::config::DeployConfig;
use cairn_storage::AssetStore;

use crate::session::SessionRegistry;
use crate::token::TokenSigner;

/// Protocol entry point: owns the store handle, token signer and the
/// registry of open upload sessions.
///
/// Phase operations live in [`crate::upload`] and [`crate::finalize`].
#[derive(Debug)]
pub struct Deployer {
    pub(crate) store: AssetStore,
    pub(crate) signer: TokenSigner,
    pub(crate) sessions: SessionRegistry,
    pub(crate) config: DeployConfig,
}

impl Deployer {
    pub fn new(store: AssetStore, signer: TokenSigner, config: DeployConfig) -> Self {
        Deployer {
            store,
            signer,
            sessions: SessionRegistry::new(),
            config,
        }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Drop expired upload sessions; returns how many were removed.
    pub fn sweep_sessions(&self) -> usize {
        self.sessions.sweep_expired(crate::unix_now())
    }

    pub(crate) fn batch_size(&self) -> usize {
        self.config.batch_size.max(1)
    }

    pub(crate) fn exists_concurrency(&self) -> usize {
        self.config.exists_concurrency.max(1)
    }
}
