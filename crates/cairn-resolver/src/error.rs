use cairn_core::ProjectId;
use cairn_manifest::ManifestError;
use cairn_storage::StoreError;
use thiserror::Error;

/// Failure to load or decode a manifest. A path that is simply absent from a
/// valid manifest is not an error.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("project '{0}' has no committed manifest")]
    ManifestMissing(ProjectId),

    #[error("corrupt manifest: {0}")]
    Decode(#[from] ManifestError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
