//! cairn-deploy: the three-phase upload/deployment protocol
//!
//! 1. `create_session`: validate the submitted path → {hash, size} map, diff
//!    content hashes against the store, and hand back a session token plus the
//!    missing hashes grouped into batches.
//! 2. `accept_batch`: store uploaded content; once every originally-missing
//!    hash is present, return a completion token.
//! 3. `finalize`: verify the completion token, encode the manifest and commit
//!    it with a single write.
//!
//! `deploy_legacy` runs all three phases in one call for clients that send
//! raw content directly.

pub mod deployer;
pub mod error;
pub mod finalize;
pub mod session;
pub mod token;
pub mod types;
pub mod upload;
pub mod validate;

pub use deployer::Deployer;
pub use error::{DeployError, DeployResult};
pub use session::{SessionError, SessionRegistry};
pub use token::{SessionClaims, TokenError, TokenSigner};
pub use types::{
    AssetDescriptor, BatchReceipt, DeployOutcome, DeploymentMetadata, DeploymentRecord,
    LegacyAsset, ServerCode, SessionGrant, SubmittedAsset,
};

/// Current Unix time in seconds
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
