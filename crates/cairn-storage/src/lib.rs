//! cairn-storage: OpenDAL-backed content store
//!
//! Key layout:
//! ```text
//! assets/{sha256-hex}              asset bytes (content type as object metadata)
//! projects/{id}/manifest.bin       current binary manifest
//! projects/{id}/deployment.json    record of the current deployment
//! ```

pub mod content_type;
pub mod error;
pub mod health;
pub mod keys;
pub mod operator;
pub mod store;

pub use error::StoreError;
pub use health::check_health;
pub use operator::{build_from_core_config, build_operator, memory_operator, StorageConfig};
pub use store::{AssetStore, StoredAsset};
