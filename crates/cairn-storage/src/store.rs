//! Content-addressed asset store over an OpenDAL operator.
//!
//! Assets are immutable once written: a key is the SHA-256 of its bytes, so
//! rewriting an existing key with the same bytes is a no-op from a reader's
//! point of view. Manifests are replaced with a single whole-object write.

use bytes::Bytes;
use cairn_core::ProjectId;
use cairn_manifest::ContentHash;
use opendal::{ErrorKind, Operator};
use tracing::debug;

use crate::content_type::DEFAULT_CONTENT_TYPE;
use crate::error::StoreError;
use crate::keys::{asset_key, deployment_key, manifest_key};

/// Asset bytes plus the metadata stored alongside them
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub data: Bytes,
    pub content_type: String,
}

#[derive(Clone)]
pub struct AssetStore {
    op: Operator,
    /// Backend can attach a content type to an object
    content_type_meta: bool,
}

impl AssetStore {
    pub fn new(op: Operator) -> Self {
        let content_type_meta = op.info().full_capability().write_with_content_type;
        AssetStore {
            op,
            content_type_meta,
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    /// Whether content with this hash is already stored.
    pub async fn exists(&self, hash: &ContentHash) -> Result<bool, StoreError> {
        let key = asset_key(hash);
        self.op
            .exists(&key)
            .await
            .map_err(|e| StoreError::backend("exists", &key, e))
    }

    /// Store asset bytes under their content hash.
    pub async fn put_asset(
        &self,
        hash: &ContentHash,
        data: impl Into<Bytes>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let key = asset_key(hash);
        let data = data.into();
        let len = data.len();

        let result = if self.content_type_meta {
            self.op.write_with(&key, data).content_type(content_type).await
        } else {
            self.op.write(&key, data).await
        };
        result.map_err(|e| StoreError::backend("write", &key, e))?;

        debug!(hash = %hash, bytes = len, "stored asset");
        Ok(())
    }

    /// Read an asset and its content type. `None` when the key is absent.
    pub async fn get_asset(&self, hash: &ContentHash) -> Result<Option<StoredAsset>, StoreError> {
        let key = asset_key(hash);

        let data = match self.op.read(&key).await {
            Ok(buf) => buf.to_bytes(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::backend("read", &key, e)),
        };

        let content_type = if self.content_type_meta {
            let meta = self
                .op
                .stat(&key)
                .await
                .map_err(|e| StoreError::backend("stat", &key, e))?;
            meta.content_type().unwrap_or(DEFAULT_CONTENT_TYPE).to_string()
        } else {
            DEFAULT_CONTENT_TYPE.to_string()
        };

        Ok(Some(StoredAsset { data, content_type }))
    }

    /// Replace the project's manifest with one whole-object write.
    pub async fn put_manifest(&self, project: &ProjectId, bytes: Vec<u8>) -> Result<(), StoreError> {
        let key = manifest_key(project);
        self.op
            .write(&key, bytes)
            .await
            .map_err(|e| StoreError::backend("write", &key, e))?;
        Ok(())
    }

    pub async fn get_manifest(&self, project: &ProjectId) -> Result<Option<Vec<u8>>, StoreError> {
        self.read_optional(&manifest_key(project)).await
    }

    pub async fn put_deployment_record(
        &self,
        project: &ProjectId,
        json: Vec<u8>,
    ) -> Result<(), StoreError> {
        let key = deployment_key(project);
        let result = if self.content_type_meta {
            self.op
                .write_with(&key, json)
                .content_type("application/json")
                .await
        } else {
            self.op.write(&key, json).await
        };
        result.map_err(|e| StoreError::backend("write", &key, e))?;
        Ok(())
    }

    pub async fn get_deployment_record(
        &self,
        project: &ProjectId,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        self.read_optional(&deployment_key(project)).await
    }

    async fn read_optional(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.op.read(key).await {
            Ok(buf) => Ok(Some(buf.to_vec())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::backend("read", key, e)),
        }
    }
}

impl std::fmt::Debug for AssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetStore")
            .field("scheme", &self.op.info().scheme())
            .finish()
    }
}
