//! Phase 3: commit the manifest, plus the single-call legacy deploy.
//!
//! The manifest is the commit point. Server code modules are written before
//! it and the deployment record after it; a failure anywhere leaves the
//! previous manifest in place and the session claim is released so the same
//! completion token can be retried.

use std::collections::{BTreeMap, HashMap, HashSet};

use cairn_core::limits;
use cairn_core::types::Phase;
use cairn_core::ProjectId;
use cairn_manifest::{hash_content, ContentHash, Manifest};
use cairn_storage::content_type;
use tracing::{info, warn};
use uuid::Uuid;

use crate::deployer::Deployer;
use crate::error::{DeployError, DeployResult};
use crate::token::{manifest_digest, TokenError};
use crate::types::{
    AssetDescriptor, DeployOutcome, DeploymentMetadata, DeploymentRecord, LegacyAsset,
    ServerCodeRecord, SessionManifest,
};
use crate::unix_now;
use crate::validate::{decode_base64, validate_metadata, validate_path};

impl Deployer {
    /// Phase 3: verify the completion token and commit its manifest.
    pub async fn finalize(
        &self,
        token: &str,
        project: &ProjectId,
        metadata: DeploymentMetadata,
    ) -> DeployResult<DeployOutcome> {
        let now = unix_now();
        let claims = self.signer.verify(token, Phase::Complete, project, now)?;
        let manifest = claims
            .manifest
            .as_ref()
            .filter(|m| manifest_digest(m) == claims.mdg)
            .ok_or(TokenError::Malformed)?;

        let modules = validate_metadata(&metadata)?;

        let claimed = self.sessions.claim(&claims.sid, project, now)?;
        if claimed.pending > 0 {
            self.sessions.release(&claims.sid);
            return Err(DeployError::Conflict(format!(
                "{} uploads still pending",
                claimed.pending
            )));
        }

        match self
            .commit(project, manifest, &claimed.new_assets, metadata, modules)
            .await
        {
            Ok(outcome) => {
                self.sessions.remove(&claims.sid);
                Ok(outcome)
            }
            Err(e) => {
                warn!(project = %project, session = %claims.sid, "finalize failed, session released: {e}");
                self.sessions.release(&claims.sid);
                Err(e)
            }
        }
    }

    /// Single-phase deployment: hash, diff, store and commit in one call.
    pub async fn deploy_legacy(
        &self,
        project: &ProjectId,
        assets: Vec<LegacyAsset>,
        metadata: DeploymentMetadata,
    ) -> DeployResult<DeployOutcome> {
        limits::check_asset_count(assets.len())?;
        let modules = validate_metadata(&metadata)?;

        // Decode everything before the first write
        let mut manifest = SessionManifest::new();
        let mut contents: HashMap<ContentHash, (Vec<u8>, String)> = HashMap::new();
        for asset in assets {
            validate_path(&asset.pathname)?;
            let data = decode_base64(&asset.pathname, &asset.content)?;
            limits::check_asset_size(data.len() as u64)?;

            let hash = hash_content(&data);
            let content_type = asset
                .content_type
                .filter(|ct| !ct.is_empty())
                .unwrap_or_else(|| content_type::for_path(&asset.pathname).to_string());
            manifest.insert(
                asset.pathname,
                AssetDescriptor {
                    hash,
                    size: data.len() as u64,
                },
            );
            contents.entry(hash).or_insert((data, content_type));
        }

        let mut seen = HashSet::new();
        let distinct: Vec<ContentHash> = manifest
            .values()
            .map(|asset| asset.hash)
            .filter(|hash| seen.insert(*hash))
            .collect();
        let present = self.present_in_store(distinct.iter()).await?;

        let mut new_assets = HashSet::new();
        for (hash, present) in distinct.into_iter().zip(present) {
            if present {
                continue;
            }
            if let Some((data, content_type)) = contents.remove(&hash) {
                self.store.put_asset(&hash, data, &content_type).await?;
            }
            new_assets.insert(hash);
        }

        self.commit(project, &manifest, &new_assets, metadata, modules)
            .await
    }

    async fn commit(
        &self,
        project: &ProjectId,
        manifest: &SessionManifest,
        new_assets: &HashSet<ContentHash>,
        metadata: DeploymentMetadata,
        modules: BTreeMap<String, Vec<u8>>,
    ) -> DeployResult<DeployOutcome> {
        let server_code = match &metadata.server_code {
            Some(code) => {
                let mut hashes = BTreeMap::new();
                for (name, bytes) in modules {
                    let hash = hash_content(&bytes);
                    self.store
                        .put_asset(&hash, bytes, content_type::for_path(&name))
                        .await?;
                    hashes.insert(name, hash);
                }
                Some(ServerCodeRecord {
                    entrypoint: code.entrypoint.clone(),
                    modules: hashes,
                })
            }
            None => None,
        };

        let committed = Manifest::build(manifest.iter().map(|(path, asset)| (path.as_str(), asset.hash)));
        let entries = committed.len();
        self.store.put_manifest(project, committed.into_bytes()).await?;

        let deployed_assets = manifest.len();
        let new_count = manifest
            .values()
            .filter(|asset| new_assets.contains(&asset.hash))
            .count();
        let outcome = DeployOutcome {
            success: true,
            deployment_id: Uuid::new_v4().to_string(),
            deployed_assets,
            new_assets: new_count,
            skipped_assets: deployed_assets - new_count,
        };

        let record = DeploymentRecord {
            deployment_id: outcome.deployment_id.clone(),
            project: project.clone(),
            deployed_at: unix_now(),
            asset_count: deployed_assets,
            new_assets: outcome.new_assets,
            skipped_assets: outcome.skipped_assets,
            server_code,
            env: metadata.env,
            static_rules: metadata.static_rules,
            dynamic_rules: metadata.dynamic_rules,
        };
        let json = serde_json::to_vec(&record)
            .map_err(|e| DeployError::Internal(format!("serializing deployment record: {e}")))?;
        self.store.put_deployment_record(project, json).await?;

        info!(
            project = %project,
            deployment = %outcome.deployment_id,
            entries,
            deployed = outcome.deployed_assets,
            new = outcome.new_assets,
            skipped = outcome.skipped_assets,
            "deployment committed"
        );

        Ok(outcome)
    }
}
