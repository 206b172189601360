//! Wire types for the deploy protocol (JSON, camelCase).

use cairn_core::ProjectId;
use cairn_manifest::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of a Phase 1 submission, as sent by the client.
///
/// The hash stays a string here so a malformed value is reported as a
/// validation error naming the offending path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAsset {
    pub hash: String,
    pub size: u64,
}

/// A validated manifest entry carried by sessions and tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub hash: ContentHash,
    pub size: u64,
}

/// Path → asset mapping of one deployment
pub type SessionManifest = BTreeMap<String, AssetDescriptor>;

/// Response to `create_session`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionGrant {
    pub jwt: String,
    /// Missing content hashes grouped into upload batches; empty when nothing is missing
    pub buckets: Vec<Vec<ContentHash>>,
}

/// Response to `accept_batch`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReceipt {
    /// Completion token, present once every missing hash has been uploaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

/// Server-side code shipped with a deployment (executed elsewhere).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCode {
    pub entrypoint: String,
    /// Module name → base64 module source
    pub modules: BTreeMap<String, String>,
}

/// Everything in a deploy request besides the assets themselves.
///
/// Rules are opaque to the core and handed to the routing front end as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentMetadata {
    pub server_code: Option<ServerCode>,
    pub env: BTreeMap<String, String>,
    pub static_rules: Vec<serde_json::Value>,
    pub dynamic_rules: Vec<serde_json::Value>,
}

/// Asset of a single-phase (legacy) deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAsset {
    pub pathname: String,
    /// base64 content
    pub content: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Result of a successful deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    pub success: bool,
    pub deployment_id: String,
    pub deployed_assets: usize,
    pub new_assets: usize,
    pub skipped_assets: usize,
}

/// Server code as recorded after commit: modules are referenced by content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCodeRecord {
    pub entrypoint: String,
    pub modules: BTreeMap<String, ContentHash>,
}

/// JSON document written next to the manifest for the routing front end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub deployment_id: String,
    pub project: ProjectId,
    pub deployed_at: u64,
    pub asset_count: usize,
    pub new_assets: usize,
    pub skipped_assets: usize,
    pub server_code: Option<ServerCodeRecord>,
    pub env: BTreeMap<String, String>,
    pub static_rules: Vec<serde_json::Value>,
    pub dynamic_rules: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_defaults_and_camel_case() {
        let meta: DeploymentMetadata = serde_json::from_str(
            r#"{"env": {"A": "1"}, "staticRules": [{"source": "/old", "destination": "/new"}]}"#,
        )
        .unwrap();
        assert!(meta.server_code.is_none());
        assert_eq!(meta.env["A"], "1");
        assert_eq!(meta.static_rules.len(), 1);
        assert!(meta.dynamic_rules.is_empty());
    }

    #[test]
    fn receipt_omits_missing_token() {
        let json = serde_json::to_string(&BatchReceipt::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn outcome_field_names() {
        let outcome = DeployOutcome {
            success: true,
            deployment_id: "d".into(),
            deployed_assets: 3,
            new_assets: 1,
            skipped_assets: 2,
        };
        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(v["deployedAssets"], 3);
        assert_eq!(v["newAssets"], 1);
        assert_eq!(v["skippedAssets"], 2);
    }
}
