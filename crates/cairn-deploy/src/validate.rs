//! Input validation run before any session or store state is touched.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cairn_core::limits;
use cairn_manifest::ContentHash;

use crate::error::{DeployError, DeployResult};
use crate::types::{AssetDescriptor, DeploymentMetadata, SessionManifest, SubmittedAsset};

/// Characters that may not appear in a request path
const RESERVED: &[char] = &['?', '#', '\\', '<', '>', '"', '|', '^', '`', '{', '}'];

/// Check that `path` is a canonical absolute request path.
pub fn validate_path(path: &str) -> DeployResult<()> {
    let invalid = |reason: &str| DeployError::Validation(format!("invalid path {path:?}: {reason}"));

    if path.is_empty() {
        return Err(invalid("empty"));
    }
    if !path.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if let Some(c) = path
        .chars()
        .find(|c| c.is_control() || c.is_whitespace() || RESERVED.contains(c))
    {
        return Err(invalid(&format!("contains forbidden character {c:?}")));
    }
    if path.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(invalid("contains '.' or '..' segment"));
    }
    Ok(())
}

/// Validate a Phase 1 submission and normalise its hashes.
pub fn validate_manifest(
    submitted: BTreeMap<String, SubmittedAsset>,
) -> DeployResult<SessionManifest> {
    limits::check_asset_count(submitted.len())?;

    submitted
        .into_iter()
        .map(|(path, asset)| -> DeployResult<(String, AssetDescriptor)> {
            validate_path(&path)?;
            limits::check_asset_size(asset.size)
                .map_err(|e| DeployError::Validation(format!("{path}: {e}")))?;
            let hash = ContentHash::from_hex(&asset.hash)
                .map_err(|e| DeployError::Validation(format!("{path}: {e}")))?;
            Ok((
                path,
                AssetDescriptor {
                    hash,
                    size: asset.size,
                },
            ))
        })
        .collect()
}

/// Decode base64 content, naming `what` in the error.
pub fn decode_base64(what: &str, encoded: &str) -> DeployResult<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| DeployError::Validation(format!("{what}: invalid base64 content: {e}")))
}

/// Check metadata limits and decode server code modules.
///
/// Returns the decoded modules keyed by name; empty when no server code was sent.
pub fn validate_metadata(meta: &DeploymentMetadata) -> DeployResult<BTreeMap<String, Vec<u8>>> {
    limits::check_rule_counts(meta.static_rules.len(), meta.dynamic_rules.len())?;
    limits::check_env(meta.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;

    let Some(code) = &meta.server_code else {
        return Ok(BTreeMap::new());
    };

    if !code.modules.contains_key(&code.entrypoint) {
        return Err(DeployError::Validation(format!(
            "server code entrypoint '{}' is not among the uploaded modules",
            code.entrypoint
        )));
    }

    let mut total = 0u64;
    let mut modules = BTreeMap::new();
    for (name, encoded) in &code.modules {
        let bytes = decode_base64(&format!("module '{name}'"), encoded)?;
        total += bytes.len() as u64;
        limits::check_server_code_size(total)?;
        modules.insert(name.clone(), bytes);
    }
    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServerCode;
    use cairn_manifest::hash_content;

    #[test]
    fn accepts_canonical_paths() {
        for path in ["/", "/index.html", "/a/b/c.js", "/.well-known/security.txt", "/v1.2/x"] {
            assert!(validate_path(path).is_ok(), "{path}");
        }
    }

    #[test]
    fn rejects_bad_paths() {
        for path in [
            "",
            "index.html",
            "/a b",
            "/tab\there",
            "/x?y=1",
            "/frag#top",
            "/back\\slash",
            "/{id}",
            "/a/../etc/passwd",
            "/a/./b",
            "/..",
        ] {
            assert!(validate_path(path).is_err(), "{path:?}");
        }
    }

    #[test]
    fn manifest_hashes_normalised_to_lowercase() {
        let hash = hash_content(b"body");
        let mut submitted = BTreeMap::new();
        submitted.insert(
            "/a.txt".to_string(),
            SubmittedAsset {
                hash: hash.to_hex().to_uppercase(),
                size: 4,
            },
        );
        let manifest = validate_manifest(submitted).unwrap();
        assert_eq!(manifest["/a.txt"].hash, hash);
        assert_eq!(manifest["/a.txt"].hash.to_hex(), hash.to_hex());
    }

    #[test]
    fn manifest_rejects_short_hash_and_oversize() {
        let mut submitted = BTreeMap::new();
        submitted.insert(
            "/a.txt".to_string(),
            SubmittedAsset {
                hash: "abc123".into(),
                size: 4,
            },
        );
        let err = validate_manifest(submitted).unwrap_err();
        assert!(err.to_string().contains("/a.txt"));

        let mut submitted = BTreeMap::new();
        submitted.insert(
            "/big.bin".to_string(),
            SubmittedAsset {
                hash: hash_content(b"x").to_hex(),
                size: limits::MAX_ASSET_SIZE + 1,
            },
        );
        assert!(matches!(
            validate_manifest(submitted),
            Err(DeployError::Validation(_))
        ));
    }

    #[test]
    fn metadata_decodes_modules() {
        let mut modules = BTreeMap::new();
        modules.insert("main.js".to_string(), STANDARD.encode("export default {}"));
        let meta = DeploymentMetadata {
            server_code: Some(ServerCode {
                entrypoint: "main.js".into(),
                modules,
            }),
            ..Default::default()
        };
        let decoded = validate_metadata(&meta).unwrap();
        assert_eq!(decoded["main.js"], b"export default {}");
    }

    #[test]
    fn metadata_rejects_missing_entrypoint_and_bad_base64() {
        let mut modules = BTreeMap::new();
        modules.insert("lib.js".to_string(), STANDARD.encode("x"));
        let meta = DeploymentMetadata {
            server_code: Some(ServerCode {
                entrypoint: "main.js".into(),
                modules: modules.clone(),
            }),
            ..Default::default()
        };
        assert!(validate_metadata(&meta).is_err());

        modules.insert("main.js".to_string(), "not base64!!".into());
        let meta = DeploymentMetadata {
            server_code: Some(ServerCode {
                entrypoint: "main.js".into(),
                modules,
            }),
            ..Default::default()
        };
        assert!(validate_metadata(&meta).is_err());
    }

    #[test]
    fn metadata_rule_limits() {
        let meta = DeploymentMetadata {
            dynamic_rules: vec![serde_json::Value::Null; limits::MAX_DYNAMIC_RULES + 1],
            ..Default::default()
        };
        assert!(validate_metadata(&meta).is_err());
    }

    proptest::proptest! {
        #[test]
        fn traversal_segment_always_rejected(
            prefix in "(/[a-z0-9]{1,8}){0,4}",
            dots in proptest::sample::select(vec![".", ".."]),
            suffix in "(/[a-z0-9]{1,8}){0,4}",
        ) {
            let path = format!("{prefix}/{dots}{suffix}");
            proptest::prop_assert!(validate_path(&path).is_err());
        }

        #[test]
        fn plain_segments_accepted(path in "(/[a-z0-9_-]{1,12}){1,6}(\\.[a-z]{1,4})?") {
            proptest::prop_assert!(validate_path(&path).is_ok());
        }
    }
}
