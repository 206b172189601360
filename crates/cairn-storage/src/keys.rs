use cairn_core::ProjectId;
use cairn_manifest::ContentHash;

pub const ASSET_PREFIX: &str = "assets/";

pub fn asset_key(hash: &ContentHash) -> String {
    format!("{ASSET_PREFIX}{}", hash.to_hex())
}

pub fn manifest_key(project: &ProjectId) -> String {
    format!("projects/{project}/manifest.bin")
}

pub fn deployment_key(project: &ProjectId) -> String {
    format!("projects/{project}/deployment.json")
}
