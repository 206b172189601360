//! AssetStore behaviour against OpenDAL's in-memory and fs services.

use cairn_core::ProjectId;
use cairn_manifest::hash_content;
use cairn_storage::content_type::DEFAULT_CONTENT_TYPE;
use cairn_storage::{memory_operator, AssetStore};
use opendal::Operator;

fn memory_store() -> AssetStore {
    AssetStore::new(memory_operator().expect("memory operator"))
}

/// Content type a read should report, given what the backend can record
fn expected_type(store: &AssetStore, written: &'static str) -> &'static str {
    if store.operator().info().full_capability().write_with_content_type {
        written
    } else {
        DEFAULT_CONTENT_TYPE
    }
}

#[tokio::test]
async fn put_then_exists_and_get() {
    let store = memory_store();
    let data = b"<h1>hello</h1>".to_vec();
    let hash = hash_content(&data);

    assert!(!store.exists(&hash).await.unwrap());
    store
        .put_asset(&hash, data.clone(), "text/html; charset=utf-8")
        .await
        .unwrap();
    assert!(store.exists(&hash).await.unwrap());

    let asset = store.get_asset(&hash).await.unwrap().expect("asset stored");
    assert_eq!(asset.data.as_ref(), data.as_slice());
    assert_eq!(asset.content_type, expected_type(&store, "text/html; charset=utf-8"));
}

#[tokio::test]
async fn repeated_put_is_idempotent() {
    let store = memory_store();
    let data = b"same bytes".to_vec();
    let hash = hash_content(&data);

    store.put_asset(&hash, data.clone(), "text/plain").await.unwrap();
    let first = store.get_asset(&hash).await.unwrap().unwrap();
    store.put_asset(&hash, data.clone(), "text/plain").await.unwrap();
    let second = store.get_asset(&hash).await.unwrap().unwrap();

    assert_eq!(first.data, second.data);
    assert_eq!(first.content_type, second.content_type);
}

#[tokio::test]
async fn missing_asset_is_none() {
    let store = memory_store();
    let hash = hash_content(b"never written");
    assert!(store.get_asset(&hash).await.unwrap().is_none());
}

#[tokio::test]
async fn manifest_replace() {
    let store = memory_store();
    let project = ProjectId::parse("site").unwrap();

    assert!(store.get_manifest(&project).await.unwrap().is_none());
    store.put_manifest(&project, vec![0u8; 16]).await.unwrap();
    store.put_manifest(&project, vec![1u8; 64]).await.unwrap();
    assert_eq!(store.get_manifest(&project).await.unwrap(), Some(vec![1u8; 64]));
}

#[tokio::test]
async fn fs_backend_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let op = Operator::new(
        opendal::services::Fs::default().root(dir.path().to_str().unwrap()),
    )
    .unwrap()
    .finish();
    let store = AssetStore::new(op);
    let project = ProjectId::parse("docs").unwrap();

    let hash = hash_content(b"fs content");
    store
        .put_asset(&hash, b"fs content".to_vec(), "text/plain")
        .await
        .unwrap();
    assert!(store.exists(&hash).await.unwrap());
    let asset = store.get_asset(&hash).await.unwrap().unwrap();
    assert_eq!(asset.data.as_ref(), b"fs content");

    store
        .put_deployment_record(&project, br#"{"ok":true}"#.to_vec())
        .await
        .unwrap();
    assert!(store.get_deployment_record(&project).await.unwrap().is_some());
}
