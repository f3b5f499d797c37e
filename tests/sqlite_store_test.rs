use serde_json::json;
use splitledger::domain::{Relation, UserId};
use splitledger::store::{fetch_typed, init_store, put_typed, DocumentStore, SqliteStore};
use tempfile::TempDir;

async fn setup_store() -> (SqliteStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_store(&db_path).await.expect("init_store failed");
    (SqliteStore::new(pool), temp_dir)
}

#[tokio::test]
async fn test_put_and_fetch_roundtrip() {
    let (store, _temp) = setup_store().await;

    let version = store
        .put("relations", "alice:bob", json!({"x": 1}), None)
        .await
        .unwrap();
    assert_eq!(version, 1);

    let doc = store.fetch("relations", "alice:bob").await.unwrap().unwrap();
    assert_eq!(doc.body, json!({"x": 1}));
    assert_eq!(doc.version, 1);
}

#[tokio::test]
async fn test_fetch_missing_returns_none() {
    let (store, _temp) = setup_store().await;
    assert!(store.fetch("relations", "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_cas_rejects_stale_version() {
    let (store, _temp) = setup_store().await;

    store
        .put("relations", "alice:bob", json!({"v": 1}), None)
        .await
        .unwrap();
    let version = store
        .put("relations", "alice:bob", json!({"v": 2}), Some(1))
        .await
        .unwrap();
    assert_eq!(version, 2);

    let err = store
        .put("relations", "alice:bob", json!({"v": 3}), Some(1))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // Create-only put against an existing document conflicts too.
    let err = store
        .put("relations", "alice:bob", json!({}), None)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_list_by_prefix_ordered() {
    let (store, _temp) = setup_store().await;

    for id in ["alice:carol", "alice:bob", "bob:alice"] {
        store.put("relations", id, json!({}), None).await.unwrap();
    }

    let listed = store.list("relations", "alice:").await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["alice:bob", "alice:carol"]);
}

#[tokio::test]
async fn test_typed_relation_roundtrip() {
    let (store, _temp) = setup_store().await;

    let relation = Relation::new(UserId::new("alice"), UserId::new("bob"));
    let version = put_typed(&store, "relations", "alice:bob", &relation, None)
        .await
        .unwrap();
    assert_eq!(version, 1);

    let (fetched, fetched_version) =
        fetch_typed::<Relation>(&store, "relations", "alice:bob")
            .await
            .unwrap()
            .unwrap();
    assert_eq!(fetched, relation);
    assert_eq!(fetched_version, 1);
}
