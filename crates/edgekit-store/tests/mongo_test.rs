use edgekit_core::MongoConfig;
use edgekit_store::{doc, MongoStore, StoreError};
use serde::Serialize;

/// A config pointing at a local port nothing listens on.
fn unreachable_config() -> MongoConfig {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    MongoConfig {
        uri: format!("mongodb://127.0.0.1:{}", port),
        database: "edgekit_test".to_string(),
        collection: "readings".to_string(),
        write_timeout_secs: 1,
        query_timeout_secs: 1,
        ..MongoConfig::default()
    }
}

#[tokio::test]
async fn test_connect_is_lazy() {
    let config = MongoConfig {
        write_timeout_secs: 5,
        ..unreachable_config()
    };
    let store = MongoStore::connect(&config).await.unwrap();
    assert_eq!(store.collection_name(), "readings");
    store.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_invalid_uri_is_a_driver_error() {
    let config = MongoConfig {
        uri: "redis://localhost:6379".to_string(),
        ..MongoConfig::default()
    };
    let err = MongoStore::connect(&config).await.err().unwrap();
    assert!(matches!(err, StoreError::Mongo(_)), "{err:?}");
}

#[tokio::test]
async fn test_writes_time_out_without_server() {
    let store = MongoStore::connect(&unreachable_config()).await.unwrap();

    let err = store
        .insert_one(doc! { "sensor": "inlet", "value": 21.5 })
        .await
        .unwrap_err();
    assert!(
        matches!(err, StoreError::Timeout { operation: "insert_one", .. }),
        "{err:?}"
    );

    let err = store
        .delete_one(doc! { "sensor": "inlet" })
        .await
        .unwrap_err();
    assert!(
        matches!(err, StoreError::Timeout { operation: "delete_one", .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_queries_time_out_without_server() {
    let store = MongoStore::connect(&unreachable_config()).await.unwrap();

    let err = store.find_all(doc! {}).await.unwrap_err();
    assert!(
        matches!(err, StoreError::Timeout { operation: "find", .. }),
        "{err:?}"
    );

    let err = store
        .update_one(doc! { "sensor": "inlet" }, doc! { "$set": { "value": 22.0 } })
        .await
        .unwrap_err();
    assert!(
        matches!(err, StoreError::Timeout { operation: "update_one", .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_non_document_values_are_rejected() {
    #[derive(Serialize)]
    struct Reading {
        sensor: &'static str,
        value: f64,
    }

    let store = MongoStore::connect(&unreachable_config()).await.unwrap();

    let err = store.insert(&42i32).await.unwrap_err();
    assert!(matches!(err, StoreError::Bson(_)), "{err:?}");

    // A struct serializes fine and only fails on the missing server.
    let err = store
        .insert(&Reading {
            sensor: "inlet",
            value: 21.5,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Timeout { .. }), "{err:?}");
}
