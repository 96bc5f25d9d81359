mod helpers;

use std::sync::Arc;

use bytes::Bytes;
use tempfile::tempdir;

use clipvault_storage::{ListPage, LocalStore, ObjectStore, StorageClient, StorageError};
use helpers::ScriptedStore;

fn page(keys: &[&str], next_marker: Option<&str>) -> ListPage {
    ListPage {
        keys: keys.iter().map(|k| k.to_string()).collect(),
        next_marker: next_marker.map(str::to_string),
    }
}

#[tokio::test]
async fn listing_spans_two_pages_in_store_order() {
    let store = Arc::new(ScriptedStore::new().with_pages(vec![
        page(&["a.mp4"], Some("p1")),
        page(&["b.mp4"], None),
    ]));
    let client = StorageClient::new(store);

    let keys = client.list_all_keys("bucket").await.unwrap();
    assert_eq!(keys, vec!["a.mp4", "b.mp4"]);
}

#[tokio::test]
async fn listing_concatenates_many_pages_without_loss() {
    let pages = vec![
        page(&["k0", "k1"], Some("m0")),
        page(&["k2", "k3"], Some("m1")),
        page(&["k4"], Some("m2")),
        page(&[], Some("m3")),
        page(&["k5", "k6", "k7"], None),
    ];
    let store = Arc::new(ScriptedStore::new().with_pages(pages));
    let client = StorageClient::new(store);

    let keys = client.list_all_keys("bucket").await.unwrap();
    assert_eq!(keys, vec!["k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7"]);
}

#[tokio::test]
async fn empty_bucket_is_not_an_error() {
    let store = Arc::new(ScriptedStore::new().with_pages(vec![page(&[], None)]));
    let client = StorageClient::new(store);

    let keys = client.list_all_keys("bucket").await.unwrap();
    assert!(keys.is_empty());
}

#[tokio::test]
async fn failing_page_discards_partial_results() {
    let store = Arc::new(
        ScriptedStore::new()
            .with_pages(vec![
                page(&["a.mp4"], Some("p1")),
                page(&["b.mp4"], Some("p2")),
                page(&["c.mp4"], None),
            ])
            .fail_page_at(1),
    );
    let client = StorageClient::new(Arc::clone(&store) as Arc<dyn ObjectStore>);

    let result = client.list_all_keys("bucket").await;
    assert!(matches!(result, Err(StorageError::StoreUnavailable(_))));
    // The failed call was the second page; nothing after it was requested.
    assert_eq!(store.calls(), vec!["list-0", "list-1"]);
}

#[tokio::test]
async fn empty_bucket_name_rejected_before_any_request() {
    let store = Arc::new(ScriptedStore::new());
    let client = StorageClient::new(Arc::clone(&store) as Arc<dyn ObjectStore>);

    let result = client.list_all_keys("").await;
    assert!(matches!(result, Err(StorageError::InvalidInput(_))));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn local_backend_pagination_is_transparent() {
    let dir = tempdir().unwrap();
    let store = LocalStore::new(dir.path()).await.unwrap().with_page_size(1);

    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        store
            .put_object("clips", name, "video/mp4", Bytes::from_static(b"x"))
            .await
            .unwrap();
    }

    let client = StorageClient::new(Arc::new(store));
    let keys = client.list_all_keys("clips").await.unwrap();
    assert_eq!(keys, vec!["a.mp4", "b.mp4", "c.mp4"]);
}
