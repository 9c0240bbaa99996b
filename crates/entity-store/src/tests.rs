//! Unit tests for the entity-store crate.

use sync_core::{FieldValue, Key, Record};
use tempfile::TempDir;

use crate::{Cursor, DirectoryStore, EntityStore, MemoryStore, Session};

fn record(kind: &str, id: i64, title: &str) -> Record {
    Record::builder(Key::id(kind, id))
        .field("title", FieldValue::text(title))
        .build()
}

/// Page through a kind the way the export pump does.
async fn collect_pages<S: EntityStore>(store: &S, kind: &str, limit: usize) -> Vec<Vec<i64>> {
    let mut pages = Vec::new();
    let mut cursor: Option<Cursor> = None;
    loop {
        let page = store.query_page(kind, cursor.as_ref(), limit).await.unwrap();
        if page.is_empty() {
            break;
        }
        pages.push(
            page.records
                .iter()
                .map(|r| match r.key.id {
                    sync_core::KeyId::Id(id) => id,
                    _ => panic!("unexpected key"),
                })
                .collect(),
        );
        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    pages
}

// ============================================================================
// Cursor Tests
// ============================================================================

#[test]
fn test_cursor_offset() {
    let cursor = Cursor::from_offset(40);
    assert_eq!(cursor.as_str(), "40");
    assert_eq!(cursor.to_offset().unwrap(), 40);
    assert!(Cursor::new("abc").to_offset().is_err());
}

// ============================================================================
// MemoryStore Tests
// ============================================================================

#[tokio::test]
async fn test_memory_store_paging() {
    let store = MemoryStore::with_records((1..=5).map(|i| record("Order", i, "x")));

    assert_eq!(
        collect_pages(&store, "Order", 2).await,
        vec![vec![1, 2], vec![3, 4], vec![5]]
    );
    assert!(collect_pages(&store, "Missing", 2).await.is_empty());
    assert_eq!(store.list_kinds().await.unwrap(), vec!["Order"]);
}

#[tokio::test]
async fn test_memory_store_put_upserts_by_key() {
    let store = MemoryStore::new();
    store
        .put(&[record("Order", 1, "first"), record("Order", 2, "b")])
        .await
        .unwrap();
    store.put(&[record("Order", 1, "second")]).await.unwrap();

    let records = store.records("Order").await;
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].get_field("title"),
        Some(&FieldValue::text("second"))
    );
    assert_eq!(store.put_sizes().await, vec![2, 1]);
}

// ============================================================================
// DirectoryStore Tests
// ============================================================================

#[tokio::test]
async fn test_directory_store_persists_records() {
    let temp_dir = TempDir::new().unwrap();
    let store = DirectoryStore::new(temp_dir.path());
    let session = Session::open(&store).await.unwrap();

    session
        .put(&[
            record("Order", 1, "a"),
            record("Order", 2, "b"),
            record("Customer", 9, "c"),
        ])
        .await
        .unwrap();
    session.put(&[record("Order", 1, "updated")]).await.unwrap();

    assert_eq!(
        session.list_kinds().await.unwrap(),
        vec!["Customer", "Order"]
    );
    assert_eq!(
        collect_pages(&*session, "Order", 10).await,
        vec![vec![1, 2]]
    );

    let page = session.query_page("Order", None, 1).await.unwrap();
    assert_eq!(
        page.records[0].get_field("title"),
        Some(&FieldValue::text("updated"))
    );
    session.close();

    // Reopened store sees the same data
    let reopened = DirectoryStore::new(temp_dir.path());
    let session = Session::open(&reopened).await.unwrap();
    assert_eq!(
        collect_pages(&*session, "Order", 1).await,
        vec![vec![1], vec![2]]
    );
}

#[tokio::test]
async fn test_directory_store_lock_is_exclusive() {
    let temp_dir = TempDir::new().unwrap();
    let first = DirectoryStore::new(temp_dir.path());
    let second = DirectoryStore::new(temp_dir.path());

    let session = Session::open(&first).await.unwrap();
    let err = Session::open(&second).await.err().unwrap();
    assert!(err.to_string().contains("in use"));

    session.close();
    assert!(!temp_dir.path().join(".lock").exists());
    assert!(Session::open(&second).await.is_ok());
}

#[tokio::test]
async fn test_directory_store_rejects_corrupt_line() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("Order.jsonl"), "{not json}\n").unwrap();

    let store = DirectoryStore::new(temp_dir.path());
    let err = store.query_page("Order", None, 10).await.unwrap_err();
    assert!(format!("{err:#}").contains("Order.jsonl:1"));
}

#[tokio::test]
async fn test_directory_store_rejects_non_finite_floats() {
    let temp_dir = TempDir::new().unwrap();
    let store = DirectoryStore::new(temp_dir.path());
    store.put(&[record("Measure", 1, "ok")]).await.unwrap();

    let nan = Record::builder(Key::id("Measure", 2))
        .field("value", FieldValue::Float64(f64::NAN))
        .build();
    let err = store.put(&[nan]).await.unwrap_err();
    assert!(err.to_string().contains("non-finite"));

    let inf_element = Record::builder(Key::id("Measure", 3))
        .field(
            "samples",
            FieldValue::Collection(vec![
                FieldValue::Float64(1.5),
                FieldValue::Float64(f64::INFINITY),
            ]),
        )
        .build();
    assert!(store.put(&[inf_element]).await.is_err());

    // The kind file is still readable and untouched
    assert_eq!(collect_pages(&store, "Measure", 10).await, vec![vec![1]]);

    let finite = Record::builder(Key::id("Measure", 4))
        .field("value", FieldValue::Float64(-0.25))
        .build();
    store.put(&[finite.clone()]).await.unwrap();
    let page = store.query_page("Measure", None, 10).await.unwrap();
    assert_eq!(page.records[1], finite);
}

#[tokio::test]
async fn test_directory_store_rejects_path_like_kinds() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("store");
    let store = DirectoryStore::new(&root);
    std::fs::create_dir_all(&root).unwrap();

    for kind in ["../Escape", "a/b", "a\\b", ".hidden", ""] {
        let err = store.put(&[record(kind, 1, "x")]).await.unwrap_err();
        assert!(err.to_string().contains("cannot be stored"), "{kind}");
        assert!(store.query_page(kind, None, 1).await.is_err());
    }

    assert!(!temp_dir.path().join("Escape.jsonl").exists());
    assert!(std::fs::read_dir(&root).unwrap().next().is_none());
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test]
async fn test_session_close_releases_once() {
    let store = MemoryStore::new();
    let session = Session::open(&store).await.unwrap();
    assert_eq!(store.open_count(), 1);
    assert_eq!(store.release_count(), 0);

    session.close();
    assert_eq!(store.release_count(), 1);
}

#[tokio::test]
async fn test_session_released_on_error_path() {
    async fn failing_run(store: &MemoryStore) -> anyhow::Result<()> {
        let session = Session::open(store).await?;
        session.list_kinds().await?;
        anyhow::bail!("simulated failure");
    }

    let store = MemoryStore::new();
    assert!(failing_run(&store).await.is_err());
    assert_eq!(store.open_count(), 1);
    assert_eq!(store.release_count(), 1);
}
