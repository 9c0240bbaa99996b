//! Import tests against an in-memory store.

use csv_types::{CodecError, PropertyNameUnion, RecordEncoder};
use datastore_sync_csv_source::{import, resolve_inputs, ImportConfig};
use entity_store::{MemoryStore, Session};
use std::path::{Path, PathBuf};
use sync_core::{FieldValue, Key, Record, Schema, SchemaError};
use tempfile::TempDir;

const SCHEMA: &str = r#"
kinds:
  - name: Order
    fields:
      - name: title
        type: text
      - name: qty
        type: int32
  - name: Customer
    fields:
      - name: name
        type: text
"#;

fn schema() -> Schema {
    Schema::from_yaml(SCHEMA).unwrap()
}

/// Write records of one kind the way the exporter does.
fn write_kind_file(dir: &Path, name: &str, records: &[Record]) -> PathBuf {
    let encoder = RecordEncoder::new();
    let mut union = PropertyNameUnion::new();
    for record in records {
        encoder.accumulate_field_names(record, &mut union);
    }

    let mut content = encoder.encode_header(&union);
    content.push('\n');
    for record in records {
        content.push_str(&encoder.encode_row(record, &union));
        content.push('\n');
    }

    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn orders(range: std::ops::RangeInclusive<i64>) -> Vec<Record> {
    range
        .map(|i| {
            Record::builder(Key::id("Order", i))
                .field("title", FieldValue::text(format!("order, #{i}")))
                .field("qty", FieldValue::Int32(i as i32))
                .build()
        })
        .collect()
}

fn customers(range: std::ops::RangeInclusive<i64>) -> Vec<Record> {
    range
        .map(|i| {
            Record::builder(Key::id("Customer", i))
                .field("name", FieldValue::text(format!("customer {i}")))
                .build()
        })
        .collect()
}

#[tokio::test]
async fn test_batches_span_files() {
    let temp_dir = TempDir::new().unwrap();
    write_kind_file(temp_dir.path(), "Order-01.csv", &orders(1..=7));
    write_kind_file(temp_dir.path(), "Customer-01.csv", &customers(1..=5));

    let store = MemoryStore::new();
    let session = Session::open(&store).await.unwrap();
    let config = ImportConfig {
        files: resolve_inputs(&[temp_dir.path().to_path_buf()]).unwrap(),
        batch_size: 5,
        dry_run: false,
    };

    let summary = import(&session, &schema(), &config).await.unwrap();
    session.close();

    // 12 records, batch size 5: ceil(12 / 5) = 3 puts
    assert_eq!(store.put_sizes().await, vec![5, 5, 2]);
    assert_eq!(summary.records_read, 12);
    assert_eq!(summary.batches_written, 3);
    assert_eq!(summary.records_written, 12);
    assert_eq!(summary.files_loaded.len(), 2);

    let imported = store.records("Order").await;
    assert_eq!(imported, orders(1..=7));
    assert_eq!(store.records("Customer").await, customers(1..=5));
}

#[tokio::test]
async fn test_exact_multiple_has_no_empty_batch() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_kind_file(temp_dir.path(), "Order-01.csv", &orders(1..=6));

    let store = MemoryStore::new();
    let session = Session::open(&store).await.unwrap();
    let config = ImportConfig {
        files: vec![path],
        batch_size: 3,
        dry_run: false,
    };
    import(&session, &schema(), &config).await.unwrap();

    assert_eq!(store.put_sizes().await, vec![3, 3]);
}

#[tokio::test]
async fn test_unknown_kind_file_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let widgets = vec![Record::builder(Key::id("Widget", 1))
        .field("size", FieldValue::Int64(3))
        .build()];
    let skipped = write_kind_file(temp_dir.path(), "Widget-01.csv", &widgets);
    let loaded = write_kind_file(temp_dir.path(), "Order-01.csv", &orders(1..=2));

    let store = MemoryStore::new();
    let session = Session::open(&store).await.unwrap();
    let config = ImportConfig {
        files: vec![skipped.clone(), loaded.clone()],
        ..Default::default()
    };

    let summary = import(&session, &schema(), &config).await.unwrap();
    assert_eq!(summary.skipped_files, vec![skipped]);
    assert_eq!(summary.files_loaded, vec![loaded]);
    assert_eq!(store.records("Order").await.len(), 2);
    assert!(store.records("Widget").await.is_empty());
}

#[tokio::test]
async fn test_row_shape_mismatch_aborts_with_location() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_kind_file(temp_dir.path(), "Order-01.csv", &orders(1..=2));
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("onlyonecolumn\n");
    std::fs::write(&path, content).unwrap();

    let store = MemoryStore::new();
    let session = Session::open(&store).await.unwrap();
    let config = ImportConfig {
        files: vec![path],
        ..Default::default()
    };

    let err = import(&session, &schema(), &config).await.unwrap_err();
    assert!(format!("{err:#}").contains("Order-01.csv:4"));
    assert!(matches!(
        err.downcast_ref::<CodecError>(),
        Some(CodecError::RowShapeMismatch { .. })
    ));
    assert!(store.put_sizes().await.is_empty());
}

#[tokio::test]
async fn test_unknown_column_aborts() {
    let temp_dir = TempDir::new().unwrap();
    let records = vec![Record::builder(Key::id("Customer", 1))
        .field("email", FieldValue::text("a@example.com"))
        .build()];
    let path = write_kind_file(temp_dir.path(), "Customer-01.csv", &records);

    let store = MemoryStore::new();
    let session = Session::open(&store).await.unwrap();
    let config = ImportConfig {
        files: vec![path],
        ..Default::default()
    };

    let err = import(&session, &schema(), &config).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CodecError>(),
        Some(CodecError::Schema(SchemaError::UnknownField { .. }))
    ));
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_kind_file(temp_dir.path(), "Order-01.csv", &orders(1..=3));

    let store = MemoryStore::new();
    let session = Session::open(&store).await.unwrap();
    let config = ImportConfig {
        files: vec![path],
        batch_size: 2,
        dry_run: true,
    };

    let summary = import(&session, &schema(), &config).await.unwrap();
    assert_eq!(summary.records_read, 3);
    assert_eq!(summary.batches_written, 0);
    assert!(store.put_sizes().await.is_empty());
}
