//! Full document export and import against a document store.

use chronosketch_common::error::{SketchError, SketchResult};
use chronosketch_model::{
    parse_export_document, DocumentError, ExportDocument, ImportedDocument, MigrationContext,
    OperationLog, Record,
};

use crate::persistence::{load_paths, load_snapshots, put_record, DocumentStore};

/// Map a document parse failure onto the shared taxonomy.
pub fn document_error(err: DocumentError) -> SketchError {
    let message = err.to_string();
    match err {
        DocumentError::Json(e) => SketchError::Json(e),
        DocumentError::UnknownFormat | DocumentError::NotAnObject => {
            SketchError::unknown_format(message)
        }
        DocumentError::Field { .. } => SketchError::malformed_import(message),
    }
}

/// Gather the `paths` record and every snapshot into an export document.
pub async fn export_document(
    db: &dyn DocumentStore,
    operation_counts: Option<OperationLog>,
    ctx: MigrationContext,
) -> SketchResult<ExportDocument> {
    let paths = load_paths(db, ctx).await?;
    let snapshots = load_snapshots(db, ctx).await?;
    tracing::info!(
        strokes = paths.len(),
        snapshots = snapshots.len(),
        "Exporting document"
    );
    Ok(ExportDocument::new(paths, &snapshots, operation_counts))
}

/// Replace the store's contents with an export document.
///
/// The text is parsed and migrated in full before the store is touched, so
/// a rejected document leaves the store as it was.
pub async fn import_document(
    db: &dyn DocumentStore,
    text: &str,
    ctx: MigrationContext,
) -> SketchResult<ImportedDocument> {
    let document = parse_export_document(text, ctx).map_err(document_error)?;

    db.clear().await?;
    put_record(db, &Record::Paths(document.paths.clone())).await?;
    for snapshot in &document.snapshots {
        put_record(db, &Record::Snapshot(snapshot.clone())).await?;
    }
    tracing::info!(
        strokes = document.paths.len(),
        snapshots = document.snapshots.len(),
        "Imported document"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use serde_json::json;

    const CTX: MigrationContext = MigrationContext { now_abs: 0.0 };

    #[tokio::test]
    async fn test_rejected_import_leaves_store_alone() {
        let db = MemoryStore::new();
        db.put(json!({"id": "paths", "paths": []})).await.unwrap();

        let err = import_document(&db, "{\"type\": \"other\"}", CTX).await.unwrap_err();
        assert!(err.is_rejected_input());
        let err = import_document(&db, "[1, 2", CTX).await.unwrap_err();
        assert!(err.is_rejected_input());
        assert_eq!(db.len().await, 1);
    }

    #[tokio::test]
    async fn test_import_then_export() {
        let db = MemoryStore::new();
        db.put(json!({"id": "stale", "x": 1})).await.unwrap();
        let text = json!({
            "paths": [{
                "id": "stroke-1",
                "points": [{"x": 0, "y": 0, "tAbs": 1.0}, {"x": 4, "y": 3, "tAbs": 6.0}],
                "startTime": 100, "endTime": 105
            }],
            "snapshots": [{
                "id": "snapshot-100",
                "timestamp": "2024-05-01T12:00:00Z",
                "activeIndexes": ["stroke-1"]
            }]
        })
        .to_string();

        let imported = import_document(&db, &text, CTX).await.unwrap();
        assert_eq!(imported.paths.len(), 1);
        assert!(db.get("stale").await.unwrap().is_none());

        let exported = export_document(&db, None, CTX).await.unwrap();
        assert_eq!(exported.paths, imported.paths);
        assert_eq!(exported.snapshots.len(), 1);
        assert_eq!(exported.snapshots[0].active_indexes[0].as_str(), "stroke-1");
        let value = serde_json::to_value(&exported).unwrap();
        assert!(value.get("operationCounts").is_none());
    }
}
