//! Interchange documents: the full export format and foreign overlay sources.
//!
//! Two shapes are accepted from outside:
//! - the native export `{paths: [...], snapshots: [...], operationCounts?}`
//! - the minimal share format `{type: "ChronoSnapshotV1", strokes, createdAt, preview}`
//!
//! The native export is also what [`ExportDocument`] produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;
use crate::oplog::OperationLog;
use crate::record::{migrate_strokes, parse_timestamp, MigrationContext, RawSnapshot, RawStroke};
use crate::snapshot::{Snapshot, SnapshotId, TransformMap};
use crate::stroke::{Stroke, StrokeId};

/// `type` tag of the minimal share format.
pub const MINIMAL_FORMAT_TAG: &str = "ChronoSnapshotV1";

/// Errors parsing an interchange document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("unsupported document format (expected paths/snapshots or {MINIMAL_FORMAT_TAG})")]
    UnknownFormat,

    #[error("field `{field}` is malformed: {source}")]
    Field {
        field: &'static str,
        source: serde_json::Error,
    },
}

/// One snapshot entry of an export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSnapshot {
    pub id: SnapshotId,
    pub timestamp: DateTime<Utc>,
    pub active_indexes: Vec<StrokeId>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default, skip_serializing_if = "TransformMap::is_empty")]
    pub transforms: TransformMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_snapshot_id: Option<SnapshotId>,
}

impl From<&Snapshot> for ExportedSnapshot {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            timestamp: snapshot.timestamp,
            active_indexes: snapshot.active_ids.iter().cloned().collect(),
            preview: snapshot.preview.clone(),
            transforms: snapshot.transforms.clone(),
            original_snapshot_id: snapshot.original_snapshot_id.clone(),
        }
    }
}

/// The full document export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub paths: Vec<Stroke>,
    pub snapshots: Vec<ExportedSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_counts: Option<OperationLog>,
}

impl ExportDocument {
    pub fn new(paths: Vec<Stroke>, snapshots: &[Snapshot], operation_counts: Option<OperationLog>) -> Self {
        Self {
            paths,
            snapshots: snapshots.iter().map(ExportedSnapshot::from).collect(),
            operation_counts,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// A fully parsed and migrated export document, ready to replace the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedDocument {
    pub paths: Vec<Stroke>,
    pub snapshots: Vec<Snapshot>,
    pub operation_counts: Option<OperationLog>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExportDocument {
    #[serde(default)]
    paths: Vec<RawStroke>,
    #[serde(default)]
    snapshots: Vec<RawSnapshot>,
    #[serde(default)]
    operation_counts: Option<OperationLog>,
}

/// Parse an export document. Nothing is returned unless all of it parses.
pub fn parse_export_document(
    text: &str,
    ctx: MigrationContext,
) -> Result<ImportedDocument, DocumentError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let obj = value.as_object().ok_or(DocumentError::NotAnObject)?;
    let has_array = |key: &str| obj.get(key).map_or(false, serde_json::Value::is_array);
    if !has_array("paths") && !has_array("snapshots") {
        return Err(DocumentError::UnknownFormat);
    }

    let raw: RawExportDocument = serde_json::from_value(value).map_err(|source| {
        DocumentError::Field {
            field: "paths/snapshots",
            source,
        }
    })?;

    let snapshots = raw
        .snapshots
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.migrate(&format!("snapshot-imported-{i}")))
        .collect();

    Ok(ImportedDocument {
        paths: migrate_strokes(raw.paths, ctx),
        snapshots,
        operation_counts: raw.operation_counts,
    })
}

/// A stroke from a foreign document. Only geometry and style survive.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignStroke {
    pub id: StrokeId,
    pub points: Vec<Point2D>,
    pub size: f64,
    pub color: String,
    pub active: bool,
}

/// A snapshot from a foreign document.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignSnapshot {
    pub id: SnapshotId,
    pub timestamp: Option<DateTime<Utc>>,
    /// Explicit active list. Empty means "every active foreign stroke".
    pub ids: Vec<StrokeId>,
    pub preview: Option<String>,
}

impl ForeignSnapshot {
    /// Timestamp used for ordering; missing sorts as the epoch.
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or_default()
    }
}

/// A parsed foreign document staged for overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignDocument {
    pub strokes: Vec<ForeignStroke>,
    pub snapshots: Vec<ForeignSnapshot>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MinimalDocument {
    #[serde(default)]
    strokes: Vec<MinimalStroke>,
    #[serde(default)]
    created_at: Option<serde_json::Value>,
    #[serde(default)]
    preview: Option<String>,
}

#[derive(Deserialize)]
struct MinimalStroke {
    #[serde(default)]
    points: Vec<Point2D>,
    #[serde(default)]
    size: Option<f64>,
    #[serde(default)]
    color: Option<String>,
}

impl ForeignDocument {
    /// Parse either the minimal share format or a native export.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, DocumentError> {
        let obj = value.as_object().ok_or(DocumentError::NotAnObject)?;
        let is_minimal = obj.get("type").and_then(serde_json::Value::as_str)
            == Some(MINIMAL_FORMAT_TAG)
            && obj.get("strokes").map_or(false, serde_json::Value::is_array);
        let is_native = obj.get("paths").map_or(false, serde_json::Value::is_array)
            && obj.get("snapshots").map_or(false, serde_json::Value::is_array);

        if is_minimal {
            let doc: MinimalDocument = serde_json::from_value(value)
                .map_err(|source| DocumentError::Field {
                    field: "strokes",
                    source,
                })?;
            Ok(Self::from_minimal(doc))
        } else if is_native {
            let raw: RawExportDocument = serde_json::from_value(value)
                .map_err(|source| DocumentError::Field {
                    field: "paths/snapshots",
                    source,
                })?;
            Ok(Self::from_native(raw))
        } else {
            Err(DocumentError::UnknownFormat)
        }
    }

    fn from_minimal(doc: MinimalDocument) -> Self {
        let strokes: Vec<ForeignStroke> = doc
            .strokes
            .into_iter()
            .enumerate()
            .map(|(idx, s)| ForeignStroke {
                id: StrokeId::new(format!("stroke-{idx}")),
                points: s.points,
                size: s.size.unwrap_or(2.0),
                color: s.color.unwrap_or_else(|| "#000000".to_string()),
                active: true,
            })
            .collect();
        let snapshot = ForeignSnapshot {
            id: SnapshotId::new("snapshot-1"),
            timestamp: doc.created_at.as_ref().and_then(parse_timestamp),
            ids: strokes.iter().map(|s| s.id.clone()).collect(),
            preview: doc.preview,
        };
        Self {
            strokes,
            snapshots: vec![snapshot],
        }
    }

    fn from_native(raw: RawExportDocument) -> Self {
        let strokes = raw
            .paths
            .into_iter()
            .enumerate()
            .map(|(idx, s)| ForeignStroke {
                id: StrokeId::new(s.id.clone().unwrap_or_else(|| format!("stroke-{idx}"))),
                points: s.positions(),
                size: s.size.unwrap_or(2.0),
                color: s.color.clone().unwrap_or_else(|| "#000000".to_string()),
                active: s.active.unwrap_or(true),
            })
            .collect();
        let snapshots = raw
            .snapshots
            .into_iter()
            .enumerate()
            .map(|(idx, s)| ForeignSnapshot {
                id: SnapshotId::new(s.id.clone().unwrap_or_else(|| format!("snapshot-{idx}"))),
                timestamp: s.parsed_timestamp(),
                ids: s.stroke_ids(),
                preview: s.preview.clone(),
            })
            .collect();
        Self { strokes, snapshots }
    }

    /// The default overlay pick: the newest snapshot, last one on ties.
    pub fn default_snapshot(&self) -> Option<&ForeignSnapshot> {
        self.snapshots
            .iter()
            .reduce(|a, b| if a.sort_key() > b.sort_key() { a } else { b })
    }

    pub fn stroke(&self, id: &StrokeId) -> Option<&ForeignStroke> {
        self.strokes.iter().find(|s| &s.id == id)
    }

    pub fn snapshot(&self, id: &SnapshotId) -> Option<&ForeignSnapshot> {
        self.snapshots.iter().find(|s| &s.id == id)
    }

    /// Ids a snapshot refers to, with the active-strokes fallback applied.
    pub fn referenced_ids(&self, snapshot: &ForeignSnapshot) -> Vec<StrokeId> {
        if snapshot.ids.is_empty() {
            self.strokes
                .iter()
                .filter(|s| s.active)
                .map(|s| s.id.clone())
                .collect()
        } else {
            snapshot.ids.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CTX: MigrationContext = MigrationContext { now_abs: 0.0 };

    #[test]
    fn test_minimal_format_synthesizes_one_snapshot() {
        let doc = ForeignDocument::from_value(json!({
            "type": "ChronoSnapshotV1",
            "createdAt": "2024-03-01T10:00:00Z",
            "strokes": [
                {"points": [{"x": 0, "y": 0}, {"x": 5, "y": 5}], "color": "#ff0000"},
                {"points": [{"x": 1, "y": 1}, {"x": 2, "y": 2}], "size": 4}
            ]
        }))
        .unwrap();
        assert_eq!(doc.strokes.len(), 2);
        assert_eq!(doc.strokes[0].id.as_str(), "stroke-0");
        assert_eq!(doc.strokes[1].size, 4.0);
        assert_eq!(doc.snapshots.len(), 1);
        let snap = &doc.snapshots[0];
        assert_eq!(snap.id.as_str(), "snapshot-1");
        assert_eq!(snap.ids.len(), 2);
        assert!(snap.timestamp.is_some());
    }

    #[test]
    fn test_native_format_requires_both_arrays() {
        let err = ForeignDocument::from_value(json!({"paths": []})).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownFormat));
        let err = ForeignDocument::from_value(json!({"type": "Other"})).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownFormat));
        let err = ForeignDocument::parse("[1,2]").unwrap_err();
        assert!(matches!(err, DocumentError::NotAnObject));
        assert!(ForeignDocument::parse("{oops").is_err());
    }

    #[test]
    fn test_default_snapshot_last_tie_wins() {
        let doc = ForeignDocument::from_value(json!({
            "paths": [],
            "snapshots": [
                {"id": "snapshot-a", "timestamp": "2024-01-01T00:00:00Z"},
                {"id": "snapshot-b", "timestamp": "2024-06-01T00:00:00Z"},
                {"id": "snapshot-c", "timestamp": "2024-06-01T00:00:00Z"},
                {"id": "snapshot-d"}
            ]
        }))
        .unwrap();
        assert_eq!(doc.default_snapshot().unwrap().id.as_str(), "snapshot-c");
    }

    #[test]
    fn test_referenced_ids_fallback_to_active() {
        let doc = ForeignDocument::from_value(json!({
            "paths": [
                {"id": "p1", "points": [{"x": 0, "y": 0}, {"x": 1, "y": 1}]},
                {"id": "p2", "points": [{"x": 0, "y": 0}, {"x": 1, "y": 1}], "active": false}
            ],
            "snapshots": [{"id": "snapshot-1"}, {"id": "snapshot-2", "activeIndexes": ["p2"]}]
        }))
        .unwrap();
        let first = doc.referenced_ids(&doc.snapshots[0]);
        assert_eq!(first, vec![StrokeId::new("p1")]);
        let second = doc.referenced_ids(&doc.snapshots[1]);
        assert_eq!(second, vec![StrokeId::new("p2")]);
    }

    #[test]
    fn test_parse_export_document_migrates() {
        let doc = parse_export_document(
            &json!({
                "paths": [{"id": "s1", "points": [{"x": 0, "y": 0}, {"x": 3, "y": 4}], "duration": 10}],
                "snapshots": [{"id": "snapshot-9", "timestamp": "2024-01-01T00:00:00Z", "activeIndexes": ["s1"]}],
                "operationCounts": {"penClicks": [1]}
            })
            .to_string(),
            CTX,
        )
        .unwrap();
        assert_eq!(doc.paths.len(), 1);
        assert_eq!(doc.paths[0].end_time_abs, 10.0);
        assert!(doc.snapshots[0].active_ids.contains(&StrokeId::new("s1")));
        assert!(doc.operation_counts.is_some());
    }

    #[test]
    fn test_parse_export_document_rejects_garbage() {
        assert!(matches!(
            parse_export_document("{\"hello\": 1}", CTX),
            Err(DocumentError::UnknownFormat)
        ));
        assert!(matches!(
            parse_export_document("not json", CTX),
            Err(DocumentError::Json(_))
        ));
        assert!(matches!(
            parse_export_document("{\"paths\": [{\"points\": 3}]}", CTX),
            Err(DocumentError::Field { .. })
        ));
    }

    #[test]
    fn test_export_shape() {
        let doc = ExportDocument::new(Vec::new(), &[], None);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value, json!({"paths": [], "snapshots": []}));
    }
}
