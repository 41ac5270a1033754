//! Persisted record schema and the one-shot migration from legacy shapes.
//!
//! The document store holds two kinds of records keyed by `id`:
//! - the singleton `paths` record with every stroke
//! - one record per snapshot, keyed `snapshot-*`
//!
//! Older documents omit per-point `tAbs`, name the active set
//! `activeIndexes`, or leave metrics out entirely. Everything read from a
//! store or an interchange file goes through [`RawStroke::migrate`] and
//! [`RawSnapshot::migrate`] exactly once, so the rest of the system only
//! ever sees fully populated [`Stroke`] and [`Snapshot`] values.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::{polyline_length, Point, Point2D};
use crate::snapshot::{is_snapshot_key, Snapshot, SnapshotId, TransformMap};
use crate::stroke::{Stroke, StrokeId};

/// Key of the singleton record holding all strokes.
pub const PATHS_RECORD_ID: &str = "paths";

/// Current record schema version. Records without the field are version 1.
pub const SCHEMA_VERSION: u32 = 2;

const DEFAULT_SIZE: f64 = 2.0;
const DEFAULT_COLOR: &str = "#000000";

/// Inputs the migration needs from the running session.
#[derive(Debug, Clone, Copy)]
pub struct MigrationContext {
    /// Monotonic "now", used as the base for synthesized `tAbs`.
    pub now_abs: f64,
}

/// Errors decoding a stored record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record has no string id")]
    MissingId,

    #[error("record {id} is not a paths or snapshot record")]
    UnknownKind { id: String },

    #[error("record {id} is malformed: {source}")]
    Malformed {
        id: String,
        source: serde_json::Error,
    },
}

/// A point as found on disk; `tAbs` may be absent in legacy data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPoint {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "tAbs", default)]
    pub t_abs: Option<f64>,
}

/// A stroke as found on disk or in an interchange file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStroke {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub points: Vec<RawPoint>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub start_time_abs: Option<f64>,
    #[serde(default)]
    pub end_time_abs: Option<f64>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl RawStroke {
    /// Planar positions, ignoring any timing.
    pub fn positions(&self) -> Vec<Point2D> {
        self.points.iter().map(|p| Point2D::new(p.x, p.y)).collect()
    }

    /// Promote to a fully populated stroke.
    ///
    /// Returns `None` when fewer than 2 points survive. `index` seeds an id
    /// for records that never had one.
    pub fn migrate(self, index: usize, ctx: MigrationContext) -> Option<Stroke> {
        let n = self.points.len();
        if n < 2 {
            tracing::warn!(index, points = n, "Dropping stroke with fewer than 2 points");
            return None;
        }

        let legacy_timing = self.points.iter().any(|p| p.t_abs.is_none());
        let points: Vec<Point> = if legacy_timing {
            let dur = self.duration.unwrap_or(1.0).max(1.0);
            self.points
                .iter()
                .enumerate()
                .map(|(i, p)| Point::new(p.x, p.y, ctx.now_abs + dur * i as f64 / (n - 1) as f64))
                .collect()
        } else {
            // Clamp to a running maximum so time never goes backwards.
            let mut last = f64::NEG_INFINITY;
            self.points
                .iter()
                .map(|p| {
                    let t = p.t_abs.unwrap_or(last).max(last);
                    last = t;
                    Point::new(p.x, p.y, t)
                })
                .collect()
        };

        let first_t = points[0].t_abs;
        let last_t = points[n - 1].t_abs;
        let (start_time_abs, end_time_abs) = if legacy_timing {
            (first_t, last_t)
        } else {
            let start = self.start_time_abs.unwrap_or(first_t);
            let end = self.end_time_abs.unwrap_or(last_t).max(start);
            (start, end)
        };

        let start_time = self
            .start_time
            .or(self.start_time_abs)
            .unwrap_or(first_t)
            .round() as i64;
        let end_time = match self.end_time {
            Some(end) => end.round() as i64,
            None => start_time + self.duration.unwrap_or(0.0).round() as i64,
        };
        let duration = self
            .duration
            .map(|d| d.round() as i64)
            .unwrap_or(end_time - start_time);
        let length = self
            .length
            .unwrap_or_else(|| polyline_length(points.iter().map(Point::position)));
        let speed = self
            .speed
            .unwrap_or_else(|| length / (duration.max(1) as f64));

        Some(Stroke {
            id: StrokeId::new(
                self.id
                    .unwrap_or_else(|| format!("stroke-legacy-{index}")),
            ),
            points,
            size: self.size.unwrap_or(DEFAULT_SIZE),
            color: self.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            start_time,
            end_time,
            duration,
            length,
            speed,
            active: self.active.unwrap_or(true),
            start_time_abs,
            end_time_abs,
            parent_id: self.parent_id.map(StrokeId::new),
        })
    }
}

/// Migrate a list of raw strokes, dropping the unusable ones.
pub fn migrate_strokes(raw: Vec<RawStroke>, ctx: MigrationContext) -> Vec<Stroke> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(i, s)| s.migrate(i, ctx))
        .collect()
}

/// A stroke reference inside a snapshot's active list.
///
/// Very old exports stored numeric positions; those are kept as their
/// decimal string so they simply fail to match any stroke id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawStrokeRef {
    Id(String),
    Index(u64),
}

impl RawStrokeRef {
    fn into_id(self) -> StrokeId {
        match self {
            RawStrokeRef::Id(id) => StrokeId::new(id),
            RawStrokeRef::Index(i) => StrokeId::new(i.to_string()),
        }
    }
}

/// A snapshot as found on disk or in an interchange file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
    #[serde(default)]
    pub active_ids: Option<Vec<RawStrokeRef>>,
    #[serde(default)]
    pub active_indexes: Option<Vec<RawStrokeRef>>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub transforms: Option<TransformMap>,
    #[serde(default)]
    pub original_snapshot_id: Option<String>,
    #[serde(default)]
    pub schema_version: Option<u32>,
}

impl RawSnapshot {
    /// The timestamp, if it parses as RFC 3339 or epoch milliseconds.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.timestamp.as_ref()?)
    }

    /// Active stroke ids: `activeIds`, else legacy `activeIndexes`, else empty.
    pub fn stroke_ids(&self) -> Vec<StrokeId> {
        self.active_ids
            .clone()
            .or_else(|| self.active_indexes.clone())
            .unwrap_or_default()
            .into_iter()
            .map(RawStrokeRef::into_id)
            .collect()
    }

    /// Promote to a local snapshot. Unparsable timestamps become the epoch.
    pub fn migrate(self, fallback_id: &str) -> Snapshot {
        let timestamp = self.parsed_timestamp().unwrap_or_default();
        let active_ids: BTreeSet<StrokeId> = self.stroke_ids().into_iter().collect();
        Snapshot {
            id: SnapshotId::new(self.id.unwrap_or_else(|| fallback_id.to_string())),
            timestamp,
            active_ids,
            preview: self.preview,
            transforms: self.transforms.unwrap_or_default(),
            original_snapshot_id: self
                .original_snapshot_id
                .filter(|s| !s.is_empty())
                .map(SnapshotId::new),
        }
    }
}

/// Parse a JSON timestamp: RFC 3339 string or epoch milliseconds.
pub fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_f64()
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64)),
        _ => None,
    }
}

/// The singleton record holding every stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsRecord {
    pub id: String,
    pub paths: Vec<Stroke>,
    pub schema_version: u32,
}

impl PathsRecord {
    pub fn new(paths: Vec<Stroke>) -> Self {
        Self {
            id: PATHS_RECORD_ID.to_string(),
            paths,
            schema_version: SCHEMA_VERSION,
        }
    }
}

#[derive(Deserialize)]
struct RawPathsRecord {
    #[serde(default)]
    paths: Vec<RawStroke>,
}

/// A decoded store record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Paths(Vec<Stroke>),
    Snapshot(Snapshot),
}

impl Record {
    pub fn id(&self) -> &str {
        match self {
            Record::Paths(_) => PATHS_RECORD_ID,
            Record::Snapshot(s) => s.id.as_str(),
        }
    }

    /// Encode at the current schema version.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Record::Paths(paths) => serde_json::to_value(PathsRecord::new(paths.clone())),
            Record::Snapshot(snapshot) => {
                let mut value = serde_json::to_value(snapshot)?;
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("schemaVersion".to_string(), SCHEMA_VERSION.into());
                }
                Ok(value)
            }
        }
    }

    /// Decode and migrate a stored JSON record.
    pub fn decode(value: serde_json::Value, ctx: MigrationContext) -> Result<Record, RecordError> {
        let id = value
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or(RecordError::MissingId)?;

        if id == PATHS_RECORD_ID {
            let raw: RawPathsRecord = serde_json::from_value(value)
                .map_err(|source| RecordError::Malformed { id, source })?;
            Ok(Record::Paths(migrate_strokes(raw.paths, ctx)))
        } else if is_snapshot_key(&id) {
            let raw: RawSnapshot = serde_json::from_value(value)
                .map_err(|source| RecordError::Malformed { id: id.clone(), source })?;
            Ok(Record::Snapshot(raw.migrate(&id)))
        } else {
            Err(RecordError::UnknownKind { id })
        }
    }
}
