//! Snapshots: named captures of which strokes were visible, and where.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stroke::StrokeId;

/// Key prefix shared by every snapshot record.
pub const SNAPSHOT_PREFIX: &str = "snapshot-";

/// Snapshot identifier (`snapshot-<ms>` or `snapshot-import-<ms>-<n>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id for a snapshot saved at `wall_ms`.
    pub fn at(wall_ms: i64) -> Self {
        Self(format!("{SNAPSHOT_PREFIX}{wall_ms}"))
    }

    /// Id for the `counter`-th snapshot derived from an overlay import.
    pub fn imported(wall_ms: i64, counter: usize) -> Self {
        Self(format!("{SNAPSHOT_PREFIX}import-{wall_ms}-{counter}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SnapshotId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Whether a store key names a snapshot record.
pub fn is_snapshot_key(id: &str) -> bool {
    id.starts_with(SNAPSHOT_PREFIX)
}

/// A visual offset applied to a stroke within one snapshot context.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub dx: f64,
    #[serde(default)]
    pub dy: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { dx: 0.0, dy: 0.0 };

    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Compose with a further displacement.
    pub fn plus(self, delta: Transform) -> Transform {
        Transform::new(self.dx + delta.dx, self.dy + delta.dy)
    }

    pub fn is_identity(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// Transforms keyed by stroke id.
pub type TransformMap = BTreeMap<StrokeId, Transform>;

/// A timestamped capture of an active set plus layout transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: SnapshotId,
    pub timestamp: DateTime<Utc>,
    pub active_ids: BTreeSet<StrokeId>,
    /// Rendered raster as a `data:image/png;base64,` URL.
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub transforms: TransformMap,
    /// Provenance: the foreign snapshot this one was imported from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_snapshot_id: Option<SnapshotId>,
}

impl Snapshot {
    pub fn is_imported(&self) -> bool {
        self.original_snapshot_id.is_some()
    }

    /// Whether any of `ids` is in this snapshot's active set.
    pub fn contains_any<'a, I>(&self, ids: I) -> bool
    where
        I: IntoIterator<Item = &'a StrokeId>,
    {
        ids.into_iter().any(|id| self.active_ids.contains(id))
    }
}

/// Order snapshots oldest → newest; equal timestamps fall back to id order.
pub fn chronological(a: &Snapshot, b: &Snapshot) -> std::cmp::Ordering {
    a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id))
}

/// The newest snapshot; ties resolve to the greatest id.
pub fn latest(snapshots: &[Snapshot]) -> Option<&Snapshot> {
    snapshots.iter().max_by(|a, b| chronological(a, b))
}
