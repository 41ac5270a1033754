//! The Overlay Merge Engine.
//!
//! A foreign document is staged, a subset of its snapshots is picked, and
//! the union of their strokes is shown translucently over the canvas. Apply
//! grafts those strokes into the local store under fresh ids and re-creates
//! the picked snapshots against the new ids. Nothing local is modified
//! besides appending.

use std::collections::{BTreeMap, BTreeSet};

use chronosketch_common::clock::Clock;
use chronosketch_model::{
    DocumentError, ForeignDocument, ForeignStroke, PenStyle, Snapshot, SnapshotId, Stroke,
    StrokeId, TransformMap,
};

/// The staged foreign document and the current pick.
#[derive(Debug, Clone, Default)]
pub struct OverlaySession {
    document: Option<ForeignDocument>,
    selected: BTreeSet<SnapshotId>,
    staged: Vec<ForeignStroke>,
    /// Imported snapshot ids handed out so far; survives `cancel`.
    imported_snapshots: usize,
}

/// What an apply adds to the local document.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayImport {
    /// New local strokes, in foreign document order.
    pub strokes: Vec<Stroke>,
    /// New local snapshots, each carrying `originalSnapshotId`.
    pub snapshots: Vec<Snapshot>,
    /// Foreign snapshots dropped because none of their ids survived.
    pub skipped: Vec<SnapshotId>,
    /// Foreign id to new local id.
    pub id_map: BTreeMap<StrokeId, StrokeId>,
}

impl OverlaySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a foreign document is staged.
    pub fn is_active(&self) -> bool {
        self.document.is_some()
    }

    pub fn document(&self) -> Option<&ForeignDocument> {
        self.document.as_ref()
    }

    pub fn selected(&self) -> &BTreeSet<SnapshotId> {
        &self.selected
    }

    /// Strokes currently shown as the overlay. Display only.
    pub fn staged(&self) -> &[ForeignStroke] {
        &self.staged
    }

    /// Parse and stage a foreign document, picking its newest snapshot.
    ///
    /// On error the previous overlay state is kept as is.
    pub fn load(&mut self, text: &str) -> Result<&ForeignDocument, DocumentError> {
        let document = ForeignDocument::parse(text)?;
        self.selected = document
            .default_snapshot()
            .map(|s| s.id.clone())
            .into_iter()
            .collect();
        tracing::info!(
            strokes = document.strokes.len(),
            snapshots = document.snapshots.len(),
            "Staged overlay document"
        );
        let document = self.document.insert(document);
        self.staged = stage(document, &self.selected);
        Ok(document)
    }

    /// Add a foreign snapshot to the pick. False for unknown ids.
    pub fn select(&mut self, id: &SnapshotId) -> bool {
        let Some(document) = &self.document else {
            return false;
        };
        if document.snapshot(id).is_none() {
            return false;
        }
        self.selected.insert(id.clone());
        self.staged = stage(document, &self.selected);
        true
    }

    pub fn deselect(&mut self, id: &SnapshotId) -> bool {
        let removed = self.selected.remove(id);
        if let Some(document) = &self.document {
            self.staged = stage(document, &self.selected);
        }
        removed
    }

    /// Flip one snapshot in or out of the pick. Returns whether it is now picked.
    pub fn toggle(&mut self, id: &SnapshotId) -> bool {
        if self.selected.contains(id) {
            self.deselect(id);
            false
        } else {
            self.select(id)
        }
    }

    /// Build the local strokes and snapshots an apply would add.
    ///
    /// `None` when nothing is staged. Every point of a new stroke shares the
    /// wall-clock instant, while `tAbs` steps by `step_ms` per point.
    /// Snapshot id counters keep counting across plans, so two applies in
    /// the same millisecond still get distinct ids.
    pub fn plan_apply(&mut self, clock: &dyn Clock, step_ms: f64) -> Option<OverlayImport> {
        let document = self.document.as_ref()?;
        if self.selected.is_empty() || self.staged.is_empty() {
            return None;
        }
        let now_wall = clock.wall_ms();
        let abs_base = clock.monotonic_ms();

        let mut strokes = Vec::new();
        let mut id_map = BTreeMap::new();
        for foreign in &self.staged {
            if foreign.points.len() < 2 {
                continue;
            }
            let pen = PenStyle {
                size: foreign.size,
                color: foreign.color.clone(),
            };
            let mut id = StrokeId::generate(now_wall);
            while id_map.values().any(|taken| taken == &id) {
                id = StrokeId::generate(now_wall);
            }
            match Stroke::imported(id.clone(), &foreign.points, &pen, now_wall, abs_base, step_ms) {
                Ok(stroke) => {
                    id_map.insert(foreign.id.clone(), id);
                    strokes.push(stroke);
                }
                Err(e) => tracing::warn!(stroke = %foreign.id, error = %e, "Skipping foreign stroke"),
            }
        }

        let mut snapshots = Vec::new();
        let mut skipped = Vec::new();
        for source in document.snapshots.iter().filter(|s| self.selected.contains(&s.id)) {
            let active_ids: BTreeSet<StrokeId> = source
                .ids
                .iter()
                .filter_map(|old| id_map.get(old).cloned())
                .collect();
            if active_ids.is_empty() {
                tracing::warn!(snapshot = %source.id, "No strokes survived remapping, skipping snapshot");
                skipped.push(source.id.clone());
                continue;
            }
            let id = SnapshotId::imported(now_wall, self.imported_snapshots);
            self.imported_snapshots += 1;
            snapshots.push(Snapshot {
                id,
                timestamp: source.timestamp.unwrap_or_else(|| clock.now_utc()),
                active_ids,
                preview: source.preview.clone(),
                transforms: TransformMap::new(),
                original_snapshot_id: Some(source.id.clone()),
            });
        }

        Some(OverlayImport {
            strokes,
            snapshots,
            skipped,
            id_map,
        })
    }

    /// Drop the staged document and pick.
    pub fn cancel(&mut self) {
        self.document = None;
        self.selected.clear();
        self.staged.clear();
    }
}

/// Union of strokes referenced by the picked snapshots, in document order.
fn stage(document: &ForeignDocument, selected: &BTreeSet<SnapshotId>) -> Vec<ForeignStroke> {
    let wanted: BTreeSet<StrokeId> = document
        .snapshots
        .iter()
        .filter(|s| selected.contains(&s.id))
        .flat_map(|s| document.referenced_ids(s))
        .collect();
    document
        .strokes
        .iter()
        .filter(|s| wanted.contains(&s.id))
        .cloned()
        .collect()
}
