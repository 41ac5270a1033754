//! Lasso hit-testing in world space and in compacted timeline space.
//!
//! Both testers share one contract: a stroke is hit when any of its points
//! lies inside the rectangle, edges included. The result always replaces
//! the previous selection.

use std::collections::BTreeSet;

use chronosketch_model::{Bounds, Point2D, Snapshot, SnapshotId, Stroke, StrokeId, Transform};

use crate::timeline::TimelineLayout;

/// Transient set of selected stroke indices. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: BTreeSet<usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        Self {
            indices: indices.into_iter().collect(),
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    /// Replace the whole selection.
    pub fn replace<I: IntoIterator<Item = usize>>(&mut self, indices: I) {
        self.indices = indices.into_iter().collect();
    }

    /// Drop indices at or beyond `len`.
    pub fn prune(&mut self, len: usize) {
        self.indices.retain(|&i| i < len);
    }

    /// Ids of the selected strokes that still exist.
    pub fn ids(&self, strokes: &[Stroke]) -> Vec<StrokeId> {
        self.iter()
            .filter_map(|i| strokes.get(i).map(|s| s.id.clone()))
            .collect()
    }
}

/// Lasso over world space.
///
/// Inactive strokes are skipped unless `reveal_inactive` is set. Points are
/// tested in their displayed position, i.e. with the stroke's transform.
pub fn select_in_world<F>(
    strokes: &[Stroke],
    p1: Point2D,
    p2: Point2D,
    reveal_inactive: bool,
    transform_of: F,
) -> Selection
where
    F: Fn(&StrokeId) -> Transform,
{
    let rect = Bounds::from_corners(p1, p2);
    let hits = strokes.iter().enumerate().filter_map(|(i, stroke)| {
        if !stroke.active && !reveal_inactive {
            return None;
        }
        let transform = transform_of(&stroke.id);
        stroke
            .transformed_positions(transform)
            .any(|p| rect.contains(p))
            .then_some(i)
    });
    let selection = Selection::from_indices(hits);
    tracing::debug!(count = selection.len(), "World lasso");
    selection
}

/// Lasso over the compacted timeline.
///
/// Bounding boxes reject most items before the per-point test. With
/// `include_inactive` unset, inactive items still qualify while `alt` is held.
pub fn select_in_timeline(
    layout: &TimelineLayout,
    p1: Point2D,
    p2: Point2D,
    include_inactive: bool,
    alt: bool,
) -> Selection {
    let rect = Bounds::from_corners(p1, p2);
    let hits = layout.items.iter().filter_map(|item| {
        if !item.active && !include_inactive && !alt {
            return None;
        }
        if !item.bbox.overlaps(&rect) {
            return None;
        }
        item.points
            .iter()
            .any(|p| rect.contains(*p))
            .then_some(item.index)
    });
    let selection = Selection::from_indices(hits);
    tracing::debug!(count = selection.len(), "Timeline lasso");
    selection
}

/// Snapshots whose active set contains at least one selected stroke.
pub fn snapshots_containing(
    snapshots: &[Snapshot],
    strokes: &[Stroke],
    selection: &Selection,
) -> Vec<SnapshotId> {
    let ids = selection.ids(strokes);
    if ids.is_empty() {
        return Vec::new();
    }
    snapshots
        .iter()
        .filter(|snap| snap.contains_any(&ids))
        .map(|snap| snap.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{compute_layout, TimelineViewport};
    use chronosketch_model::{PenStyle, Point, TransformMap};

    fn line(id: &str, pts: &[(f64, f64)], t0: f64) -> Stroke {
        let points = pts
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Point::new(x, y, t0 + i as f64 * 10.0))
            .collect();
        Stroke::freehand(StrokeId::new(id), points, &PenStyle::default(), t0 as i64, t0 as i64 + 10)
            .unwrap()
    }

    fn no_transform(_: &StrokeId) -> Transform {
        Transform::IDENTITY
    }

    #[test]
    fn test_world_lasso_edge_is_inclusive() {
        let strokes = vec![line("a", &[(10.0, 10.0), (50.0, 50.0)], 0.0)];
        let sel = select_in_world(
            &strokes,
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 10.0),
            false,
            no_transform,
        );
        assert!(sel.contains(0));
    }

    #[test]
    fn test_world_lasso_skips_inactive_unless_revealed() {
        let mut strokes = vec![line("a", &[(5.0, 5.0), (6.0, 6.0)], 0.0)];
        strokes[0].active = false;
        let (a, b) = (Point2D::new(0.0, 0.0), Point2D::new(20.0, 20.0));
        assert!(select_in_world(&strokes, a, b, false, no_transform).is_empty());
        assert!(select_in_world(&strokes, a, b, true, no_transform).contains(0));
    }

    #[test]
    fn test_world_lasso_uses_transformed_position() {
        let strokes = vec![line("a", &[(0.0, 0.0), (1.0, 1.0)], 0.0)];
        let mut transforms = TransformMap::new();
        transforms.insert(StrokeId::new("a"), Transform::new(100.0, 100.0));
        let lookup = |id: &StrokeId| transforms.get(id).copied().unwrap_or_default();
        let sel = select_in_world(
            &strokes,
            Point2D::new(90.0, 90.0),
            Point2D::new(110.0, 110.0),
            false,
            lookup,
        );
        assert!(sel.contains(0));
    }

    #[test]
    fn test_corners_in_any_order() {
        let strokes = vec![line("a", &[(5.0, 5.0), (6.0, 6.0)], 0.0)];
        let sel = select_in_world(
            &strokes,
            Point2D::new(20.0, 0.0),
            Point2D::new(0.0, 20.0),
            false,
            no_transform,
        );
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_timeline_lasso_includes_inactive_by_default() {
        let mut strokes = vec![
            line("a", &[(0.0, 0.0), (100.0, 0.0)], 0.0),
            line("b", &[(0.0, 0.0), (100.0, 0.0)], 100.0),
        ];
        strokes[0].active = false;
        let layout = compute_layout(&strokes, 100.0, TimelineViewport::new(100.0, 100.0));
        let all = Point2D::new(100.0, 100.0);

        let sel = select_in_timeline(&layout, Point2D::new(0.0, 0.0), all, true, false);
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec![0, 1]);

        let sel = select_in_timeline(&layout, Point2D::new(0.0, 0.0), all, false, false);
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec![1]);

        let sel = select_in_timeline(&layout, Point2D::new(0.0, 0.0), all, false, true);
        assert_eq!(sel.len(), 2);
    }

    #[test]
    fn test_timeline_lasso_bands() {
        let strokes = vec![
            line("a", &[(0.0, 0.0), (100.0, 0.0)], 0.0),
            line("b", &[(0.0, 0.0), (100.0, 0.0)], 100.0),
        ];
        let layout = compute_layout(&strokes, 100.0, TimelineViewport::new(100.0, 100.0));
        // Stroke b occupies the lower half of the strip.
        let sel = select_in_timeline(
            &layout,
            Point2D::new(0.0, 60.0),
            Point2D::new(100.0, 100.0),
            true,
            false,
        );
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_prune_and_replace() {
        let mut sel = Selection::from_indices([0, 3, 5]);
        sel.prune(4);
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec![0, 3]);
        sel.replace([9]);
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec![9]);
    }

    #[test]
    fn test_snapshots_containing() {
        let strokes = vec![
            line("a", &[(0.0, 0.0), (1.0, 1.0)], 0.0),
            line("b", &[(0.0, 0.0), (1.0, 1.0)], 10.0),
        ];
        let mk = |id: &str, ids: &[&str]| Snapshot {
            id: SnapshotId::new(id),
            timestamp: Default::default(),
            active_ids: ids.iter().map(|s| StrokeId::new(*s)).collect(),
            preview: None,
            transforms: TransformMap::new(),
            original_snapshot_id: None,
        };
        let snaps = vec![mk("snapshot-1", &["a"]), mk("snapshot-2", &["b"]), mk("snapshot-3", &[])];
        let hits = snapshots_containing(&snaps, &strokes, &Selection::from_indices([1]));
        assert_eq!(hits, vec![SnapshotId::new("snapshot-2")]);
        assert!(snapshots_containing(&snaps, &strokes, &Selection::new()).is_empty());
    }
}
