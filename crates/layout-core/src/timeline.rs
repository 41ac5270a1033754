//! Time-compaction layout for the timeline strip.
//!
//! Strokes are stacked top to bottom in draw order. Each stroke gets a
//! vertical band proportional to its own drawing time (at least 1 ms), and
//! idle gaps between strokes are removed entirely, so the strip always
//! spans its full height however sparse the absolute timestamps are.

use std::collections::HashMap;

use chronosketch_model::{Bounds, Point2D, Stroke, StrokeId};
use serde::Serialize;

use crate::selection::Selection;

/// Pixel size of the timeline strip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineViewport {
    pub width: f64,
    pub height: f64,
}

impl TimelineViewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// One stroke as placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutItem {
    /// Position of the stroke in the store.
    pub index: usize,
    pub id: StrokeId,
    pub active: bool,
    /// Compacted-time offset of the stroke's first point (ms).
    pub offset: f64,
    /// Compacted duration, floored at 1 ms.
    pub duration: f64,
    /// Points mapped into timeline pixels.
    pub points: Vec<Point2D>,
    pub bbox: Bounds,
}

impl LayoutItem {
    /// Mapped point at index `len / 2`.
    pub fn midpoint(&self) -> Option<Point2D> {
        self.points.get(self.points.len() / 2).copied()
    }
}

/// The laid-out timeline for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineLayout {
    pub viewport: TimelineViewport,
    /// Sum of every stroke's compacted duration, floored at 1 ms.
    pub total_duration: f64,
    /// Items in store order.
    pub items: Vec<LayoutItem>,
}

impl TimelineLayout {
    pub fn item(&self, index: usize) -> Option<&LayoutItem> {
        self.items.iter().find(|item| item.index == index)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Y coordinate of each horizontal grid line (`divisions + 1` lines).
    pub fn grid_lines(&self, divisions: u32) -> Vec<f64> {
        let divisions = divisions.max(1);
        (0..=divisions)
            .map(|k| k as f64 / divisions as f64 * self.viewport.height)
            .collect()
    }
}

/// Draw-order key: wall-clock start.
pub fn order_key(stroke: &Stroke) -> f64 {
    stroke.start_time as f64
}

/// Monotonic instant the stroke's band starts at.
pub fn effective_start(stroke: &Stroke) -> f64 {
    stroke.start_time_abs
}

/// Monotonic instant the stroke's band ends at.
pub fn effective_end(stroke: &Stroke) -> f64 {
    stroke.end_time_abs
}

/// Compacted duration of one stroke.
pub fn compacted_duration(stroke: &Stroke) -> f64 {
    (effective_end(stroke) - effective_start(stroke)).max(1.0)
}

/// Compute the compacted layout.
///
/// `canvas_width` is the world width mapped onto the strip's width.
pub fn compute_layout(
    strokes: &[Stroke],
    canvas_width: f64,
    viewport: TimelineViewport,
) -> TimelineLayout {
    let mut order: Vec<usize> = (0..strokes.len()).collect();
    // Stable: equal keys keep store order.
    order.sort_by(|&a, &b| order_key(&strokes[a]).total_cmp(&order_key(&strokes[b])));

    let mut offsets = vec![0.0; strokes.len()];
    let mut cum = 0.0;
    for &i in &order {
        offsets[i] = cum;
        cum += compacted_duration(&strokes[i]);
    }
    let total_duration = f64::max(1.0, cum);

    let scale_x = viewport.width / canvas_width.max(1.0);
    let items = strokes
        .iter()
        .enumerate()
        .filter(|(_, s)| s.points.len() >= 2)
        .filter_map(|(index, stroke)| {
            let s0 = effective_start(stroke);
            let points: Vec<Point2D> = stroke
                .points
                .iter()
                .map(|p| {
                    let local = (p.t_abs - s0).max(0.0);
                    Point2D::new(
                        p.x * scale_x,
                        (offsets[index] + local) / total_duration * viewport.height,
                    )
                })
                .collect();
            let bbox = Bounds::enclosing(points.iter().copied())?;
            Some(LayoutItem {
                index,
                id: stroke.id.clone(),
                active: stroke.active,
                offset: offsets[index],
                duration: compacted_duration(stroke),
                points,
                bbox,
            })
        })
        .collect();

    TimelineLayout {
        viewport,
        total_duration,
        items,
    }
}

/// A parent/child connector between two laid-out strokes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineageLink {
    pub parent_index: usize,
    pub child_index: usize,
    pub from: Point2D,
    pub to: Point2D,
}

/// Connectors from each moved stroke back to its source.
///
/// Only links touching the selection are produced.
pub fn lineage_links(
    layout: &TimelineLayout,
    strokes: &[Stroke],
    selection: &Selection,
) -> Vec<LineageLink> {
    let by_id: HashMap<&StrokeId, &LayoutItem> =
        layout.items.iter().map(|item| (&item.id, item)).collect();

    layout
        .items
        .iter()
        .filter_map(|child| {
            let parent_id = strokes.get(child.index)?.parent_id.as_ref()?;
            let parent = by_id.get(parent_id)?;
            if !selection.contains(child.index) && !selection.contains(parent.index) {
                return None;
            }
            Some(LineageLink {
                parent_index: parent.index,
                child_index: child.index,
                from: parent.midpoint()?,
                to: child.midpoint()?,
            })
        })
        .collect()
}
