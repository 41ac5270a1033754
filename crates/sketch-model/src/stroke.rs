//! Strokes: one continuous pen gesture plus its metadata.
//!
//! Strokes are append-only history. Geometry is never edited in place;
//! moving a stroke produces a new stroke whose `parentId` points back at
//! the source, and deleting only clears the `active` flag.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{polyline_length, Bounds, Point, Point2D};
use crate::snapshot::Transform;

/// Globally unique, content-independent stroke identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeId(String);

impl StrokeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh id: creation time plus a random hex suffix.
    pub fn generate(wall_ms: i64) -> Self {
        let suffix: u64 = rand::random::<u64>() & 0x000f_ffff_ffff_ffff;
        Self(format!("stroke-{wall_ms}-{suffix:013x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StrokeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StrokeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A recorded polyline with timing metrics and a visibility flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub id: StrokeId,
    pub points: Vec<Point>,
    /// Line width in pixels.
    pub size: f64,
    /// CSS-style hex color.
    pub color: String,
    /// Wall-clock ms at pen-down.
    pub start_time: i64,
    /// Wall-clock ms at pen-up.
    pub end_time: i64,
    /// `end_time - start_time`; zero for synthetic strokes.
    pub duration: i64,
    /// Sum of segment lengths.
    pub length: f64,
    /// `length / max(1, duration)`; zero for synthetic strokes.
    pub speed: f64,
    pub active: bool,
    /// Monotonic ms of the first point.
    pub start_time_abs: f64,
    /// Monotonic ms of the last point.
    pub end_time_abs: f64,
    /// Source stroke when this one was produced by a move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<StrokeId>,
}

/// Reasons a point sequence cannot become a stroke.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrokeError {
    #[error("a stroke needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("point {index} goes back in time")]
    TimeReversed { index: usize },
}

/// Pen settings applied to a new stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct PenStyle {
    pub size: f64,
    pub color: String,
}

impl Default for PenStyle {
    fn default() -> Self {
        Self {
            size: 2.0,
            color: "#000000".to_string(),
        }
    }
}

impl Stroke {
    /// Build a freehand stroke from a completed pen gesture.
    ///
    /// `start_time`/`end_time` are wall-clock ms of pen-down and pen-up.
    pub fn freehand(
        id: StrokeId,
        points: Vec<Point>,
        pen: &PenStyle,
        start_time: i64,
        end_time: i64,
    ) -> Result<Self, StrokeError> {
        validate_points(&points)?;
        let duration = end_time - start_time;
        let length = polyline_length(points.iter().map(Point::position));
        let speed = length / (duration.max(1) as f64);
        let start_time_abs = points[0].t_abs;
        let end_time_abs = points[points.len() - 1].t_abs;

        Ok(Self {
            id,
            points,
            size: pen.size,
            color: pen.color.clone(),
            start_time,
            end_time,
            duration,
            length,
            speed,
            active: true,
            start_time_abs,
            end_time_abs,
            parent_id: None,
        })
    }

    /// Materialize a moved copy of `source` displaced by `offset`.
    ///
    /// Every point shares the instant `now_abs`, so the copy has zero
    /// measured duration and speed.
    pub fn moved_from(
        source: &Stroke,
        id: StrokeId,
        offset: Transform,
        now_wall: i64,
        now_abs: f64,
    ) -> Result<Self, StrokeError> {
        let points: Vec<Point> = source
            .points
            .iter()
            .map(|p| Point::new(p.x + offset.dx, p.y + offset.dy, now_abs))
            .collect();
        validate_points(&points)?;
        let length = polyline_length(points.iter().map(Point::position));

        Ok(Self {
            id,
            points,
            size: source.size,
            color: source.color.clone(),
            start_time: now_wall,
            end_time: now_wall,
            duration: 0,
            length,
            speed: 0.0,
            active: true,
            start_time_abs: now_abs,
            end_time_abs: now_abs,
            parent_id: Some(source.id.clone()),
        })
    }

    /// Build a local stroke from foreign geometry.
    ///
    /// Metrics report a zero-length gesture, but each point's `tAbs` is
    /// staggered by `step_ms` from `abs_base` so the stroke still has
    /// vertical extent on the compacted timeline.
    pub fn imported(
        id: StrokeId,
        positions: &[Point2D],
        pen: &PenStyle,
        now_wall: i64,
        abs_base: f64,
        step_ms: f64,
    ) -> Result<Self, StrokeError> {
        let points: Vec<Point> = positions
            .iter()
            .enumerate()
            .map(|(idx, p)| Point::new(p.x, p.y, abs_base + idx as f64 * step_ms))
            .collect();
        validate_points(&points)?;
        let length = polyline_length(positions.iter().copied());
        let start_time_abs = points[0].t_abs;
        let end_time_abs = points[points.len() - 1].t_abs;

        Ok(Self {
            id,
            points,
            size: pen.size,
            color: pen.color.clone(),
            start_time: now_wall,
            end_time: now_wall,
            duration: 0,
            length,
            speed: 0.0,
            active: true,
            start_time_abs,
            end_time_abs,
            parent_id: None,
        })
    }

    /// Planar positions of every point.
    pub fn positions(&self) -> impl Iterator<Item = Point2D> + '_ {
        self.points.iter().map(Point::position)
    }

    /// Planar positions displaced by a transform.
    pub fn transformed_positions(
        &self,
        transform: Transform,
    ) -> impl Iterator<Item = Point2D> + '_ {
        self.points
            .iter()
            .map(move |p| Point2D::new(p.x + transform.dx, p.y + transform.dy))
    }

    /// Untransformed world-space bounds.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::enclosing(self.positions())
    }
}

fn validate_points(points: &[Point]) -> Result<(), StrokeError> {
    if points.len() < 2 {
        return Err(StrokeError::TooFewPoints(points.len()));
    }
    for (index, pair) in points.windows(2).enumerate() {
        if pair[1].t_abs < pair[0].t_abs {
            return Err(StrokeError::TimeReversed { index: index + 1 });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y, t)| Point::new(x, y, t)).collect()
    }

    #[test]
    fn test_freehand_metrics() {
        let stroke = Stroke::freehand(
            StrokeId::new("a"),
            pts(&[(0.0, 0.0, 100.0), (3.0, 4.0, 105.0), (6.0, 8.0, 150.0)]),
            &PenStyle::default(),
            1_000,
            1_050,
        )
        .unwrap();
        assert_eq!(stroke.duration, 50);
        assert!((stroke.length - 10.0).abs() < 1e-9);
        assert!((stroke.speed - 0.2).abs() < 1e-9);
        assert_eq!(stroke.start_time_abs, 100.0);
        assert_eq!(stroke.end_time_abs, 150.0);
        assert!(stroke.active);
        assert!(stroke.parent_id.is_none());
        assert_eq!(
            stroke.bounds(),
            Some(Bounds {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 6.0,
                max_y: 8.0,
            })
        );
    }

    #[test]
    fn test_freehand_zero_duration_speed_uses_floor() {
        let stroke = Stroke::freehand(
            StrokeId::new("a"),
            pts(&[(0.0, 0.0, 0.0), (0.0, 2.0, 0.0)]),
            &PenStyle::default(),
            7,
            7,
        )
        .unwrap();
        assert_eq!(stroke.duration, 0);
        assert!((stroke.speed - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_single_point() {
        let err = Stroke::freehand(
            StrokeId::new("a"),
            pts(&[(0.0, 0.0, 0.0)]),
            &PenStyle::default(),
            0,
            0,
        )
        .unwrap_err();
        assert_eq!(err, StrokeError::TooFewPoints(1));
    }

    #[test]
    fn test_rejects_time_reversal() {
        let err = Stroke::freehand(
            StrokeId::new("a"),
            pts(&[(0.0, 0.0, 10.0), (1.0, 0.0, 9.0)]),
            &PenStyle::default(),
            0,
            0,
        )
        .unwrap_err();
        assert_eq!(err, StrokeError::TimeReversed { index: 1 });
    }

    #[test]
    fn test_moved_from_links_parent_and_zeroes_timing() {
        let source = Stroke::freehand(
            StrokeId::new("src"),
            pts(&[(0.0, 0.0, 1.0), (10.0, 0.0, 9.0)]),
            &PenStyle {
                size: 4.0,
                color: "#ff0000".into(),
            },
            0,
            8,
        )
        .unwrap();
        let moved = Stroke::moved_from(
            &source,
            StrokeId::new("dst"),
            Transform::new(5.0, -2.0),
            2_000,
            500.0,
        )
        .unwrap();
        assert_eq!(moved.parent_id, Some(StrokeId::new("src")));
        assert_eq!(moved.points[0].position(), Point2D::new(5.0, -2.0));
        assert_eq!(moved.points[1].position(), Point2D::new(15.0, -2.0));
        assert!(moved.points.iter().all(|p| p.t_abs == 500.0));
        assert_eq!(moved.duration, 0);
        assert_eq!(moved.speed, 0.0);
        assert_eq!(moved.size, 4.0);
        assert_eq!(moved.color, "#ff0000");
        assert_eq!(source.points[0].position(), Point2D::new(0.0, 0.0));
    }

    #[test]
    fn test_imported_staggers_time() {
        let stroke = Stroke::imported(
            StrokeId::new("imp"),
            &[
                Point2D::new(0.0, 0.0),
                Point2D::new(1.0, 0.0),
                Point2D::new(2.0, 0.0),
            ],
            &PenStyle::default(),
            99,
            1_000.0,
            1.0,
        )
        .unwrap();
        assert_eq!(stroke.start_time_abs, 1_000.0);
        assert_eq!(stroke.end_time_abs, 1_002.0);
        assert_eq!(stroke.duration, 0);
        assert_eq!(stroke.speed, 0.0);
        assert!(stroke.parent_id.is_none());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = StrokeId::generate(1_700_000_000_000);
        let b = StrokeId::generate(1_700_000_000_000);
        assert!(a.as_str().starts_with("stroke-1700000000000-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_json_field_names() {
        let stroke = Stroke::freehand(
            StrokeId::new("a"),
            pts(&[(0.0, 0.0, 1.5), (1.0, 1.0, 2.5)]),
            &PenStyle::default(),
            10,
            11,
        )
        .unwrap();
        let json = serde_json::to_string(&stroke).unwrap();
        assert!(json.contains("\"tAbs\":1.5"));
        assert!(json.contains("\"startTimeAbs\":1.5"));
        assert!(json.contains("\"endTime\":11"));
        assert!(!json.contains("parentId"));
    }
}
