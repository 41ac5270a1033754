//! Geometry primitives: timed points, planar points, and axis-aligned bounds.
//!
//! World-space coordinates are canvas pixels with the origin at the
//! top-left of the unpanned canvas. Bounds are always inclusive.

use serde::{Deserialize, Serialize};

/// A sampled pen position with the monotonic instant it was recorded at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    /// Monotonic milliseconds (not calendar time).
    #[serde(rename = "tAbs")]
    pub t_abs: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, t_abs: f64) -> Self {
        Self { x, y, t_abs }
    }

    /// Planar position, dropping time.
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// A planar point (world, screen, or timeline space).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Component-wise offset.
    pub fn offset(&self, dx: f64, dy: f64) -> Point2D {
        Point2D::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned bounding box with inclusive edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Normalize two arbitrary corners into a box.
    pub fn from_corners(a: Point2D, b: Point2D) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// Smallest box containing every point. `None` for an empty input.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point2D>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::from_corners(first, first);
        for p in iter {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        Some(bounds)
    }

    /// Inclusive point-in-rect test.
    pub fn contains(&self, p: Point2D) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Inclusive overlap test (touching edges overlap).
    pub fn overlaps(&self, other: &Bounds) -> bool {
        !(self.max_x < other.min_x
            || self.min_x > other.max_x
            || self.max_y < other.min_y
            || self.min_y > other.max_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Sum of segment lengths along a polyline.
pub fn polyline_length<I>(points: I) -> f64
where
    I: IntoIterator<Item = Point2D>,
{
    let mut iter = points.into_iter();
    let Some(mut prev) = iter.next() else {
        return 0.0;
    };
    let mut total = 0.0;
    for p in iter {
        total += prev.distance_to(&p);
        prev = p;
    }
    total
}

/// Whether a drag from `a` to `b` is below `min_px` on both axes.
pub fn is_small_drag(a: Point2D, b: Point2D, min_px: f64) -> bool {
    (b.x - a.x).abs() < min_px && (b.y - a.y).abs() < min_px
}
