//! The immediate-mode drawing contract the scenes are written against.

use chronosketch_model::Point2D;

/// Straight RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `#rgb`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        let channel = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
            3 => {
                let expand = |v: u8| v * 17;
                Some(Self::rgb(
                    expand(channel(0, 1)?),
                    expand(channel(1, 1)?),
                    expand(channel(2, 1)?),
                ))
            }
            _ => None,
        }
    }

    /// Parse a hex color, falling back to `fallback` on garbage.
    pub fn parse_or(s: &str, fallback: Color) -> Self {
        Self::parse_hex(s).unwrap_or(fallback)
    }
}

/// On/off lengths of a dashed line, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashPattern {
    pub on: f64,
    pub off: f64,
}

impl DashPattern {
    /// Selected strokes.
    pub const SELECTION: DashPattern = DashPattern { on: 6.0, off: 4.0 };
    /// Lasso rectangle.
    pub const LASSO: DashPattern = DashPattern { on: 5.0, off: 3.0 };
    /// Lineage connectors.
    pub const LINEAGE: DashPattern = DashPattern { on: 3.0, off: 3.0 };

    pub fn period(&self) -> f64 {
        self.on + self.off
    }

    /// Whether distance `d` along the path falls on a drawn dash.
    pub fn is_on(&self, d: f64) -> bool {
        let period = self.period();
        if period <= 0.0 {
            return true;
        }
        d.rem_euclid(period) < self.on
    }
}

/// How a path is stroked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    /// Line width in pixels. Caps and joins are round.
    pub width: f64,
    /// Opacity in `[0, 1]`.
    pub alpha: f32,
    pub dash: Option<DashPattern>,
}

impl StrokeStyle {
    pub fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            alpha: 1.0,
            dash: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn with_dash(mut self, dash: DashPattern) -> Self {
        self.dash = Some(dash);
        self
    }
}

/// A 2D immediate-mode drawing surface.
pub trait Surface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Fill the whole surface with an opaque color.
    fn clear(&mut self, background: Color);

    /// Discard the current path.
    fn begin_path(&mut self);

    /// Start a new subpath.
    fn move_to(&mut self, p: Point2D);

    /// Extend the current subpath.
    fn line_to(&mut self, p: Point2D);

    /// Paint the current path.
    fn stroke(&mut self, style: &StrokeStyle);
}

/// Stroke one polyline as its own path. Fewer than 2 points draws nothing.
pub fn stroke_polyline<S, I>(surface: &mut S, points: I, style: &StrokeStyle)
where
    S: Surface + ?Sized,
    I: IntoIterator<Item = Point2D>,
{
    let mut iter = points.into_iter();
    let Some(first) = iter.next() else {
        return;
    };
    surface.begin_path();
    surface.move_to(first);
    let mut segments = 0;
    for p in iter {
        surface.line_to(p);
        segments += 1;
    }
    if segments > 0 {
        surface.stroke(style);
    }
}

/// Outline an axis-aligned rectangle.
pub fn stroke_rect<S: Surface + ?Sized>(surface: &mut S, a: Point2D, b: Point2D, style: &StrokeStyle) {
    let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
    let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
    stroke_polyline(
        surface,
        [
            Point2D::new(x0, y0),
            Point2D::new(x1, y0),
            Point2D::new(x1, y1),
            Point2D::new(x0, y1),
            Point2D::new(x0, y0),
        ],
        style,
    );
}
