//! Scene drawing: the live canvas, the timeline strip, and snapshot previews.
//!
//! Screen position of a stroke point is `point + transform - view_offset`.

use chronosketch_common::config::AppConfig;
use chronosketch_common::error::SketchResult;
use chronosketch_layout::{lineage_links, Selection, TimelineLayout};
use chronosketch_model::{ForeignStroke, Point2D, Stroke, TransformMap};

use crate::raster::RasterSurface;
use crate::surface::{stroke_polyline, stroke_rect, Color, DashPattern, StrokeStyle, Surface};

const GRID_COLOR: Color = Color::rgb(0xcf, 0xcf, 0xcf);
const LASSO_COLOR: Color = Color::rgb(0, 0, 255);
const LASSO_ALPHA: f32 = 0.5;
const LINEAGE_COLOR: Color = Color::rgb(80, 80, 80);
const LINEAGE_ALPHA: f32 = 0.7;
const TIMELINE_LINE_WIDTH: f64 = 2.0;

/// Colors and opacities shared by every scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneStyle {
    pub background: Color,
    pub inactive_alpha: f32,
    pub timeline_inactive_alpha: f32,
    pub overlay_alpha: f32,
    pub grid_divisions: u32,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl SceneStyle {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            background: Color::parse_or(&config.canvas.background, Color::WHITE),
            inactive_alpha: config.display.inactive_alpha,
            timeline_inactive_alpha: config.display.timeline_inactive_alpha,
            overlay_alpha: config.display.overlay_alpha,
            grid_divisions: config.timeline.grid_divisions,
        }
    }
}

/// Everything the live canvas shows in one frame.
#[derive(Debug, Clone, Copy)]
pub struct CanvasScene<'a> {
    pub strokes: &'a [Stroke],
    pub transforms: &'a TransformMap,
    pub selection: &'a Selection,
    pub view_offset: Point2D,
    /// Alt held or the show-inactive toggle on.
    pub reveal_inactive: bool,
    /// In-progress lasso corners, world space.
    pub lasso: Option<(Point2D, Point2D)>,
    /// Staged overlay strokes, display only.
    pub overlay: &'a [ForeignStroke],
}

fn stroke_style(stroke: &Stroke) -> StrokeStyle {
    StrokeStyle::solid(Color::parse_or(&stroke.color, Color::BLACK), stroke.size)
}

fn screen_points<'a>(
    stroke: &'a Stroke,
    transforms: &'a TransformMap,
    view_offset: Point2D,
) -> impl Iterator<Item = Point2D> + 'a {
    let t = transforms.get(&stroke.id).copied().unwrap_or_default();
    stroke
        .transformed_positions(t)
        .map(move |p| p.offset(-view_offset.x, -view_offset.y))
}

/// Draw the live canvas.
///
/// Inactive strokes appear only when revealed or selected, always at the
/// inactive opacity. Selected strokes are dashed.
pub fn draw_canvas<S: Surface + ?Sized>(
    surface: &mut S,
    scene: &CanvasScene<'_>,
    style: &SceneStyle,
) {
    surface.clear(style.background);

    for (i, stroke) in scene.strokes.iter().enumerate() {
        let selected = scene.selection.contains(i);
        if !stroke.active && !scene.reveal_inactive && !selected {
            continue;
        }
        let mut line = stroke_style(stroke);
        if !stroke.active {
            line = line.with_alpha(style.inactive_alpha);
        }
        if selected {
            line = line.with_dash(DashPattern::SELECTION);
        }
        stroke_polyline(
            surface,
            screen_points(stroke, scene.transforms, scene.view_offset),
            &line,
        );
    }

    if let Some((a, b)) = scene.lasso {
        let off = scene.view_offset;
        stroke_rect(
            surface,
            a.offset(-off.x, -off.y),
            b.offset(-off.x, -off.y),
            &StrokeStyle::solid(LASSO_COLOR, 1.0)
                .with_alpha(LASSO_ALPHA)
                .with_dash(DashPattern::LASSO),
        );
    }

    for foreign in scene.overlay {
        let color = Color::parse_or(&foreign.color, Color::rgb(0x66, 0x66, 0x66));
        let line = StrokeStyle::solid(color, foreign.size).with_alpha(style.overlay_alpha);
        let off = scene.view_offset;
        stroke_polyline(
            surface,
            foreign.points.iter().map(|p| p.offset(-off.x, -off.y)),
            &line,
        );
    }
}

/// Everything the timeline strip shows in one frame.
#[derive(Debug, Clone, Copy)]
pub struct TimelineScene<'a> {
    pub layout: &'a TimelineLayout,
    pub strokes: &'a [Stroke],
    pub selection: &'a Selection,
    /// In-progress lasso corners, timeline space.
    pub lasso: Option<(Point2D, Point2D)>,
}

/// Draw the timeline strip: grid, strokes, then lineage connectors.
pub fn draw_timeline<S: Surface + ?Sized>(
    surface: &mut S,
    scene: &TimelineScene<'_>,
    style: &SceneStyle,
) {
    surface.clear(style.background);
    let width = scene.layout.viewport.width;

    let grid = StrokeStyle::solid(GRID_COLOR, 1.0);
    for y in scene.layout.grid_lines(style.grid_divisions) {
        stroke_polyline(surface, [Point2D::new(0.0, y), Point2D::new(width, y)], &grid);
    }

    for item in &scene.layout.items {
        let Some(stroke) = scene.strokes.get(item.index) else {
            continue;
        };
        let alpha = if item.active {
            1.0
        } else {
            style.timeline_inactive_alpha
        };
        let mut line = StrokeStyle::solid(
            Color::parse_or(&stroke.color, Color::rgb(0x11, 0x11, 0x11)),
            TIMELINE_LINE_WIDTH,
        )
        .with_alpha(alpha);
        if scene.selection.contains(item.index) {
            line = line.with_dash(DashPattern::SELECTION);
        }
        stroke_polyline(surface, item.points.iter().copied(), &line);
    }

    let link_style = StrokeStyle::solid(LINEAGE_COLOR, 1.0)
        .with_alpha(LINEAGE_ALPHA)
        .with_dash(DashPattern::LINEAGE);
    for link in lineage_links(scene.layout, scene.strokes, scene.selection) {
        stroke_polyline(surface, [link.from, link.to], &link_style);
    }

    if let Some((a, b)) = scene.lasso {
        stroke_rect(
            surface,
            a,
            b,
            &StrokeStyle::solid(LASSO_COLOR, 1.0)
                .with_alpha(LASSO_ALPHA)
                .with_dash(DashPattern::LASSO),
        );
    }
}

/// Draw only the active strokes on white, as a snapshot preview shows them.
pub fn draw_snapshot_preview<S: Surface + ?Sized>(
    surface: &mut S,
    strokes: &[Stroke],
    transforms: &TransformMap,
    view_offset: Point2D,
) {
    surface.clear(Color::WHITE);
    for stroke in strokes.iter().filter(|s| s.active && s.points.len() >= 2) {
        stroke_polyline(
            surface,
            screen_points(stroke, transforms, view_offset),
            &stroke_style(stroke),
        );
    }
}

/// Rasterize a snapshot preview and encode it as a PNG data URL.
pub fn render_snapshot_preview(
    strokes: &[Stroke],
    transforms: &TransformMap,
    view_offset: Point2D,
    width: u32,
    height: u32,
) -> SketchResult<String> {
    tracing::debug!(width, height, strokes = strokes.len(), "Rendering snapshot preview");
    let mut surface = RasterSurface::new(width, height);
    draw_snapshot_preview(&mut surface, strokes, transforms, view_offset);
    surface.to_data_url()
}

/// Draw one stroke scaled to fit the surface, for the stroke list.
pub fn draw_stroke_thumbnail<S: Surface + ?Sized>(
    surface: &mut S,
    stroke: &Stroke,
    background: Color,
) {
    surface.clear(background);
    let Some(bounds) = stroke.bounds() else {
        return;
    };
    let scale_x = surface.width() as f64 / (bounds.width() + 1.0);
    let scale_y = surface.height() as f64 / (bounds.height() + 1.0);
    let scale = scale_x.min(scale_y);
    let mut line = stroke_style(stroke);
    line.width = stroke.size * scale;
    stroke_polyline(
        surface,
        stroke
            .positions()
            .map(|p| Point2D::new((p.x - bounds.min_x) * scale, (p.y - bounds.min_y) * scale)),
        &line,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronosketch_layout::{compute_layout, TimelineViewport};
    use chronosketch_model::{PenStyle, Point, StrokeId, Transform};

    fn red_line(id: &str, y: f64, t0: f64) -> Stroke {
        Stroke::freehand(
            StrokeId::new(id),
            vec![Point::new(10.0, y, t0), Point::new(90.0, y, t0 + 10.0)],
            &PenStyle {
                size: 4.0,
                color: "#ff0000".into(),
            },
            t0 as i64,
            t0 as i64 + 10,
        )
        .unwrap()
    }

    fn canvas<'a>(
        strokes: &'a [Stroke],
        transforms: &'a TransformMap,
        selection: &'a Selection,
    ) -> CanvasScene<'a> {
        CanvasScene {
            strokes,
            transforms,
            selection,
            view_offset: Point2D::default(),
            reveal_inactive: false,
            lasso: None,
            overlay: &[],
        }
    }

    #[test]
    fn test_preview_excludes_inactive() {
        let mut strokes = vec![red_line("a", 20.0, 0.0), red_line("b", 60.0, 20.0)];
        strokes[1].active = false;
        let mut surface = RasterSurface::new(100, 100);
        draw_snapshot_preview(&mut surface, &strokes, &TransformMap::new(), Point2D::default());
        assert_eq!(surface.pixel(50, 20), [255, 0, 0, 255]);
        assert_eq!(surface.pixel(50, 60), [255, 255, 255, 255]);
    }

    #[test]
    fn test_preview_applies_transform_and_view_offset() {
        let strokes = vec![red_line("a", 20.0, 0.0)];
        let mut transforms = TransformMap::new();
        transforms.insert(StrokeId::new("a"), Transform::new(0.0, 40.0));
        let mut surface = RasterSurface::new(100, 100);
        draw_snapshot_preview(&mut surface, &strokes, &transforms, Point2D::new(0.0, 10.0));
        assert_eq!(surface.pixel(50, 50), [255, 0, 0, 255]);
        assert_eq!(surface.pixel(50, 20), [255, 255, 255, 255]);
    }

    #[test]
    fn test_canvas_hides_inactive_until_revealed() {
        let mut strokes = vec![red_line("a", 50.0, 0.0)];
        strokes[0].active = false;
        let transforms = TransformMap::new();
        let selection = Selection::new();
        let style = SceneStyle::default();

        let mut surface = RasterSurface::new(100, 100);
        draw_canvas(&mut surface, &canvas(&strokes, &transforms, &selection), &style);
        assert_eq!(surface.pixel(50, 50), [255, 255, 255, 255]);

        let mut scene = canvas(&strokes, &transforms, &selection);
        scene.reveal_inactive = true;
        draw_canvas(&mut surface, &scene, &style);
        let [r, g, _, _] = surface.pixel(50, 50);
        assert_eq!(r, 255);
        assert!(g > 200, "inactive stroke should be faint, got g={g}");
    }

    #[test]
    fn test_selected_inactive_stroke_is_drawn() {
        let mut strokes = vec![red_line("a", 50.0, 0.0)];
        strokes[0].active = false;
        let transforms = TransformMap::new();
        let selection = Selection::from_indices([0]);
        let mut surface = RasterSurface::new(100, 100);
        draw_canvas(
            &mut surface,
            &canvas(&strokes, &transforms, &selection),
            &SceneStyle::default(),
        );
        assert_ne!(surface.pixel(12, 50), [255, 255, 255, 255]);
    }

    #[test]
    fn test_timeline_draws_grid_and_strokes() {
        let strokes = vec![red_line("a", 0.0, 0.0), red_line("b", 0.0, 100.0)];
        let layout = compute_layout(&strokes, 100.0, TimelineViewport::new(100.0, 100.0));
        let selection = Selection::new();
        let mut surface = RasterSurface::new(100, 100);
        draw_timeline(
            &mut surface,
            &TimelineScene {
                layout: &layout,
                strokes: &strokes,
                selection: &selection,
                lasso: None,
            },
            &SceneStyle::default(),
        );
        // Grid line at y = 40 away from any stroke point.
        assert_eq!(surface.pixel(2, 40), [0xcf, 0xcf, 0xcf, 255]);
        // Stroke a runs diagonally from (10, 0) to (90, 50).
        assert_eq!(surface.pixel(50, 25)[0], 255);
        assert!(surface.pixel(50, 25)[1] < 50);
    }

    #[test]
    fn test_thumbnail_fits_surface() {
        let stroke = red_line("a", 500.0, 0.0);
        let mut surface = RasterSurface::new(32, 32);
        draw_stroke_thumbnail(&mut surface, &stroke, Color::WHITE);
        assert_eq!(surface.pixel(16, 0)[1], 0);
    }
}
