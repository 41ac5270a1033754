//! ChronoSketch Render Engine
//!
//! Draws sketches onto an immediate-mode [`Surface`]. The core only relies
//! on the move-to/line-to/stroke contract; [`RasterSurface`] is the
//! software implementation used for previews and PNG export.
//!
//! # Scenes
//!
//! ```text
//! strokes + transforms + selection ──► draw_canvas ──────────► live canvas
//! TimelineLayout + selection ────────► draw_timeline ────────► timeline strip
//! active strokes only ───────────────► render_snapshot_preview ► data:image/png
//! ```

pub mod raster;
pub mod scene;
pub mod surface;

pub use raster::RasterSurface;
pub use scene::*;
pub use surface::*;
