//! Render the document to a PNG file.

use std::path::PathBuf;

use anyhow::Context;
use chronosketch_common::config::AppConfig;
use chronosketch_model::SnapshotId;
use chronosketch_render::{
    draw_canvas, draw_snapshot_preview, draw_stroke_thumbnail, draw_timeline, RasterSurface,
    SceneStyle,
};

use super::{notice_error, open_session};
use crate::RenderKind;

const THUMBNAIL_SIZE: u32 = 96;

pub async fn run(
    config: &AppConfig,
    kind: RenderKind,
    output: PathBuf,
    snapshot: Option<String>,
    index: usize,
    show_inactive: bool,
) -> anyhow::Result<()> {
    let mut session = open_session(config).await?;
    if let Some(id) = snapshot {
        let id = SnapshotId::new(id);
        if !session.load_snapshot(&id).await.map_err(notice_error)? {
            anyhow::bail!("No snapshot {id}");
        }
    }
    if show_inactive {
        session.toggle_show_inactive();
    }

    let style = SceneStyle::from_config(config);
    let settings = session.settings();
    let surface = match kind {
        RenderKind::Canvas => {
            let mut surface = RasterSurface::with_background(
                settings.canvas_width,
                settings.canvas_height,
                style.background,
            );
            draw_canvas(&mut surface, &session.canvas_scene(), &style);
            surface
        }
        RenderKind::Timeline => {
            let mut surface =
                RasterSurface::with_background(settings.timeline_width, settings.canvas_height, style.background);
            let layout = session.timeline_layout();
            draw_timeline(&mut surface, &session.timeline_scene(&layout), &style);
            surface
        }
        RenderKind::Preview => {
            let mut surface = RasterSurface::new(settings.canvas_width, settings.canvas_height);
            let store = session.store();
            draw_snapshot_preview(
                &mut surface,
                store.strokes(),
                store.transforms(),
                session.view_offset(),
            );
            surface
        }
        RenderKind::Thumbnail => {
            let stroke = session
                .strokes()
                .get(index)
                .with_context(|| format!("No stroke at index {index}"))?;
            let mut surface = RasterSurface::new(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
            draw_stroke_thumbnail(&mut surface, stroke, style.background);
            surface
        }
    };

    surface
        .save_png(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Rendered {:?} to {}", kind, output.display());

    Ok(())
}
