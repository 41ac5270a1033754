//! Print the compacted timeline layout.

use chronosketch_common::config::AppConfig;
use chronosketch_layout::{compute_layout, lineage_links, Selection, TimelineViewport};

use super::open_session;

pub async fn run(
    config: &AppConfig,
    width: Option<u32>,
    height: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let session = open_session(config).await?;
    let default = session.timeline_viewport();
    let viewport = TimelineViewport::new(
        width.map_or(default.width, f64::from),
        height.map_or(default.height, f64::from),
    );
    let strokes = session.strokes();
    let layout = compute_layout(strokes, config.canvas.width as f64, viewport);

    if json {
        println!("{}", serde_json::to_string_pretty(&layout)?);
        return Ok(());
    }

    println!(
        "Timeline {}x{}, {:.0} ms of drawing",
        layout.viewport.width, layout.viewport.height, layout.total_duration
    );
    for item in &layout.items {
        let stroke = &strokes[item.index];
        println!(
            "  [{:>3}] {:<40} {:>8.1} +{:<7.1} {}",
            item.index,
            item.id.as_str(),
            item.offset,
            item.duration,
            if item.active { "active" } else { "hidden" },
        );
        if let Some(ref parent) = stroke.parent_id {
            println!("        moved from {parent}");
        }
    }

    let everything = Selection::from_indices(0..strokes.len());
    let links = lineage_links(&layout, strokes, &everything);
    if !links.is_empty() {
        println!("\nLineage:");
        for link in &links {
            println!("  {} -> {}", link.parent_index, link.child_index);
        }
    }

    Ok(())
}
