//! Show document statistics.

use chronosketch_common::config::AppConfig;
use serde::Serialize;

use super::{notice_error, open_session};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentInfo {
    data_dir: String,
    strokes: usize,
    active: usize,
    moved: usize,
    imported_snapshots: usize,
    snapshots: usize,
    current_snapshot: Option<String>,
    compacted_duration_ms: f64,
    total_length_px: f64,
}

pub async fn run(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let session = open_session(config).await?;
    let snapshots = session.list_snapshots().await.map_err(notice_error)?;
    let layout = session.timeline_layout();
    let strokes = session.strokes();

    let info = DocumentInfo {
        data_dir: config.data_dir.display().to_string(),
        strokes: strokes.len(),
        active: strokes.iter().filter(|s| s.active).count(),
        moved: strokes.iter().filter(|s| s.parent_id.is_some()).count(),
        imported_snapshots: snapshots.iter().filter(|s| s.is_imported()).count(),
        snapshots: snapshots.len(),
        current_snapshot: session.current_snapshot().map(|id| id.to_string()),
        compacted_duration_ms: layout.total_duration,
        total_length_px: strokes.iter().map(|s| s.length).sum(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Document: {}", info.data_dir);
    println!("  Strokes: {} ({} active)", info.strokes, info.active);
    println!("  Moved copies: {}", info.moved);
    println!(
        "  Snapshots: {} ({} imported)",
        info.snapshots, info.imported_snapshots
    );
    println!(
        "  Current snapshot: {}",
        info.current_snapshot.as_deref().unwrap_or("none")
    );
    println!("  Drawing time: {:.0} ms", info.compacted_duration_ms);
    println!("  Ink length: {:.1} px", info.total_length_px);

    Ok(())
}
