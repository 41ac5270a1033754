//! List saved snapshots.

use chronosketch_common::config::AppConfig;
use chronosketch_layout::{snapshots_containing, Selection};
use serde::Serialize;

use super::{notice_error, open_session};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRow {
    id: String,
    timestamp: String,
    active: usize,
    moved: usize,
    has_preview: bool,
    original_snapshot_id: Option<String>,
    current: bool,
    highlighted: bool,
}

pub async fn run(config: &AppConfig, containing: Vec<usize>, json: bool) -> anyhow::Result<()> {
    let session = open_session(config).await?;
    let snapshots = session.list_snapshots().await.map_err(notice_error)?;

    let selection = Selection::from_indices(containing);
    let highlighted = snapshots_containing(&snapshots, session.strokes(), &selection);
    let current = session.current_snapshot();

    let rows: Vec<SnapshotRow> = snapshots
        .iter()
        .map(|s| SnapshotRow {
            id: s.id.to_string(),
            timestamp: s.timestamp.to_rfc3339(),
            active: s.active_ids.len(),
            moved: s.transforms.len(),
            has_preview: s.preview.is_some(),
            original_snapshot_id: s.original_snapshot_id.as_ref().map(|id| id.to_string()),
            current: current == Some(&s.id),
            highlighted: highlighted.contains(&s.id),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No snapshots saved.");
        return Ok(());
    }

    for row in &rows {
        let marker = match (row.current, row.highlighted) {
            (true, _) => '*',
            (false, true) => '+',
            (false, false) => ' ',
        };
        print!(
            "{marker} {}  {}  {} strokes",
            row.id, row.timestamp, row.active
        );
        if row.moved > 0 {
            print!(", {} offset", row.moved);
        }
        if let Some(ref original) = row.original_snapshot_id {
            print!("  (imported from {original})");
        }
        println!();
    }
    if !selection.is_empty() {
        println!("\n{} snapshot(s) show the given strokes.", highlighted.len());
    }

    Ok(())
}
