//! Merge strokes from another document's snapshots.

use std::path::PathBuf;

use anyhow::Context;
use chronosketch_common::config::AppConfig;
use chronosketch_engine::Effect;
use chronosketch_model::SnapshotId;

use super::{open_session, print_notices};

pub async fn run(
    config: &AppConfig,
    file: PathBuf,
    snapshots: Vec<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut session = open_session(config).await?;
    if let [Effect::Notice(notice)] = session.load_overlay(&text).as_slice() {
        anyhow::bail!("{}", notice.message);
    }

    if !snapshots.is_empty() {
        let default: Vec<SnapshotId> = session.overlay().selected().iter().cloned().collect();
        for id in &default {
            session.deselect_overlay_snapshot(id);
        }
        for id in snapshots.iter().map(SnapshotId::new) {
            if !session.select_overlay_snapshot(&id) {
                anyhow::bail!("Overlay has no snapshot {id}");
            }
        }
    }

    if let Some(document) = session.overlay().document() {
        println!("Overlay {}:", file.display());
        for snapshot in &document.snapshots {
            let mark = if session.overlay().selected().contains(&snapshot.id) {
                'x'
            } else {
                ' '
            };
            println!(
                "  [{mark}] {}  {} strokes",
                snapshot.id,
                document.referenced_ids(snapshot).len()
            );
        }
        println!("  {} strokes staged", session.overlay().staged().len());
    }

    if dry_run {
        return Ok(());
    }

    let effects = session.apply_overlay();
    let notices = session.apply_effects(effects).await;
    print_notices(&notices);
    if notices.iter().any(|n| n.is_error()) {
        anyhow::bail!("Overlay import did not complete");
    }

    Ok(())
}
