//! Replace the document with an export document.

use std::path::PathBuf;

use anyhow::Context;
use chronosketch_common::config::AppConfig;

use super::{notice_error, open_session};

pub async fn run(config: &AppConfig, file: PathBuf) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut session = open_session(config).await?;
    let summary = session.import_document(&text).await.map_err(notice_error)?;

    println!(
        "Imported {} strokes and {} snapshots from {}",
        summary.strokes,
        summary.snapshots,
        file.display()
    );
    if let Some(current) = session.current_snapshot() {
        println!("  Showing snapshot {current}");
    }

    Ok(())
}
