//! Write a full export document.

use std::path::PathBuf;

use anyhow::Context;
use chronosketch_common::config::AppConfig;

use super::{notice_error, open_session};

pub async fn run(config: &AppConfig, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut session = open_session(config).await?;
    let document = session.export_document().await.map_err(notice_error)?;
    let json = document.to_json_pretty()?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Exported {} strokes and {} snapshots to {}",
                document.paths.len(),
                document.snapshots.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}
