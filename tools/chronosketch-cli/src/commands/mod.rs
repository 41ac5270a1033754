pub mod export;
pub mod import;
pub mod info;
pub mod overlay;
pub mod render;
pub mod snapshots;
pub mod timeline;

use std::sync::Arc;

use anyhow::Context;
use chronosketch_common::clock::SessionClock;
use chronosketch_common::config::AppConfig;
use chronosketch_engine::{JsonDirStore, Notice, SketchSession};

/// Open the document in the configured data directory.
pub async fn open_session(config: &AppConfig) -> anyhow::Result<SketchSession> {
    tracing::debug!(data_dir = %config.data_dir.display(), "Opening document");
    let store = JsonDirStore::open(config.data_dir.clone())
        .await
        .with_context(|| format!("Failed to open store at {}", config.data_dir.display()))?;
    SketchSession::open(config, Arc::new(SessionClock::start()), Arc::new(store))
        .await
        .context("Failed to load document")
}

/// Print notices the way the canvas would show them.
pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        if notice.is_error() {
            eprintln!("{notice}");
        } else {
            println!("{notice}");
        }
    }
}

/// Turn a notice returned as an error into an `anyhow` error.
pub fn notice_error(notice: Notice) -> anyhow::Error {
    anyhow::anyhow!(notice.message)
}
