//! ChronoSketch CLI: inspect and transform sketch documents on disk.
//!
//! Usage:
//!   chronosketch info                 Show document statistics
//!   chronosketch snapshots            List saved snapshots
//!   chronosketch timeline             Print the compacted timeline layout
//!   chronosketch export [-o FILE]     Write a full export document
//!   chronosketch import <FILE>        Replace the document with an export
//!   chronosketch overlay <FILE>       Merge strokes from another document
//!   chronosketch render -o <PNG>      Rasterize the canvas, timeline, or a preview
//!
//! Every command works on the document store in `--data-dir`, falling back
//! to the configured data directory.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "chronosketch",
    about = "Freehand sketches with non-destructive version history",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Document store directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show document statistics
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List saved snapshots, oldest first
    Snapshots {
        /// Only snapshots showing at least one of these stroke indices
        #[arg(long = "containing", value_delimiter = ',')]
        containing: Vec<usize>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the compacted timeline layout
    Timeline {
        /// Strip width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Strip height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export strokes, snapshots, and operation counts
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the whole document with an export document
    Import {
        /// Export document to read
        file: PathBuf,
    },

    /// Merge strokes from another document's snapshots
    Overlay {
        /// Foreign document (export or minimal share format)
        file: PathBuf,

        /// Snapshot ids to take (defaults to the newest)
        #[arg(short, long = "snapshot")]
        snapshots: Vec<String>,

        /// Show what would be imported without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Render the document to a PNG file
    Render {
        /// What to draw
        #[arg(long, value_enum, default_value = "canvas")]
        kind: RenderKind,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        /// Load this snapshot before drawing
        #[arg(long)]
        snapshot: Option<String>,

        /// Stroke index, for `--kind thumbnail`
        #[arg(long, default_value = "0")]
        index: usize,

        /// Also draw inactive strokes on the canvas
        #[arg(long)]
        show_inactive: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderKind {
    Canvas,
    Timeline,
    Preview,
    Thumbnail,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = chronosketch_common::config::AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    chronosketch_common::logging::init_logging(&config.logging);
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Commands::Info { json } => commands::info::run(&config, json).await,
        Commands::Snapshots { containing, json } => {
            commands::snapshots::run(&config, containing, json).await
        }
        Commands::Timeline {
            width,
            height,
            json,
        } => commands::timeline::run(&config, width, height, json).await,
        Commands::Export { output } => commands::export::run(&config, output).await,
        Commands::Import { file } => commands::import::run(&config, file).await,
        Commands::Overlay {
            file,
            snapshots,
            dry_run,
        } => commands::overlay::run(&config, file, snapshots, dry_run).await,
        Commands::Render {
            kind,
            output,
            snapshot,
            index,
            show_inactive,
        } => commands::render::run(&config, kind, output, snapshot, index, show_inactive).await,
    }
}
