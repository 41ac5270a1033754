//! ChronoSketch Sketch Model
//!
//! Defines the core data contracts for ChronoSketch documents:
//! - **Strokes:** Timed polylines with metrics, an active flag, and lineage
//! - **Snapshots:** Timestamped active sets plus per-stroke transforms
//! - **Records:** The persisted schema and its one-shot legacy migration
//! - **Documents:** Full export/import and foreign overlay sources
//!
//! Coordinates are world-space canvas pixels. Point times (`tAbs`) are
//! monotonic milliseconds; stroke `startTime`/`endTime` are wall-clock.

pub mod document;
pub mod geometry;
pub mod oplog;
pub mod record;
pub mod snapshot;
pub mod stroke;

pub use document::*;
pub use geometry::*;
pub use oplog::*;
pub use record::*;
pub use snapshot::*;
pub use stroke::*;
