//! ChronoSketch Sketch Engine
//!
//! Owns the mutable side of a sketch document:
//! - **Store:** Append-only stroke list with undo/redo, visibility and moves
//! - **Snapshots:** Capture, restore and list saved active sets
//! - **Overlay:** Stage a foreign document and graft its strokes in
//! - **Persistence:** The async document store and record helpers
//! - **Session:** Tool and gesture state machine that emits effects
//!
//! Handlers on [`SketchSession`] never perform I/O themselves. They return
//! [`Effect`]s, and [`SketchSession::apply_effects`] carries out the writes.

pub mod effect;
pub mod interchange;
pub mod overlay;
pub mod persistence;
pub mod session;
pub mod snapshots;
pub mod store;

pub use effect::{Effect, Notice, NoticeLevel};
pub use interchange::{document_error, export_document, import_document};
pub use overlay::{OverlayImport, OverlaySession};
pub use persistence::*;
pub use session::*;
pub use snapshots::SnapshotManager;
pub use store::StrokeStore;
