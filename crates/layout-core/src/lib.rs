//! ChronoSketch Layout Core
//!
//! Pure geometry over the stroke list:
//! - **Timeline:** Time-compaction layout and lineage connectors
//! - **Selection:** Lasso hit-testing in world and timeline space
//!
//! This crate is pure computation with no I/O and no persistence.
//! All inputs are data; all outputs are data.

pub mod selection;
pub mod timeline;

pub use selection::{select_in_timeline, select_in_world, snapshots_containing, Selection};
pub use timeline::{
    compute_layout, lineage_links, LayoutItem, LineageLink, TimelineLayout, TimelineViewport,
};
