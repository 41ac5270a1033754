//! The sketch session: one owned application state driven by input events.
//!
//! Synchronous handlers mutate the in-memory state and return [`Effect`]s.
//! Persistence happens later in [`SketchSession::apply_effects`], which turns
//! any failure into a [`Notice`] instead of touching the in-memory state.
//!
//! Gestures are modal. Only one of draw, lasso, move, or pan runs at a
//! time, and switching tools drops whatever gesture was in progress.

use std::sync::Arc;

use chronosketch_common::clock::Clock;
use chronosketch_common::config::AppConfig;
use chronosketch_common::error::{SketchError, SketchResult};
use chronosketch_layout::{
    compute_layout, select_in_timeline, select_in_world, snapshots_containing, Selection,
    TimelineLayout, TimelineViewport,
};
use chronosketch_model::{
    is_small_drag, ExportDocument, MigrationContext, Operation, OperationLog, PenStyle, Point,
    Point2D, Record, Snapshot, SnapshotId, Stroke, StrokeId, Transform, TransformMap,
};
use chronosketch_render::{CanvasScene, TimelineScene};

use crate::effect::{Effect, Notice};
use crate::interchange;
use crate::overlay::OverlaySession;
use crate::persistence::{load_paths, put_record, DocumentStore};
use crate::snapshots::SnapshotManager;
use crate::store::StrokeStore;

/// The active drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Pen,
    Lasso,
    Move,
}

/// Where a pointer event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// The drawing canvas; coordinates are screen pixels.
    Canvas,
    /// The timeline strip; coordinates are strip pixels.
    Timeline,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub target: PointerTarget,
    pub x: f64,
    pub y: f64,
}

impl PointerEvent {
    pub fn canvas(x: f64, y: f64) -> Self {
        Self {
            target: PointerTarget::Canvas,
            x,
            y,
        }
    }

    pub fn timeline(x: f64, y: f64) -> Self {
        Self {
            target: PointerTarget::Timeline,
            x,
            y,
        }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Held modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Reveals inactive strokes while held.
    pub alt: bool,
    /// Turns canvas drags into panning while held.
    pub space: bool,
}

/// Gesture-local state. Reset on every tool switch.
#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    Drawing {
        points: Vec<Point>,
        started_at: i64,
    },
    /// World-space corners.
    CanvasLasso { start: Point2D, end: Point2D },
    /// Strip-space corners.
    TimelineLasso { start: Point2D, end: Point2D },
    Moving {
        start_screen: Point2D,
        base: TransformMap,
    },
    Panning {
        start_screen: Point2D,
        start_offset: Point2D,
    },
}

/// Session tunables taken from [`AppConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub timeline_width: u32,
    pub min_drag_px: f64,
    pub timeline_lasso_includes_inactive: bool,
    pub import_point_step_ms: f64,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            canvas_width: config.canvas.width,
            canvas_height: config.canvas.height,
            timeline_width: config.timeline.width,
            min_drag_px: config.lasso.min_drag_px,
            timeline_lasso_includes_inactive: config.timeline.lasso_includes_inactive,
            import_point_step_ms: config.overlay.import_point_step_ms,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Counts reported after a successful document import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub strokes: usize,
    pub snapshots: usize,
}

/// Owned application state for one open document.
pub struct SketchSession {
    store: StrokeStore,
    selection: Selection,
    tool: Tool,
    modifiers: Modifiers,
    show_inactive: bool,
    view_offset: Point2D,
    gesture: Gesture,
    snapshots: SnapshotManager,
    overlay: OverlaySession,
    oplog: OperationLog,
    pen: PenStyle,
    settings: SessionSettings,
    db: Option<Arc<dyn DocumentStore>>,
    clock: Arc<dyn Clock>,
}

impl SketchSession {
    /// An empty session with no document store attached.
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let settings = SessionSettings::from_config(config);
        Self {
            store: StrokeStore::new(),
            selection: Selection::new(),
            tool: Tool::default(),
            modifiers: Modifiers::default(),
            show_inactive: false,
            view_offset: Point2D::default(),
            gesture: Gesture::Idle,
            snapshots: SnapshotManager::new(settings.canvas_width, settings.canvas_height),
            overlay: OverlaySession::new(),
            oplog: OperationLog::new(),
            pen: PenStyle {
                size: config.pen.size,
                color: config.pen.color.clone(),
            },
            settings,
            db: None,
            clock,
        }
    }

    /// Attach a store and load its strokes and newest snapshot.
    pub async fn open(
        config: &AppConfig,
        clock: Arc<dyn Clock>,
        db: Arc<dyn DocumentStore>,
    ) -> SketchResult<Self> {
        let mut session = Self::new(config, clock);
        session.db = Some(db);
        session.reload().await?;
        session.load_latest_from_store().await?;
        tracing::info!(
            strokes = session.store.len(),
            snapshot = session.snapshots.current().map(SnapshotId::as_str),
            "Session opened"
        );
        Ok(session)
    }

    // ---- accessors ----

    pub fn store(&self) -> &StrokeStore {
        &self.store
    }

    pub fn strokes(&self) -> &[Stroke] {
        self.store.strokes()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn show_inactive(&self) -> bool {
        self.show_inactive
    }

    /// Inactive strokes are shown and selectable on the canvas.
    pub fn reveal_inactive(&self) -> bool {
        self.modifiers.alt || self.show_inactive
    }

    pub fn view_offset(&self) -> Point2D {
        self.view_offset
    }

    pub fn current_snapshot(&self) -> Option<&SnapshotId> {
        self.snapshots.current()
    }

    pub fn overlay(&self) -> &OverlaySession {
        &self.overlay
    }

    pub fn operation_log(&self) -> &OperationLog {
        &self.oplog
    }

    pub fn pen(&self) -> &PenStyle {
        &self.pen
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn has_store(&self) -> bool {
        self.db.is_some()
    }

    /// Whether a pointer gesture is in progress.
    pub fn is_busy(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    fn migration_context(&self) -> MigrationContext {
        MigrationContext {
            now_abs: self.clock.monotonic_ms(),
        }
    }

    fn to_world(&self, screen: Point2D) -> Point2D {
        screen.offset(self.view_offset.x, self.view_offset.y)
    }

    // ---- tools and toggles ----

    /// Switch tools. Any gesture in progress is dropped; the selection stays.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Effect> {
        let now = self.clock.wall_ms();
        match tool {
            Tool::Pen => self.oplog.record(Operation::Pen, now),
            Tool::Lasso => self.oplog.record(Operation::Lasso, now),
            Tool::Move => {}
        }
        self.tool = tool;
        self.gesture = Gesture::Idle;
        tracing::debug!(?tool, "Tool changed");
        vec![Effect::Redraw]
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) -> Vec<Effect> {
        if self.modifiers == modifiers {
            return Vec::new();
        }
        self.modifiers = modifiers;
        vec![Effect::Redraw]
    }

    pub fn toggle_show_inactive(&mut self) -> Vec<Effect> {
        self.oplog.record(Operation::ShowInactive, self.clock.wall_ms());
        self.show_inactive = !self.show_inactive;
        vec![Effect::Redraw]
    }

    pub fn set_pen(&mut self, pen: PenStyle) {
        self.pen = pen;
    }

    // ---- pointer gestures ----

    pub fn pointer_down(&mut self, event: PointerEvent) -> Vec<Effect> {
        if self.is_busy() {
            return Vec::new();
        }
        let screen = event.position();
        self.gesture = match event.target {
            PointerTarget::Canvas if self.modifiers.space => Gesture::Panning {
                start_screen: screen,
                start_offset: self.view_offset,
            },
            PointerTarget::Canvas => {
                let world = self.to_world(screen);
                match self.tool {
                    Tool::Pen => Gesture::Drawing {
                        points: vec![Point::new(world.x, world.y, self.clock.monotonic_ms())],
                        started_at: self.clock.wall_ms(),
                    },
                    Tool::Lasso => Gesture::CanvasLasso {
                        start: world,
                        end: world,
                    },
                    Tool::Move if !self.selection.is_empty() => Gesture::Moving {
                        start_screen: screen,
                        base: self.store.transforms().clone(),
                    },
                    Tool::Move => Gesture::Idle,
                }
            }
            PointerTarget::Timeline if self.tool == Tool::Lasso => Gesture::TimelineLasso {
                start: screen,
                end: screen,
            },
            PointerTarget::Timeline => Gesture::Idle,
        };
        if self.is_busy() {
            vec![Effect::Redraw]
        } else {
            Vec::new()
        }
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> Vec<Effect> {
        let screen = event.position();
        let world = self.to_world(screen);
        match &mut self.gesture {
            Gesture::Idle => return Vec::new(),
            Gesture::Drawing { points, .. } => {
                let last = points.last().map_or(f64::NEG_INFINITY, |p| p.t_abs);
                let t_abs = self.clock.monotonic_ms().max(last);
                points.push(Point::new(world.x, world.y, t_abs));
            }
            Gesture::CanvasLasso { end, .. } => *end = world,
            Gesture::TimelineLasso { end, .. } => *end = screen,
            Gesture::Moving { start_screen, base } => {
                let delta = Transform::new(screen.x - start_screen.x, screen.y - start_screen.y);
                let ids = self.selection.ids(self.store.strokes());
                self.store.commit_transform(&ids, base, delta);
            }
            Gesture::Panning {
                start_screen,
                start_offset,
            } => {
                self.view_offset = Point2D::new(
                    start_offset.x - (screen.x - start_screen.x),
                    start_offset.y - (screen.y - start_screen.y),
                );
            }
        }
        vec![Effect::Redraw]
    }

    pub fn pointer_up(&mut self, event: PointerEvent) -> Vec<Effect> {
        let screen = event.position();
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => Vec::new(),
            Gesture::Drawing { points, started_at } => self.commit_drawing(points, started_at),
            Gesture::CanvasLasso { start, .. } => {
                let end = self.to_world(screen);
                if is_small_drag(start, end, self.settings.min_drag_px) {
                    return vec![Effect::Redraw];
                }
                let store = &self.store;
                self.selection = select_in_world(
                    store.strokes(),
                    start,
                    end,
                    self.modifiers.alt || self.show_inactive,
                    |id| store.transform_of(id),
                );
                self.oplog.record_executed(Operation::Lasso, self.clock.wall_ms());
                vec![Effect::Redraw]
            }
            Gesture::TimelineLasso { start, .. } => {
                if is_small_drag(start, screen, self.settings.min_drag_px) {
                    return vec![Effect::Redraw];
                }
                let layout = self.timeline_layout();
                self.selection = select_in_timeline(
                    &layout,
                    start,
                    screen,
                    self.settings.timeline_lasso_includes_inactive,
                    self.modifiers.alt,
                );
                self.oplog.record_executed(Operation::Lasso, self.clock.wall_ms());
                vec![Effect::Redraw]
            }
            Gesture::Moving { .. } => {
                let created = self.store.materialize_move(
                    &self.selection,
                    self.clock.wall_ms(),
                    self.clock.monotonic_ms(),
                );
                if created.is_empty() {
                    return vec![Effect::Redraw];
                }
                self.selection.replace(created);
                vec![Effect::PersistPaths, Effect::Redraw]
            }
            Gesture::Panning { .. } => vec![Effect::Redraw],
        }
    }

    fn commit_drawing(&mut self, points: Vec<Point>, started_at: i64) -> Vec<Effect> {
        if points.len() < 2 {
            return vec![Effect::Redraw];
        }
        let ended_at = self.clock.wall_ms().max(started_at);
        let stroke = match Stroke::freehand(
            StrokeId::generate(started_at),
            points,
            &self.pen,
            started_at,
            ended_at,
        ) {
            Ok(stroke) => stroke,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding pen gesture");
                return vec![Effect::Redraw];
            }
        };
        match self.store.append(stroke) {
            Ok(index) => {
                self.oplog.record_executed(Operation::StrokeDrawn, ended_at);
                tracing::debug!(index, "Stroke drawn");
                vec![Effect::PersistPaths, Effect::Redraw]
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding pen gesture");
                vec![Effect::Redraw]
            }
        }
    }

    // ---- history and visibility ----

    pub fn undo(&mut self) -> Vec<Effect> {
        let now = self.clock.wall_ms();
        self.oplog.record_click(Operation::Undo, now);
        if self.store.undo().is_none() {
            return Vec::new();
        }
        self.oplog.record_executed(Operation::Undo, now);
        self.selection.prune(self.store.len());
        vec![Effect::PersistPaths, Effect::Redraw]
    }

    pub fn redo(&mut self) -> Vec<Effect> {
        let now = self.clock.wall_ms();
        self.oplog.record_click(Operation::Redo, now);
        if self.store.redo().is_none() {
            return Vec::new();
        }
        self.oplog.record_executed(Operation::Redo, now);
        vec![Effect::PersistPaths, Effect::Redraw]
    }

    /// Flip one stroke's visibility (stroke list checkbox).
    pub fn toggle_active(&mut self, index: usize) -> Vec<Effect> {
        if self.store.toggle_active(index).is_none() {
            return Vec::new();
        }
        self.oplog.record_executed(Operation::ToggleActive, self.clock.wall_ms());
        vec![Effect::PersistPaths, Effect::Redraw]
    }

    /// Flip visibility of every selected stroke.
    pub fn toggle_selected(&mut self) -> Vec<Effect> {
        let now = self.clock.wall_ms();
        self.oplog.record_click(Operation::ToggleSelected, now);
        if self.store.toggle_selected(&self.selection) == 0 {
            return Vec::new();
        }
        self.oplog.record_executed(Operation::ToggleSelected, now);
        vec![Effect::PersistPaths, Effect::Redraw]
    }

    /// Show only the selected strokes.
    pub fn isolate_selected(&mut self) -> Vec<Effect> {
        if !self.store.isolate(&self.selection) {
            return vec![Effect::Notice(Notice::warning(
                "Select strokes with the lasso first",
            ))];
        }
        vec![Effect::PersistPaths, Effect::Redraw]
    }

    /// Hide every stroke, after auto-saving a snapshot of what was visible.
    pub fn clear(&mut self) -> Vec<Effect> {
        let now = self.clock.wall_ms();
        self.oplog.record_click(Operation::Clear, now);
        let mut effects = Vec::new();
        if self.db.is_some() {
            let snapshot = self
                .snapshots
                .capture(&self.store, self.view_offset, self.clock.as_ref());
            effects.push(Effect::SaveSnapshot(snapshot));
        }
        self.store.deactivate_all();
        self.store.discard_redo();
        self.oplog.record_executed(Operation::Clear, now);
        effects.extend([Effect::PersistPaths, Effect::Redraw]);
        effects
    }

    /// Capture a snapshot of the current active set and transforms.
    pub fn save_snapshot(&mut self) -> Vec<Effect> {
        self.oplog.record(Operation::Save, self.clock.wall_ms());
        if self.db.is_none() {
            return vec![Effect::Notice(Notice::from_error(
                "Could not save snapshot",
                &SketchError::StoreUnavailable,
            ))];
        }
        let snapshot = self
            .snapshots
            .capture(&self.store, self.view_offset, self.clock.as_ref());
        vec![
            Effect::SaveSnapshot(snapshot),
            Effect::PersistPaths,
            Effect::Redraw,
        ]
    }

    // ---- overlay ----

    /// Stage a foreign document. A rejected document changes nothing.
    pub fn load_overlay(&mut self, text: &str) -> Vec<Effect> {
        match self.overlay.load(text) {
            Ok(_) => vec![Effect::Redraw],
            Err(e) => {
                tracing::warn!(error = %e, "Overlay document rejected");
                vec![Effect::Notice(Notice::error(format!(
                    "Unsupported overlay document: {e}"
                )))]
            }
        }
    }

    /// Pick or unpick one foreign snapshot.
    pub fn toggle_overlay_snapshot(&mut self, id: &SnapshotId) -> Vec<Effect> {
        self.overlay.toggle(id);
        vec![Effect::Redraw]
    }

    /// Add one foreign snapshot to the pick. Picking twice keeps it picked.
    /// False when no staged document has that snapshot.
    pub fn select_overlay_snapshot(&mut self, id: &SnapshotId) -> bool {
        self.overlay.select(id)
    }

    /// Remove one foreign snapshot from the pick. False if it was not picked.
    pub fn deselect_overlay_snapshot(&mut self, id: &SnapshotId) -> bool {
        self.overlay.deselect(id)
    }

    pub fn cancel_overlay(&mut self) -> Vec<Effect> {
        self.overlay.cancel();
        vec![Effect::Redraw]
    }

    /// Graft the staged overlay into the document.
    pub fn apply_overlay(&mut self) -> Vec<Effect> {
        if !self.overlay.is_active() {
            return Vec::new();
        }
        if self.db.is_none() {
            return vec![Effect::Notice(Notice::from_error(
                "Could not import overlay",
                &SketchError::StoreUnavailable,
            ))];
        }
        if self.overlay.selected().is_empty() {
            return vec![Effect::Notice(Notice::warning(
                "Pick at least one overlay snapshot",
            ))];
        }
        let plan = self
            .overlay
            .plan_apply(self.clock.as_ref(), self.settings.import_point_step_ms);
        let Some(plan) = plan.filter(|p| !p.strokes.is_empty()) else {
            return vec![Effect::Notice(Notice::warning(
                "No strokes to import from the overlay",
            ))];
        };

        let stroke_count = plan.strokes.len();
        let snapshot_count = plan.snapshots.len();
        self.store.extend_imported(plan.strokes);
        self.overlay.cancel();

        let mut effects = vec![Effect::PersistPaths];
        effects.extend(plan.snapshots.into_iter().map(Effect::PersistSnapshot));
        for skipped in plan.skipped {
            effects.push(Effect::Notice(Notice::warning(format!(
                "Skipped overlay snapshot {skipped}: none of its strokes could be imported"
            ))));
        }
        effects.push(Effect::Notice(Notice::info(format!(
            "Imported {stroke_count} strokes and {snapshot_count} snapshots"
        ))));
        effects.push(Effect::Redraw);
        tracing::info!(strokes = stroke_count, snapshots = snapshot_count, "Overlay applied");
        effects
    }

    // ---- persistence ----

    /// Perform the persistence work handlers asked for.
    ///
    /// Returns the notices to show: those carried by the effects plus one
    /// per failed write. Without a store, path writes are skipped silently
    /// and snapshot writes are reported.
    pub async fn apply_effects(&self, effects: Vec<Effect>) -> Vec<Notice> {
        let mut notices = Vec::new();
        for effect in effects {
            match effect {
                Effect::Redraw => {}
                Effect::Notice(notice) => notices.push(notice),
                Effect::PersistPaths => {
                    let Some(db) = &self.db else {
                        tracing::debug!("No document store, paths not persisted");
                        continue;
                    };
                    if let Err(e) = put_record(db.as_ref(), &self.store.to_record()).await {
                        tracing::error!(error = %e, "Failed to persist strokes");
                        notices.push(Notice::from_error("Could not save strokes", &e));
                    }
                }
                Effect::PersistSnapshot(snapshot) | Effect::SaveSnapshot(snapshot)
                    if self.db.is_none() =>
                {
                    tracing::warn!(snapshot = %snapshot.id, "No document store, snapshot dropped");
                    notices.push(Notice::from_error(
                        "Could not save snapshot",
                        &SketchError::StoreUnavailable,
                    ));
                }
                Effect::PersistSnapshot(snapshot) => {
                    if let Err(e) = self.persist_snapshot(&snapshot).await {
                        notices.push(Notice::from_error("Could not save snapshot", &e));
                    }
                }
                Effect::SaveSnapshot(snapshot) => match self.persist_snapshot(&snapshot).await {
                    Ok(()) => notices.push(Notice::info(format!("Snapshot {} saved", snapshot.id))),
                    Err(e) => notices.push(Notice::from_error("Could not save snapshot", &e)),
                },
            }
        }
        notices
    }

    async fn persist_snapshot(&self, snapshot: &Snapshot) -> SketchResult<()> {
        let db = self.db.as_ref().ok_or(SketchError::StoreUnavailable)?;
        put_record(db.as_ref(), &Record::Snapshot(snapshot.clone()))
            .await
            .map_err(|e| {
                tracing::error!(snapshot = %snapshot.id, error = %e, "Failed to persist snapshot");
                e
            })
    }

    /// Replace the in-memory strokes with the store's `paths` record.
    pub async fn reload(&mut self) -> SketchResult<()> {
        let db = self.db.clone().ok_or(SketchError::StoreUnavailable)?;
        let paths = load_paths(db.as_ref(), self.migration_context()).await?;
        self.store.replace_all(paths);
        self.selection.prune(self.store.len());
        Ok(())
    }

    async fn load_latest_from_store(&mut self) -> SketchResult<Option<SnapshotId>> {
        let Some(db) = self.db.clone() else {
            return Ok(None);
        };
        let ctx = self.migration_context();
        let loaded = self
            .snapshots
            .load_latest(db.as_ref(), &mut self.store, ctx)
            .await?;
        Ok(loaded.map(|s| s.id))
    }

    /// Restore a saved snapshot. `Ok(false)` when it does not exist or no
    /// store is attached.
    pub async fn load_snapshot(&mut self, id: &SnapshotId) -> Result<bool, Notice> {
        self.oplog
            .record_executed(Operation::SnapshotSwitch, self.clock.wall_ms());
        let Some(db) = self.db.clone() else {
            return Ok(false);
        };
        let ctx = self.migration_context();
        match self.snapshots.load(db.as_ref(), &mut self.store, id, ctx).await {
            Ok(found) => Ok(found.is_some()),
            Err(e) => Err(Notice::from_error("Could not load snapshot", &e)),
        }
    }

    /// Restore the newest snapshot, if any.
    pub async fn load_latest_snapshot(&mut self) -> Result<Option<SnapshotId>, Notice> {
        self.load_latest_from_store()
            .await
            .map_err(|e| Notice::from_error("Could not load snapshot", &e))
    }

    /// Saved snapshots, oldest first. Empty without a store.
    pub async fn list_snapshots(&self) -> Result<Vec<Snapshot>, Notice> {
        let Some(db) = &self.db else {
            return Ok(Vec::new());
        };
        self.snapshots
            .list(db.as_ref(), self.migration_context())
            .await
            .map_err(|e| Notice::from_error("Could not list snapshots", &e))
    }

    /// Ids of saved snapshots that show at least one selected stroke.
    pub async fn snapshots_containing_selection(&self) -> Result<Vec<SnapshotId>, Notice> {
        let snapshots = self.list_snapshots().await?;
        Ok(snapshots_containing(
            &snapshots,
            self.store.strokes(),
            &self.selection,
        ))
    }

    /// Export every persisted stroke and snapshot plus the operation log.
    pub async fn export_document(&mut self) -> Result<ExportDocument, Notice> {
        self.oplog.record(Operation::Export, self.clock.wall_ms());
        let db = self.db.clone().ok_or_else(|| {
            Notice::from_error("Could not export", &SketchError::StoreUnavailable)
        })?;
        interchange::export_document(
            db.as_ref(),
            Some(self.oplog.clone()),
            self.migration_context(),
        )
        .await
        .map_err(|e| Notice::from_error("Could not export", &e))
    }

    /// Replace the whole document with an export document.
    ///
    /// A document that does not parse leaves everything untouched. On
    /// success the operation log is reset, strokes are reloaded and the
    /// newest imported snapshot is loaded.
    pub async fn import_document(&mut self, text: &str) -> Result<ImportSummary, Notice> {
        self.oplog.record_click(Operation::Import, self.clock.wall_ms());
        let db = self.db.clone().ok_or_else(|| {
            Notice::from_error("Could not import", &SketchError::StoreUnavailable)
        })?;
        let document = interchange::import_document(db.as_ref(), text, self.migration_context())
            .await
            .map_err(|e| {
                if e.is_rejected_input() {
                    Notice::from_error("Import rejected, nothing was changed", &e)
                } else {
                    Notice::from_error("Import failed partway", &e)
                }
            })?;

        self.oplog.reset();
        self.gesture = Gesture::Idle;
        self.selection.clear();
        self.snapshots.forget_current();
        self.reload()
            .await
            .map_err(|e| Notice::from_error("Import failed partway", &e))?;
        self.load_latest_from_store()
            .await
            .map_err(|e| Notice::from_error("Import failed partway", &e))?;

        Ok(ImportSummary {
            strokes: document.paths.len(),
            snapshots: document.snapshots.len(),
        })
    }

    // ---- scenes ----

    pub fn timeline_viewport(&self) -> TimelineViewport {
        TimelineViewport::new(
            self.settings.timeline_width as f64,
            self.settings.canvas_height as f64,
        )
    }

    /// Compacted layout of the current stroke list.
    pub fn timeline_layout(&self) -> TimelineLayout {
        compute_layout(
            self.store.strokes(),
            self.settings.canvas_width as f64,
            self.timeline_viewport(),
        )
    }

    pub fn canvas_scene(&self) -> CanvasScene<'_> {
        let lasso = match &self.gesture {
            Gesture::CanvasLasso { start, end } => Some((*start, *end)),
            _ => None,
        };
        CanvasScene {
            strokes: self.store.strokes(),
            transforms: self.store.transforms(),
            selection: &self.selection,
            view_offset: self.view_offset,
            reveal_inactive: self.reveal_inactive(),
            lasso,
            overlay: self.overlay.staged(),
        }
    }

    pub fn timeline_scene<'a>(&'a self, layout: &'a TimelineLayout) -> TimelineScene<'a> {
        let lasso = match &self.gesture {
            Gesture::TimelineLasso { start, end } => Some((*start, *end)),
            _ => None,
        };
        TimelineScene {
            layout,
            strokes: self.store.strokes(),
            selection: &self.selection,
            lasso,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronosketch_common::clock::ManualClock;

    fn session() -> (SketchSession, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000, 0.0));
        let session = SketchSession::new(&AppConfig::default(), clock.clone());
        (session, clock)
    }

    fn draw(session: &mut SketchSession, clock: &ManualClock, pts: &[(f64, f64)]) -> Vec<Effect> {
        session.pointer_down(PointerEvent::canvas(pts[0].0, pts[0].1));
        for &(x, y) in &pts[1..] {
            clock.advance(10);
            session.pointer_move(PointerEvent::canvas(x, y));
        }
        let (x, y) = pts[pts.len() - 1];
        session.pointer_up(PointerEvent::canvas(x, y))
    }

    #[test]
    fn test_pen_gesture_commits_stroke() {
        let (mut s, clock) = session();
        let effects = draw(&mut s, &clock, &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        assert_eq!(effects, vec![Effect::PersistPaths, Effect::Redraw]);
        let stroke = &s.strokes()[0];
        assert_eq!(stroke.points.len(), 3);
        assert_eq!(stroke.duration, 20);
        assert!((stroke.length - 20.0).abs() < 1e-9);
        assert!((stroke.speed - 1.0).abs() < 1e-9);
        assert_eq!(s.operation_log().executed(Operation::StrokeDrawn).len(), 1);
    }

    #[test]
    fn test_tap_with_pen_draws_nothing() {
        let (mut s, _clock) = session();
        s.pointer_down(PointerEvent::canvas(5.0, 5.0));
        assert_eq!(s.pointer_up(PointerEvent::canvas(5.0, 5.0)), vec![Effect::Redraw]);
        assert!(s.store().is_empty());
    }

    #[test]
    fn test_drawing_uses_world_coordinates() {
        let (mut s, clock) = session();
        s.set_modifiers(Modifiers { alt: false, space: true });
        s.pointer_down(PointerEvent::canvas(100.0, 100.0));
        s.pointer_move(PointerEvent::canvas(70.0, 60.0));
        s.pointer_up(PointerEvent::canvas(70.0, 60.0));
        assert_eq!(s.view_offset(), Point2D::new(30.0, 40.0));

        s.set_modifiers(Modifiers::default());
        draw(&mut s, &clock, &[(0.0, 0.0), (1.0, 1.0)]);
        assert_eq!(s.strokes()[0].points[0].position(), Point2D::new(30.0, 40.0));
    }

    #[test]
    fn test_lasso_tap_keeps_selection() {
        let (mut s, clock) = session();
        draw(&mut s, &clock, &[(10.0, 10.0), (20.0, 20.0)]);
        s.set_tool(Tool::Lasso);
        s.pointer_down(PointerEvent::canvas(0.0, 0.0));
        s.pointer_up(PointerEvent::canvas(50.0, 50.0));
        assert!(s.selection().contains(0));

        s.pointer_down(PointerEvent::canvas(300.0, 300.0));
        s.pointer_up(PointerEvent::canvas(303.0, 302.0));
        assert!(s.selection().contains(0));

        s.pointer_down(PointerEvent::canvas(300.0, 300.0));
        s.pointer_up(PointerEvent::canvas(400.0, 400.0));
        assert!(s.selection().is_empty());
    }

    #[test]
    fn test_alt_reveals_inactive_for_lasso() {
        let (mut s, clock) = session();
        draw(&mut s, &clock, &[(10.0, 10.0), (20.0, 20.0)]);
        s.toggle_active(0);
        s.set_tool(Tool::Lasso);
        s.pointer_down(PointerEvent::canvas(0.0, 0.0));
        s.pointer_up(PointerEvent::canvas(50.0, 50.0));
        assert!(s.selection().is_empty());

        s.set_modifiers(Modifiers { alt: true, space: false });
        s.pointer_down(PointerEvent::canvas(0.0, 0.0));
        s.pointer_up(PointerEvent::canvas(50.0, 50.0));
        assert!(s.selection().contains(0));
    }

    #[test]
    fn test_move_gesture_materializes_new_stroke() {
        let (mut s, clock) = session();
        draw(&mut s, &clock, &[(10.0, 10.0), (20.0, 20.0)]);
        s.set_tool(Tool::Lasso);
        s.pointer_down(PointerEvent::canvas(0.0, 0.0));
        s.pointer_up(PointerEvent::canvas(50.0, 50.0));

        s.set_tool(Tool::Move);
        s.pointer_down(PointerEvent::canvas(15.0, 15.0));
        s.pointer_move(PointerEvent::canvas(20.0, 15.0));
        s.pointer_move(PointerEvent::canvas(25.0, 35.0));
        let source_id = s.strokes()[0].id.clone();
        assert_eq!(s.store().transform_of(&source_id), Transform::new(10.0, 20.0));

        let effects = s.pointer_up(PointerEvent::canvas(25.0, 35.0));
        assert_eq!(effects, vec![Effect::PersistPaths, Effect::Redraw]);
        assert_eq!(s.strokes().len(), 2);
        assert!(!s.strokes()[0].active);
        let moved = &s.strokes()[1];
        assert_eq!(moved.parent_id.as_ref(), Some(&source_id));
        assert_eq!(moved.points[0].position(), Point2D::new(20.0, 30.0));
        assert_eq!(s.selection().iter().collect::<Vec<_>>(), vec![1]);
        assert!(s.store().transforms().is_empty());
    }

    #[test]
    fn test_move_without_selection_does_nothing() {
        let (mut s, clock) = session();
        draw(&mut s, &clock, &[(10.0, 10.0), (20.0, 20.0)]);
        s.set_tool(Tool::Move);
        assert!(s.pointer_down(PointerEvent::canvas(15.0, 15.0)).is_empty());
        assert!(s.pointer_up(PointerEvent::canvas(30.0, 30.0)).is_empty());
        assert_eq!(s.strokes().len(), 1);
    }

    #[test]
    fn test_tool_switch_drops_gesture() {
        let (mut s, _clock) = session();
        s.pointer_down(PointerEvent::canvas(0.0, 0.0));
        assert!(s.is_busy());
        s.set_tool(Tool::Lasso);
        assert!(!s.is_busy());
        assert!(s.pointer_up(PointerEvent::canvas(10.0, 10.0)).is_empty());
        assert!(s.store().is_empty());
    }

    #[test]
    fn test_timeline_lasso_only_in_lasso_mode() {
        let (mut s, clock) = session();
        draw(&mut s, &clock, &[(0.0, 0.0), (600.0, 0.0)]);
        s.pointer_down(PointerEvent::timeline(0.0, 0.0));
        assert!(!s.is_busy());

        s.set_tool(Tool::Lasso);
        s.pointer_down(PointerEvent::timeline(0.0, 0.0));
        s.pointer_move(PointerEvent::timeline(200.0, 800.0));
        s.pointer_up(PointerEvent::timeline(200.0, 800.0));
        assert!(s.selection().contains(0));
    }

    #[test]
    fn test_isolate_requires_selection() {
        let (mut s, clock) = session();
        draw(&mut s, &clock, &[(0.0, 0.0), (1.0, 1.0)]);
        let effects = s.isolate_selected();
        assert!(matches!(effects.as_slice(), [Effect::Notice(n)] if n.level == crate::effect::NoticeLevel::Warning));
    }

    #[test]
    fn test_undo_prunes_selection() {
        let (mut s, clock) = session();
        draw(&mut s, &clock, &[(10.0, 10.0), (20.0, 20.0)]);
        s.set_tool(Tool::Lasso);
        s.pointer_down(PointerEvent::canvas(0.0, 0.0));
        s.pointer_up(PointerEvent::canvas(50.0, 50.0));
        assert_eq!(s.undo(), vec![Effect::PersistPaths, Effect::Redraw]);
        assert!(s.selection().is_empty());
        assert!(s.undo().is_empty());
        assert_eq!(s.operation_log().clicks(Operation::Undo).len(), 2);
        assert_eq!(s.operation_log().executed(Operation::Undo).len(), 1);
    }

    #[test]
    fn test_save_without_store_reports() {
        let (mut s, _clock) = session();
        let effects = s.save_snapshot();
        assert!(matches!(effects.as_slice(), [Effect::Notice(n)] if n.is_error()));
        assert!(s.current_snapshot().is_none());
    }

    #[test]
    fn test_clear_without_store_still_hides_strokes() {
        let (mut s, clock) = session();
        draw(&mut s, &clock, &[(0.0, 0.0), (1.0, 1.0)]);
        let effects = s.clear();
        assert_eq!(effects, vec![Effect::PersistPaths, Effect::Redraw]);
        assert!(s.strokes().iter().all(|st| !st.active));
    }

    #[test]
    fn test_canvas_scene_reports_lasso() {
        let (mut s, _clock) = session();
        s.set_tool(Tool::Lasso);
        s.pointer_down(PointerEvent::canvas(1.0, 2.0));
        s.pointer_move(PointerEvent::canvas(30.0, 40.0));
        let scene = s.canvas_scene();
        assert_eq!(scene.lasso, Some((Point2D::new(1.0, 2.0), Point2D::new(30.0, 40.0))));
    }

    #[test]
    fn test_overlay_select_is_idempotent() {
        let (mut s, _clock) = session();
        let doc = r#"{
            "paths": [
                {"id": "p1", "points": [{"x": 0, "y": 0}, {"x": 10, "y": 0}]},
                {"id": "p2", "points": [{"x": 0, "y": 5}, {"x": 10, "y": 5}]}
            ],
            "snapshots": [
                {"id": "snapshot-a", "timestamp": "2024-01-01T00:00:00Z", "activeIds": ["p1"]},
                {"id": "snapshot-b", "timestamp": "2024-02-01T00:00:00Z", "activeIds": ["p2"]}
            ]
        }"#;
        assert_eq!(s.load_overlay(doc), vec![Effect::Redraw]);
        let a = SnapshotId::new("snapshot-a");
        let b = SnapshotId::new("snapshot-b");

        assert!(s.deselect_overlay_snapshot(&b));
        assert!(s.select_overlay_snapshot(&a));
        assert!(s.select_overlay_snapshot(&a));
        assert_eq!(s.overlay().selected().iter().collect::<Vec<_>>(), vec![&a]);
        assert_eq!(s.overlay().staged().len(), 1);
        assert!(!s.select_overlay_snapshot(&SnapshotId::new("snapshot-missing")));
        assert!(!s.deselect_overlay_snapshot(&b));
    }
}
