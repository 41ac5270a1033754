//! The Snapshot Manager: capture, apply, and look up saved active sets.

use chronosketch_common::clock::Clock;
use chronosketch_common::error::SketchResult;
use chronosketch_model::{latest, MigrationContext, Point2D, Snapshot, SnapshotId};
use chronosketch_render::render_snapshot_preview;

use crate::persistence::{load_snapshot, load_snapshots, DocumentStore};
use crate::store::StrokeStore;

/// Creates snapshots from the live store and restores them into it.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    preview_width: u32,
    preview_height: u32,
    current: Option<SnapshotId>,
    last_minted: Option<SnapshotId>,
    collisions: usize,
}

impl SnapshotManager {
    /// Previews are rendered at the canvas size.
    pub fn new(preview_width: u32, preview_height: u32) -> Self {
        Self {
            preview_width,
            preview_height,
            current: None,
            last_minted: None,
            collisions: 0,
        }
    }

    /// The snapshot most recently saved or loaded.
    pub fn current(&self) -> Option<&SnapshotId> {
        self.current.as_ref()
    }

    pub fn forget_current(&mut self) {
        self.current = None;
    }

    /// `snapshot-<ms>`, with a `-N` suffix when the same millisecond was
    /// already used by this manager.
    fn mint_id(&mut self, wall_ms: i64) -> SnapshotId {
        let base = SnapshotId::at(wall_ms);
        let same_ms = self
            .last_minted
            .as_ref()
            .map_or(false, |last| last.as_str() == base.as_str());
        let id = if same_ms {
            self.collisions += 1;
            SnapshotId::new(format!("{base}-{}", self.collisions))
        } else {
            self.collisions = 0;
            base.clone()
        };
        self.last_minted = Some(base);
        id
    }

    /// Freeze the store's active set and transforms into a new snapshot.
    ///
    /// The preview shows active strokes only. A preview that fails to
    /// render is left out rather than failing the capture.
    pub fn capture(&mut self, store: &StrokeStore, view_offset: Point2D, clock: &dyn Clock) -> Snapshot {
        let id = self.mint_id(clock.wall_ms());
        let preview = match render_snapshot_preview(
            store.strokes(),
            store.transforms(),
            view_offset,
            self.preview_width,
            self.preview_height,
        ) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(snapshot = %id, error = %e, "Preview render failed");
                None
            }
        };
        let snapshot = Snapshot {
            id: id.clone(),
            timestamp: clock.now_utc(),
            active_ids: store.active_ids(),
            preview,
            transforms: store.transforms().clone(),
            original_snapshot_id: None,
        };
        self.current = Some(id);
        tracing::info!(
            snapshot = %snapshot.id,
            active = snapshot.active_ids.len(),
            "Captured snapshot"
        );
        snapshot
    }

    /// Restore a snapshot: exactly its ids become active and its transforms
    /// replace the live map. Ids with no matching stroke are skipped.
    pub fn apply(&mut self, store: &mut StrokeStore, snapshot: &Snapshot) {
        let matched = store.apply_active_set(&snapshot.active_ids);
        store.replace_transforms(snapshot.transforms.clone());
        self.current = Some(snapshot.id.clone());
        tracing::debug!(
            snapshot = %snapshot.id,
            matched,
            missing = snapshot.active_ids.len().saturating_sub(matched),
            "Loaded snapshot"
        );
    }

    /// Every snapshot in the store, oldest first.
    pub async fn list(&self, db: &dyn DocumentStore, ctx: MigrationContext) -> SketchResult<Vec<Snapshot>> {
        load_snapshots(db, ctx).await
    }

    /// Load one snapshot by id. `Ok(None)` when there is no such record.
    pub async fn load(
        &mut self,
        db: &dyn DocumentStore,
        store: &mut StrokeStore,
        id: &SnapshotId,
        ctx: MigrationContext,
    ) -> SketchResult<Option<Snapshot>> {
        let Some(snapshot) = load_snapshot(db, id, ctx).await? else {
            tracing::debug!(snapshot = %id, "Snapshot not found");
            return Ok(None);
        };
        self.apply(store, &snapshot);
        Ok(Some(snapshot))
    }

    /// Load the newest snapshot, if any.
    pub async fn load_latest(
        &mut self,
        db: &dyn DocumentStore,
        store: &mut StrokeStore,
        ctx: MigrationContext,
    ) -> SketchResult<Option<Snapshot>> {
        let snapshots = load_snapshots(db, ctx).await?;
        let Some(snapshot) = latest(&snapshots).cloned() else {
            return Ok(None);
        };
        self.apply(store, &snapshot);
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{put_record, MemoryStore};
    use chronosketch_common::clock::ManualClock;
    use chronosketch_model::{PenStyle, Point, Record, Stroke, StrokeId, Transform, TransformMap};

    const CTX: MigrationContext = MigrationContext { now_abs: 0.0 };

    fn store_with(ids: &[&str]) -> StrokeStore {
        let mut store = StrokeStore::new();
        for (i, id) in ids.iter().enumerate() {
            let t0 = i as f64 * 10.0;
            let stroke = Stroke::freehand(
                StrokeId::new(*id),
                vec![Point::new(5.0, 5.0, t0), Point::new(30.0, 30.0, t0 + 5.0)],
                &PenStyle::default(),
                t0 as i64,
                t0 as i64 + 5,
            )
            .unwrap();
            store.append(stroke).unwrap();
        }
        store
    }

    #[test]
    fn test_capture_then_apply_is_identity() {
        let clock = ManualClock::new(1_700_000_000_000, 0.0);
        let mut manager = SnapshotManager::new(64, 64);
        let mut store = store_with(&["a", "b", "c"]);
        store.set_active(1, false);
        store.commit_transform([&StrokeId::new("c")], &TransformMap::new(), Transform::new(4.0, 2.0));

        let snap = manager.capture(&store, Point2D::default(), &clock);
        assert_eq!(snap.id.as_str(), "snapshot-1700000000000");
        assert!(snap.preview.as_deref().unwrap().starts_with("data:image/png;base64,"));

        let before: Vec<bool> = store.strokes().iter().map(|s| s.active).collect();
        let transforms = store.transforms().clone();
        manager.apply(&mut store, &snap);
        let after: Vec<bool> = store.strokes().iter().map(|s| s.active).collect();
        assert_eq!(before, after);
        assert_eq!(&transforms, store.transforms());
        assert_eq!(manager.current(), Some(&snap.id));
    }

    #[test]
    fn test_same_millisecond_ids_get_suffix() {
        let clock = ManualClock::new(5, 0.0);
        let mut manager = SnapshotManager::new(8, 8);
        let store = store_with(&["a"]);
        let first = manager.capture(&store, Point2D::default(), &clock);
        let second = manager.capture(&store, Point2D::default(), &clock);
        let third = manager.capture(&store, Point2D::default(), &clock);
        assert_eq!(first.id.as_str(), "snapshot-5");
        assert_eq!(second.id.as_str(), "snapshot-5-1");
        assert_eq!(third.id.as_str(), "snapshot-5-2");
        clock.advance(1);
        assert_eq!(manager.capture(&store, Point2D::default(), &clock).id.as_str(), "snapshot-6");
    }

    #[tokio::test]
    async fn test_load_latest_and_by_id() {
        let clock = ManualClock::new(1_000, 0.0);
        let db = MemoryStore::new();
        let mut manager = SnapshotManager::new(8, 8);
        let mut store = store_with(&["a", "b"]);

        store.set_active(0, false);
        let older = manager.capture(&store, Point2D::default(), &clock);
        put_record(&db, &Record::Snapshot(older.clone())).await.unwrap();

        clock.advance(500);
        store.set_active(0, true);
        store.set_active(1, false);
        let newer = manager.capture(&store, Point2D::default(), &clock);
        put_record(&db, &Record::Snapshot(newer.clone())).await.unwrap();

        let loaded = manager.load(&db, &mut store, &older.id, CTX).await.unwrap().unwrap();
        assert_eq!(loaded.id, older.id);
        assert!(!store.get(0).unwrap().active);
        assert!(store.get(1).unwrap().active);

        let latest = manager.load_latest(&db, &mut store, CTX).await.unwrap().unwrap();
        assert_eq!(latest.id, newer.id);
        assert!(store.get(0).unwrap().active);
        assert!(!store.get(1).unwrap().active);

        let missing = SnapshotId::new("snapshot-404");
        assert!(manager.load(&db, &mut store, &missing, CTX).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_latest_without_snapshots_is_noop() {
        let db = MemoryStore::new();
        let mut manager = SnapshotManager::new(8, 8);
        let mut store = store_with(&["a"]);
        assert!(manager.load_latest(&db, &mut store, CTX).await.unwrap().is_none());
        assert!(store.get(0).unwrap().active);
        assert!(manager.current().is_none());
    }
}
