//! The persistence collaborator: an async key-value document store.
//!
//! Records are JSON objects keyed by their `id` field. Two implementations
//! ship with the engine: [`MemoryStore`] for tests and embedding, and
//! [`JsonDirStore`], one `<id>.json` file per record in a directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chronosketch_common::error::{SketchError, SketchResult};
use chronosketch_model::{
    chronological, is_snapshot_key, MigrationContext, Record, Snapshot, SnapshotId, Stroke,
    PATHS_RECORD_ID,
};
use serde_json::Value;
use tokio::sync::RwLock;

/// Abstract async key-value document store.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the record named by its `id` field.
    async fn put(&self, record: Value) -> SketchResult<()>;

    /// Fetch one record.
    async fn get(&self, id: &str) -> SketchResult<Option<Value>>;

    /// Fetch every record.
    async fn get_all(&self) -> SketchResult<Vec<Value>>;

    /// Remove every record.
    async fn clear(&self) -> SketchResult<()>;
}

fn record_id(record: &Value) -> SketchResult<String> {
    record
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SketchError::persistence("record has no string id"))
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn put(&self, record: Value) -> SketchResult<()> {
        let id = record_id(&record)?;
        self.records.write().await.insert(id, record);
        Ok(())
    }

    async fn get(&self, id: &str) -> SketchResult<Option<Value>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn get_all(&self) -> SketchResult<Vec<Value>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn clear(&self) -> SketchResult<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

/// Directory-backed store: one pretty-printed JSON file per record.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> SketchResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            SketchError::persistence(format!("cannot create {}: {e}", root.display()))
        })?;
        tracing::debug!(root = %root.display(), "Opened document store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(id)))
    }

    async fn record_files(&self) -> SketchResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// File name stem for a record id.
///
/// ASCII letters, digits and `-` pass through; every other byte becomes
/// `_` plus two hex digits, so distinct ids never share a file.
fn file_stem(id: &str) -> String {
    let mut stem = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("_{byte:02x}"));
        }
    }
    stem
}

#[async_trait::async_trait]
impl DocumentStore for JsonDirStore {
    async fn put(&self, record: Value) -> SketchResult<()> {
        let id = record_id(&record)?;
        let path = self.path_for(&id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(&record)?;
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            SketchError::persistence(format!("cannot write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            SketchError::persistence(format!("cannot replace {}: {e}", path.display()))
        })?;
        Ok(())
    }

    async fn get(&self, id: &str) -> SketchResult<Option<Value>> {
        let path = self.path_for(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SketchError::persistence(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn get_all(&self) -> SketchResult<Vec<Value>> {
        let mut records = Vec::new();
        for path in self.record_files().await? {
            let parsed = match tokio::fs::read(&path).await {
                Ok(bytes) => serde_json::from_slice::<Value>(&bytes).map_err(SketchError::from),
                Err(e) => Err(SketchError::from(e)),
            };
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable record");
                }
            }
        }
        Ok(records)
    }

    async fn clear(&self) -> SketchResult<()> {
        for path in self.record_files().await? {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }
}

/// Encode and store one record.
pub async fn put_record(db: &dyn DocumentStore, record: &Record) -> SketchResult<()> {
    db.put(record.to_value()?).await
}

/// Read and migrate the `paths` record. A missing record is an empty list.
pub async fn load_paths(db: &dyn DocumentStore, ctx: MigrationContext) -> SketchResult<Vec<Stroke>> {
    let Some(value) = db.get(PATHS_RECORD_ID).await? else {
        return Ok(Vec::new());
    };
    match Record::decode(value, ctx) {
        Ok(Record::Paths(paths)) => Ok(paths),
        Ok(other) => Err(SketchError::persistence(format!(
            "record {} is not a paths record",
            other.id()
        ))),
        Err(e) => Err(SketchError::persistence(e.to_string())),
    }
}

/// Read and migrate one snapshot record.
pub async fn load_snapshot(
    db: &dyn DocumentStore,
    id: &SnapshotId,
    ctx: MigrationContext,
) -> SketchResult<Option<Snapshot>> {
    let Some(value) = db.get(id.as_str()).await? else {
        return Ok(None);
    };
    match Record::decode(value, ctx) {
        Ok(Record::Snapshot(snapshot)) => Ok(Some(snapshot)),
        Ok(_) => Ok(None),
        Err(e) => Err(SketchError::persistence(e.to_string())),
    }
}

/// Read and migrate every snapshot record, oldest first.
///
/// Records that fail to decode are skipped with a warning.
pub async fn load_snapshots(db: &dyn DocumentStore, ctx: MigrationContext) -> SketchResult<Vec<Snapshot>> {
    let mut snapshots = Vec::new();
    for value in db.get_all().await? {
        let is_snapshot = value
            .get("id")
            .and_then(Value::as_str)
            .map_or(false, is_snapshot_key);
        if !is_snapshot {
            continue;
        }
        match Record::decode(value, ctx) {
            Ok(Record::Snapshot(snapshot)) => snapshots.push(snapshot),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Skipping undecodable snapshot record"),
        }
    }
    snapshots.sort_by(chronological);
    Ok(snapshots)
}
