//! Persistence boundary: the external store interface, two in-tree
//! implementations, and the fire-and-forget background writer.
//!
//! The registry mirrors every mutation here, but in-memory state stays
//! authoritative: a failing store is logged and gameplay continues. No
//! simulation-thread code path ever awaits a write.

use crate::record::RecordBlob;
use log::warn;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Durable record store consumed by the registry.
///
/// Implementations must tolerate being called concurrently and must treat
/// `delete` of an absent hash as success (removal paths can race).
pub trait PersistenceStore: Send + Sync {
    /// Load every stored blob. Malformed entries should be skipped by the
    /// implementation, not turned into a global failure.
    fn load_all(&self) -> PersistResult<Vec<RecordBlob>>;

    /// Insert or overwrite one blob, keyed by its hash.
    fn save(&self, blob: &RecordBlob) -> PersistResult<()>;

    /// Remove one blob. Absent keys are not an error.
    fn delete(&self, hash: &str) -> PersistResult<()>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// HashMap-backed store for tests and embedding hosts that flush
/// elsewhere.
#[derive(Default)]
pub struct InMemoryStore {
    blobs: RwLock<HashMap<String, RecordBlob>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    pub fn get(&self, hash: &str) -> Option<RecordBlob> {
        self.blobs.read().get(hash).cloned()
    }
}

impl PersistenceStore for InMemoryStore {
    fn load_all(&self) -> PersistResult<Vec<RecordBlob>> {
        Ok(self.blobs.read().values().cloned().collect())
    }

    fn save(&self, blob: &RecordBlob) -> PersistResult<()> {
        self.blobs.write().insert(blob.hash.clone(), blob.clone());
        Ok(())
    }

    fn delete(&self, hash: &str) -> PersistResult<()> {
        self.blobs.write().remove(hash);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// Whole-document JSON store used by the host binary.
///
/// The full blob map is rewritten on every save; waystone counts are
/// small enough that compaction beats an append log here.
pub struct JsonFileStore {
    path: PathBuf,
    blobs: RwLock<HashMap<String, RecordBlob>>,
}

impl JsonFileStore {
    /// Open (or create on first save) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> PersistResult<Self> {
        let path = path.into();
        let blobs = match std::fs::read_to_string(&path) {
            Ok(text) => {
                let list: Vec<RecordBlob> = serde_json::from_str(&text)?;
                list.into_iter().map(|b| (b.hash.clone(), b)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            blobs: RwLock::new(blobs),
        })
    }

    fn flush(&self, blobs: &HashMap<String, RecordBlob>) -> PersistResult<()> {
        let mut list: Vec<&RecordBlob> = blobs.values().collect();
        list.sort_by(|a, b| a.hash.cmp(&b.hash));
        let text = serde_json::to_string_pretty(&list)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

impl PersistenceStore for JsonFileStore {
    fn load_all(&self) -> PersistResult<Vec<RecordBlob>> {
        Ok(self.blobs.read().values().cloned().collect())
    }

    fn save(&self, blob: &RecordBlob) -> PersistResult<()> {
        let mut blobs = self.blobs.write();
        blobs.insert(blob.hash.clone(), blob.clone());
        self.flush(&blobs)
    }

    fn delete(&self, hash: &str) -> PersistResult<()> {
        let mut blobs = self.blobs.write();
        if blobs.remove(hash).is_some() {
            self.flush(&blobs)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fire-and-forget writer
// ---------------------------------------------------------------------------

/// A single mirrored mutation.
#[derive(Debug, Clone)]
pub enum PersistOp {
    Save(RecordBlob),
    Delete(String),
}

/// Cheap, cloneable sender the registry uses to mirror mutations.
///
/// Sends never block; if the writer is gone (shutdown) or was never
/// started ([`PersistenceHandle::disabled`]) the op is dropped silently.
/// In-memory state is authoritative either way.
#[derive(Clone, Default)]
pub struct PersistenceHandle {
    tx: Option<mpsc::UnboundedSender<PersistOp>>,
}

impl PersistenceHandle {
    /// A handle that discards every op. For tests and hosts that flush
    /// synchronously via [`crate::registry::WaystoneRegistry::save_all`].
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn save(&self, blob: RecordBlob) {
        self.send(PersistOp::Save(blob));
    }

    pub fn delete(&self, hash: String) {
        self.send(PersistOp::Delete(hash));
    }

    fn send(&self, op: PersistOp) {
        if let Some(tx) = &self.tx {
            if let Err(dropped) = tx.send(op) {
                warn!("Persistence writer is gone; dropping {}", op_kind(&dropped.0));
            }
        }
    }
}

fn op_kind(op: &PersistOp) -> &'static str {
    match op {
        PersistOp::Save(_) => "save",
        PersistOp::Delete(_) => "delete",
    }
}

/// Background task draining [`PersistOp`]s into a store.
pub struct PersistenceWriter;

impl PersistenceWriter {
    /// Spawn the writer on the current tokio runtime.
    ///
    /// The task ends once every [`PersistenceHandle`] clone is dropped and
    /// the channel drains, so holding the [`JoinHandle`] until shutdown
    /// gives a clean final flush.
    pub fn spawn(store: Arc<dyn PersistenceStore>) -> (PersistenceHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<PersistOp>();
        let task = tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                let result = match &op {
                    PersistOp::Save(blob) => store.save(blob),
                    PersistOp::Delete(hash) => store.delete(hash),
                };
                if let Err(e) = result {
                    // In-memory state remains authoritative for the session.
                    warn!("Persistence {} failed: {}", op_kind(&op), e);
                }
            }
        });
        (PersistenceHandle { tx: Some(tx) }, task)
    }
}
