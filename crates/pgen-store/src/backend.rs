use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pgen_schemas::{GeneratedArtifact, RequesterId};

pub const STORE_SCHEMA_VERSION: i32 = 1;

/// Persisted form of a requester's batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBatch {
    pub schema_version: i32,
    pub requester: RequesterId,
    /// Label of what generated the batch (usually the category keyword).
    pub source: String,
    pub created_at_utc: DateTime<Utc>,
    pub artifacts: Vec<GeneratedArtifact>,
}

/// Key-value persistence adapter.
pub trait StoreBackend: Send + Sync {
    fn write(&self, key: &RequesterId, batch: &StoredBatch) -> Result<()>;

    /// `Ok(None)` when nothing is stored for `key`.
    fn read(&self, key: &RequesterId) -> Result<Option<StoredBatch>>;

    /// Deleting a missing key is not an error.
    fn delete(&self, key: &RequesterId) -> Result<()>;
}

// ---------------------------------------------------------------------------
// FileBackend
// ---------------------------------------------------------------------------

/// One JSON file per requester. Writes go to a temp file that is renamed over
/// the target, so a crash never leaves a half-written batch.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &RequesterId) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StoreBackend for FileBackend {
    fn write(&self, key: &RequesterId, batch: &StoredBatch) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create storage dir failed: {}", self.dir.display()))?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        let json = serde_json::to_string_pretty(batch).context("serialize stored batch failed")?;
        fs::write(&tmp, format!("{json}\n"))
            .with_context(|| format!("write temp batch failed: {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("replace batch failed: {}", path.display()))?;
        Ok(())
    }

    fn read(&self, key: &RequesterId) -> Result<Option<StoredBatch>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&path)
            .with_context(|| format!("read batch failed: {}", path.display()))?;
        if s.trim().is_empty() {
            return Ok(None);
        }
        let batch: StoredBatch = serde_json::from_str(&s)
            .with_context(|| format!("parse batch failed: {}", path.display()))?;
        if batch.schema_version > STORE_SCHEMA_VERSION {
            bail!(
                "batch {} has schema_version {}, newest supported is {}",
                path.display(),
                batch.schema_version,
                STORE_SCHEMA_VERSION
            );
        }
        Ok(Some(batch))
    }

    fn delete(&self, key: &RequesterId) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("delete batch failed: {}", path.display()))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

/// In-memory backend. `fail_writes(true)` makes every write and delete fail.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<HashMap<RequesterId, StoredBatch>>,
    failing: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("memory backend: injected write failure");
        }
        Ok(())
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<RequesterId, StoredBatch>> {
        self.records.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl StoreBackend for MemoryBackend {
    fn write(&self, key: &RequesterId, batch: &StoredBatch) -> Result<()> {
        self.check()?;
        self.records().insert(*key, batch.clone());
        Ok(())
    }

    fn read(&self, key: &RequesterId) -> Result<Option<StoredBatch>> {
        Ok(self.records().get(key).cloned())
    }

    fn delete(&self, key: &RequesterId) -> Result<()> {
        self.check()?;
        self.records().remove(key);
        Ok(())
    }
}
