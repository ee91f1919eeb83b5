use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use pgen_schemas::{ArtifactDetail, GeneratedArtifact, RequesterId};

use crate::backend::{StoreBackend, StoredBatch, STORE_SCHEMA_VERSION};

/// Overview of a requester's stored batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageSummary {
    pub count: usize,
    pub source: String,
    pub created_at_utc: Option<DateTime<Utc>>,
    /// Output preview of every artifact, in store order.
    pub previews: Vec<String>,
}

/// One page of previews. Pages are 0-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoragePage {
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
    pub source: String,
    pub created_at_utc: Option<DateTime<Utc>>,
    /// `(store index, preview)`
    pub entries: Vec<(usize, String)>,
}

pub struct OutputStore {
    backend: Arc<dyn StoreBackend>,
    locks: Mutex<HashMap<RequesterId, Arc<Mutex<()>>>>,
}

impl OutputStore {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Per-requester lock. The map lock is released before the caller does IO.
    fn key_lock(&self, key: &RequesterId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(locks.entry(*key).or_default())
    }

    fn guard(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
        lock.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Run `f` under the requester's lock, then drop the map entry if no
    /// other caller holds or waits on it.
    fn with_key<T>(&self, key: &RequesterId, f: impl FnOnce() -> T) -> T {
        let lock = self.key_lock(key);
        let out = {
            let _g = Self::guard(&lock);
            f()
        };
        drop(lock);
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
        out
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    // -----------------------------------------------------------------------
    // Internal, caller holds the key lock
    // -----------------------------------------------------------------------

    /// Read and repair. A repaired batch is written back before returning.
    fn load_locked(&self, key: &RequesterId) -> Result<Option<StoredBatch>> {
        let Some(mut batch) = self.backend.read(key)? else {
            return Ok(None);
        };
        let mut repaired = 0usize;
        for a in &mut batch.artifacts {
            if a.normalize_counts() {
                repaired += 1;
            }
        }
        if repaired > 0 {
            self.backend.write(key, &batch)?;
            tracing::info!(requester = %key, repaired, "stored artifact counts repaired");
        }
        Ok(Some(batch))
    }

    /// Persist `batch`, or delete the record when it holds nothing.
    fn persist_locked(&self, key: &RequesterId, batch: &StoredBatch) -> Result<()> {
        if batch.artifacts.is_empty() {
            self.backend.delete(key)
        } else {
            self.backend.write(key, batch)
        }
    }

    // -----------------------------------------------------------------------
    // Production side
    // -----------------------------------------------------------------------

    /// Replace the requester's batch.
    pub fn save(&self, key: &RequesterId, artifacts: Vec<GeneratedArtifact>, source: &str) -> Result<()> {
        self.with_key(key, || {
            let count = artifacts.len();
            let batch = StoredBatch {
                schema_version: STORE_SCHEMA_VERSION,
                requester: *key,
                source: source.to_string(),
                created_at_utc: Utc::now(),
                artifacts,
            };
            self.persist_locked(key, &batch)?;
            tracing::info!(requester = %key, count, source, "artifact batch saved");
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    pub fn load(&self, key: &RequesterId) -> Result<Vec<GeneratedArtifact>> {
        self.with_key(key, || {
            Ok(self.load_locked(key)?.map(|b| b.artifacts).unwrap_or_default())
        })
    }

    pub fn count(&self, key: &RequesterId) -> Result<usize> {
        Ok(self.load(key)?.len())
    }

    pub fn is_empty(&self, key: &RequesterId) -> Result<bool> {
        Ok(self.count(key)? == 0)
    }

    pub fn summary(&self, key: &RequesterId) -> Result<StorageSummary> {
        let batch = self.with_key(key, || self.load_locked(key))?;
        let Some(batch) = batch else {
            return Ok(StorageSummary::default());
        };
        Ok(StorageSummary {
            count: batch.artifacts.len(),
            source: batch.source,
            created_at_utc: Some(batch.created_at_utc),
            previews: batch.artifacts.iter().map(GeneratedArtifact::output_summary).collect(),
        })
    }

    /// Previews for `page` (0-based). A page past the end has no entries.
    pub fn page(&self, key: &RequesterId, page: usize, page_size: usize) -> Result<StoragePage> {
        let page_size = page_size.max(1);
        let batch = self.with_key(key, || self.load_locked(key))?;
        let Some(batch) = batch else {
            return Ok(StoragePage {
                page,
                ..StoragePage::default()
            });
        };
        let total = batch.artifacts.len();
        let entries = batch
            .artifacts
            .iter()
            .enumerate()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .map(|(i, a)| (i, a.output_summary()))
            .collect();
        Ok(StoragePage {
            page,
            page_count: total.div_ceil(page_size),
            total,
            source: batch.source,
            created_at_utc: Some(batch.created_at_utc),
            entries,
        })
    }

    /// Input/output lines of the artifact at `index`, `None` when out of range.
    pub fn detail(&self, key: &RequesterId, index: usize) -> Result<Option<ArtifactDetail>> {
        Ok(self.load(key)?.get(index).map(GeneratedArtifact::detail))
    }

    // -----------------------------------------------------------------------
    // Consumption side
    // -----------------------------------------------------------------------

    /// Remove and return up to `max` oldest artifacts.
    pub fn extract(&self, key: &RequesterId, max: usize) -> Result<Vec<GeneratedArtifact>> {
        self.with_key(key, || {
            let Some(mut batch) = self.load_locked(key)? else {
                return Ok(Vec::new());
            };
            let n = max.min(batch.artifacts.len());
            if n == 0 {
                return Ok(Vec::new());
            }
            let taken: Vec<_> = batch.artifacts.drain(..n).collect();
            self.persist_locked(key, &batch)?;
            tracing::info!(requester = %key, extracted = taken.len(), remaining = batch.artifacts.len(), "artifacts extracted");
            Ok(taken)
        })
    }

    /// Remove the artifact at `index`. `Ok(None)` when out of range.
    pub fn delete(&self, key: &RequesterId, index: usize) -> Result<Option<GeneratedArtifact>> {
        self.with_key(key, || {
            let Some(mut batch) = self.load_locked(key)? else {
                return Ok(None);
            };
            if index >= batch.artifacts.len() {
                return Ok(None);
            }
            let removed = batch.artifacts.remove(index);
            self.persist_locked(key, &batch)?;
            tracing::info!(requester = %key, index, remaining = batch.artifacts.len(), "artifact deleted");
            Ok(Some(removed))
        })
    }

    pub fn clear(&self, key: &RequesterId) -> Result<()> {
        self.with_key(key, || {
            self.backend.delete(key)?;
            tracing::info!(requester = %key, "artifact batch cleared");
            Ok(())
        })
    }
}
