//! pgen-store
//!
//! Durable per-requester store of generated artifacts.
//!
//! # Layout (file backend)
//! ```text
//! <storage dir>/
//!   <requester uuid>.json   StoredBatch (schema_version, source, created_at_utc, artifacts)
//! ```
//!
//! # Invariants
//! - One batch per requester; `save` overwrites it whole.
//! - Every mutation is written through the backend before it returns `Ok`.
//!   A failed write returns `Err` and leaves the previous record in place.
//! - An operation that leaves zero artifacts deletes the record.
//! - IO happens under the requester's own lock only.

mod backend;
mod store;

pub use backend::{FileBackend, MemoryBackend, StoreBackend, StoredBatch, STORE_SCHEMA_VERSION};
pub use store::{OutputStore, StoragePage, StorageSummary};
