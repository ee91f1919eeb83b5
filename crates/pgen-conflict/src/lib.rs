//! pgen-conflict
//!
//! Everything between "filtered recipe list" and "final recipe list":
//! - [`dedupe`]: drop structurally identical recipes, first seen wins
//! - [`group`]: split by primary output into unambiguous recipes and conflict groups
//! - [`ConflictSession`]: per-requester selection state machine
//! - [`SessionRegistry`]: requester → session map with per-key locking
//! - [`BatchProtocol`]: bounded windows + staleness token over a session
//!
//! No IO. The registry is the only place that holds locks.

mod dedupe;
mod grouper;
mod protocol;
mod registry;
mod session;

pub use dedupe::{dedupe, structural_key, StructuralKey};
pub use grouper::{group, ConflictGroup, Grouping};
pub use protocol::{BatchProtocol, ProtocolStep, ResendReason, DEFAULT_WINDOW_CAPACITY};
pub use registry::{Exchange, RegistryError, SessionHandle, SessionRegistry};
pub use session::{BatchError, ConflictSession, SelectionError, SessionFault, SessionState};
