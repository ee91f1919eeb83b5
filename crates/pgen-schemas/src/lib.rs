//! pgen-schemas
//!
//! Shared value types for the pattern generator:
//! - item / fluid stacks and the recipe entry that carries them
//! - the encoded artifact persisted per requester
//! - the conflict window / selection wire messages
//!
//! Pure data. No IO, no host integration. Every type is serde-serializable so the
//! transport and storage layers can pick any format.

mod artifact;
mod recipe;
mod stack;
mod wire;

pub use artifact::{ArtifactDetail, EncodedStack, GeneratedArtifact, NATIVE_STACK_LIMIT};
pub use recipe::RecipeEntry;
pub use stack::{FluidStack, ItemKey, ItemStack};
pub use wire::{CandidateSummary, ConflictWindow, SummaryLine, WindowGroup, WindowSelection};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identity of whoever initiated a generation request.
///
/// Sessions and stored batches are both keyed by this value; at most one of each
/// exists per requester at a time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterId(pub Uuid);

impl RequesterId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Fresh random identity (tests, ad-hoc CLI runs).
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Stable identity derived from a human-readable name.
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequesterId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}
