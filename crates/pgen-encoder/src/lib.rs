//! pgen-encoder
//!
//! Turns finalized recipes into [`GeneratedArtifact`]s.
//!
//! # Invariants
//! - Zero-quantity inputs are catalytic and never encoded as inputs.
//! - Counts above the native stack limit carry an equal wide counter.
//! - Fluids go through [`StackCodec::fluid_to_item`]; an absent capability
//!   drops the fluid, not the recipe.
//! - An artifact always has at least one input and one output. Anything else
//!   is skipped and counted, never an error.
//!
//! [`GeneratedArtifact`]: pgen_schemas::GeneratedArtifact

mod codec;
mod encoder;
mod replace;

pub use codec::{FluidDropCodec, PlainCodec, StackCodec};
pub use encoder::{EncodeReport, Encoder};
pub use replace::{load_rules_file, TagReplacer, TagRule};
