//! pgen-runtime
//!
//! [`GenerationService`] wires the pipeline crates into one control flow:
//!
//! ```text
//! catalog -> filter chain -> dedupe -> group
//!     no conflicts: encode -> debit -> store
//!     conflicts:    session + window round-trips, then encode -> debit -> store once
//! ```
//!
//! # Invariants
//! - One live session per requester; generation is refused while a session
//!   exists or while the requester's store still holds a batch.
//! - Debit happens after encoding and before persistence. A refused debit
//!   discards the encoded batch and leaves the store untouched.
//! - User-input and resource problems come back as [`GenerationRejection`]
//!   values inside an outcome; only persistence failures are `Err`.

mod outcome;
mod service;

pub use outcome::{
    ExchangeOutcome, GenerationOutcome, GenerationRejection, GenerationReport, PipelineStats,
    PreviewReport,
};
pub use service::{GenerationRequest, GenerationService};
