use std::fmt;

use pgen_conflict::{ResendReason, SessionFault};
use pgen_schemas::ConflictWindow;

/// Stage counts from one pass of collect -> filter -> dedupe -> group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub categories: Vec<String>,
    pub collected: usize,
    pub after_filter: usize,
    pub unique: usize,
    pub dropped_outputless: usize,
    pub unambiguous: usize,
    pub conflict_groups: usize,
}

/// Dry-run result. Nothing is created, debited, or written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewReport {
    pub keyword: String,
    pub filters: String,
    pub stats: PipelineStats,
}

/// What a successful finalization produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationReport {
    pub source: String,
    /// Recipes handed to the encoder.
    pub recipes: usize,
    /// Artifacts persisted (and blank units debited).
    pub encoded: usize,
    pub skipped: usize,
    pub fluids_dropped: usize,
    /// Supply that paid; `None` only for a zero-cost batch.
    pub debited_from: Option<String>,
}

/// Why a request produced nothing. Every variant says which stage came up
/// empty or what was required against what was available.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationRejection {
    EmptyKeyword,
    NoCategory {
        keyword: String,
    },
    NoRecipes {
        keyword: String,
        categories: Vec<String>,
    },
    NothingMatched {
        collected: usize,
        filters: String,
    },
    SessionActive,
    UnconsumedBatch {
        count: usize,
    },
    NothingEncoded {
        recipes: usize,
    },
    Insufficient {
        required: u64,
        available: u64,
    },
}

impl fmt::Display for GenerationRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationRejection::EmptyKeyword => write!(f, "no category keyword given"),
            GenerationRejection::NoCategory { keyword } => {
                write!(f, "no recipe category matches '{keyword}'")
            }
            GenerationRejection::NoRecipes { keyword, categories } => write!(
                f,
                "'{keyword}' matched {} but they hold no recipes",
                categories.join(", ")
            ),
            GenerationRejection::NothingMatched { collected, filters } => write!(
                f,
                "{collected} recipes collected, none passed filters ({filters})"
            ),
            GenerationRejection::SessionActive => {
                write!(f, "a conflict selection is already in progress")
            }
            GenerationRejection::UnconsumedBatch { count } => write!(
                f,
                "storage still holds {count} generated patterns; extract or clear them first"
            ),
            GenerationRejection::NothingEncoded { recipes } => write!(
                f,
                "none of {recipes} recipes could be encoded (each needs an input and an output)"
            ),
            GenerationRejection::Insufficient {
                required,
                available,
            } => write!(
                f,
                "insufficient blank resources: need {required}, have {available}"
            ),
        }
    }
}

impl std::error::Error for GenerationRejection {}

/// Result of a generation request that did not hit a persistence error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// No conflicts; the batch is already persisted.
    Generated {
        stats: PipelineStats,
        report: GenerationReport,
    },
    /// A session was opened. Answer this window with a selection.
    NeedsSelection {
        stats: PipelineStats,
        window: ConflictWindow,
    },
    Rejected(GenerationRejection),
}

/// Result of routing one selection reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// No live session; the reply was dropped.
    NoSession,
    Window(ConflictWindow),
    Resend {
        reason: ResendReason,
        window: ConflictWindow,
    },
    /// All groups resolved and the batch persisted.
    Generated(GenerationReport),
    /// All groups resolved but finalization refused. The session is gone.
    Rejected(GenerationRejection),
    Cancelled,
    IgnoredStale,
    Aborted(SessionFault),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_names_both_sides() {
        let msg = GenerationRejection::Insufficient {
            required: 6,
            available: 5,
        }
        .to_string();
        assert!(msg.contains("need 6"));
        assert!(msg.contains("have 5"));
    }

    #[test]
    fn nothing_matched_names_the_filters() {
        let msg = GenerationRejection::NothingMatched {
            collected: 12,
            filters: "output tag 'ingot'".to_string(),
        }
        .to_string();
        assert!(msg.starts_with("12 recipes collected"));
        assert!(msg.contains("ingot"));
    }
}
