//! Conflict resolution session.
//!
//! # States
//!
//! ```text
//!   new() ──► Active ──select()──► Active ── ... ──select()──► Complete
//!               │                                              │
//!               └───────────── cancel / finalize ──────────────┴──► (closed)
//! ```
//!
//! # Invariants
//!
//! - The group order is fixed at creation and defines resolution order.
//! - `cursor` only moves forward, by exactly one per accepted selection.
//! - A rejected selection leaves `cursor` and `selections` untouched.
//! - Once closed a session is never reused; the registry drops it.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use pgen_schemas::{RecipeEntry, RequesterId};

use crate::grouper::ConflictGroup;

// ---------------------------------------------------------------------------
// State + errors
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// `cursor < group_count`
    Active,
    /// `cursor == group_count`
    Complete,
}

/// Invariant violation: the current group has no candidates, so no selection
/// can ever be valid. Fatal for the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionFault {
    pub group_index: usize,
    pub key: String,
}

impl fmt::Display for SessionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "conflict group {} ({}) has no candidates",
            self.group_index + 1,
            self.key
        )
    }
}

impl std::error::Error for SessionFault {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionError {
    /// Index outside `0..candidates` for the current group. Recoverable.
    InvalidIndex {
        group_index: usize,
        index: i64,
        candidates: usize,
    },
    /// Session already resolved every group.
    AlreadyComplete,
    /// Current group is empty. Fatal.
    Fault(SessionFault),
}

impl SelectionError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SelectionError::Fault(_))
    }
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::InvalidIndex {
                group_index,
                index,
                candidates,
            } => write!(
                f,
                "invalid choice {index} for group {} (valid: 0..{candidates})",
                group_index + 1
            ),
            SelectionError::AlreadyComplete => write!(f, "all conflicts are already resolved"),
            SelectionError::Fault(fault) => write!(f, "session fault: {fault}"),
        }
    }
}

impl std::error::Error for SelectionError {}

/// A batch stopped at its first bad index; `accepted` earlier choices stay committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchError {
    pub accepted: usize,
    pub error: SelectionError,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} accepted)", self.error, self.accepted)
    }
}

impl std::error::Error for BatchError {}

// ---------------------------------------------------------------------------
// ConflictSession
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct ConflictSession {
    requester: RequesterId,
    /// Carried through to persistence as the batch's source label.
    source_label: String,
    unambiguous: Vec<RecipeEntry>,
    groups: Vec<ConflictGroup>,
    /// group key → chosen candidate index
    selections: BTreeMap<String, usize>,
    cursor: usize,
    closed: bool,
    last_activity: Instant,
}

impl ConflictSession {
    pub fn new(
        requester: RequesterId,
        source_label: impl Into<String>,
        unambiguous: Vec<RecipeEntry>,
        groups: Vec<ConflictGroup>,
    ) -> Self {
        Self {
            requester,
            source_label: source_label.into(),
            unambiguous,
            groups,
            selections: BTreeMap::new(),
            cursor: 0,
            closed: false,
            last_activity: Instant::now(),
        }
    }

    pub fn requester(&self) -> RequesterId {
        self.requester
    }

    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    pub fn unambiguous(&self) -> &[RecipeEntry] {
        &self.unambiguous
    }

    pub fn groups(&self) -> &[ConflictGroup] {
        &self.groups
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selections(&self) -> &BTreeMap<String, usize> {
        &self.selections
    }

    /// 1-based resolution index of the next unresolved group. Never 0.
    pub fn token(&self) -> u32 {
        u32::try_from(self.cursor + 1).unwrap_or(u32::MAX)
    }

    pub fn state(&self) -> SessionState {
        if self.cursor >= self.groups.len() {
            SessionState::Complete
        } else {
            SessionState::Active
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == SessionState::Complete
    }

    pub fn current_group(&self) -> Option<&ConflictGroup> {
        self.groups.get(self.cursor)
    }

    /// Largest candidate count across all groups, at least 1.
    pub fn max_candidates(&self) -> usize {
        self.groups
            .iter()
            .map(|g| g.candidates.len())
            .max()
            .unwrap_or(0)
            .max(1)
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the session as finished (cancelled, finalized, aborted or expired).
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Choose candidate `index` for the current group and advance.
    pub fn select(&mut self, index: i64) -> Result<(), SelectionError> {
        let group_index = self.cursor;
        let Some(group) = self.groups.get(group_index) else {
            return Err(SelectionError::AlreadyComplete);
        };
        if group.candidates.is_empty() {
            return Err(SelectionError::Fault(SessionFault {
                group_index,
                key: group.key.clone(),
            }));
        }
        let candidates = group.candidates.len();
        let chosen = usize::try_from(index)
            .ok()
            .filter(|i| *i < candidates)
            .ok_or(SelectionError::InvalidIndex {
                group_index,
                index,
                candidates,
            })?;

        self.selections.insert(group.key.clone(), chosen);
        self.cursor += 1;
        Ok(())
    }

    /// Apply choices in order. Stops at the first invalid index (earlier choices
    /// stay committed). Choices left over once every group is resolved are ignored.
    ///
    /// Returns how many choices were accepted.
    pub fn select_batch(&mut self, indices: &[i64]) -> Result<usize, BatchError> {
        let mut accepted = 0;
        for &index in indices {
            if self.is_complete() {
                break;
            }
            self.select(index)
                .map_err(|error| BatchError { accepted, error })?;
            accepted += 1;
        }
        Ok(accepted)
    }

    /// Unambiguous recipes followed by each group's chosen candidate, in group
    /// order. `None` until every group is resolved.
    pub fn final_recipes(&self) -> Option<Vec<RecipeEntry>> {
        if !self.is_complete() {
            return None;
        }
        let mut out = self.unambiguous.clone();
        for g in &self.groups {
            let chosen = *self.selections.get(&g.key)?;
            out.push(g.candidates.get(chosen)?.clone());
        }
        Some(out)
    }
}
