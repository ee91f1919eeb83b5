//! Windowed selection exchange over a [`ConflictSession`].
//!
//! # Staleness token
//!
//! Every window carries `start_index = cursor + 1`. A reply is only applied if
//! its `expected_start_index` equals the session's current token; the cursor
//! moves forward on every accepted choice, so a duplicate or late reply can
//! never match again. Stale replies are dropped, never merged.
//!
//! # Outcomes
//!
//! | reply                               | step                      |
//! |-------------------------------------|---------------------------|
//! | cancel, token current               | `Cancelled`               |
//! | cancel, token stale                 | `IgnoredStale`            |
//! | choose, token stale                 | `Resend(Stale)`           |
//! | choose, empty current group         | `Abort`                   |
//! | choose, no choices / too many       | `Resend(..)`              |
//! | choose, bad index                   | `Resend(InvalidIndex)`    |
//! | choose, all groups resolved         | `Complete{..}`            |
//! | choose, groups remain               | `Window(next)`            |

use std::fmt;

use pgen_schemas::{CandidateSummary, ConflictWindow, RecipeEntry, WindowGroup, WindowSelection};

use crate::session::{ConflictSession, SelectionError, SessionFault};

/// Groups shipped per round unless configured otherwise.
pub const DEFAULT_WINDOW_CAPACITY: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResendReason {
    Stale { expected: u32, got: u32 },
    NoChoices,
    TooManyChoices { got: usize, max: usize },
    InvalidIndex {
        accepted: usize,
        group_index: usize,
        index: i64,
        candidates: usize,
    },
}

impl fmt::Display for ResendReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResendReason::Stale { expected, got } => {
                write!(f, "stale selection: window {got} is no longer current (now {expected})")
            }
            ResendReason::NoChoices => write!(f, "no choices submitted"),
            ResendReason::TooManyChoices { got, max } => {
                write!(f, "{got} choices submitted, at most {max} per window")
            }
            ResendReason::InvalidIndex {
                accepted,
                group_index,
                index,
                candidates,
            } => write!(
                f,
                "invalid choice {index} for group {} (valid: 0..{candidates}); {accepted} earlier choices kept",
                group_index + 1
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolStep {
    /// Choices accepted; here is the next window.
    Window(ConflictWindow),
    /// Nothing (or only a prefix) applied; requester must answer this window.
    Resend {
        reason: ResendReason,
        window: ConflictWindow,
    },
    /// Every group resolved. The caller finalizes these recipes once, under
    /// the session's source label.
    Complete {
        source: String,
        recipes: Vec<RecipeEntry>,
    },
    /// Requester abandoned generation.
    Cancelled,
    /// Cancel against an outdated window; session untouched.
    IgnoredStale,
    /// Session invariant broken; the session must be destroyed.
    Abort(SessionFault),
}

impl ProtocolStep {
    /// `true` when the session must be destroyed after this step.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            ProtocolStep::Complete { .. } | ProtocolStep::Cancelled | ProtocolStep::Abort(_)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchProtocol {
    window_capacity: usize,
}

impl Default for BatchProtocol {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl BatchProtocol {
    /// Capacity is clamped to at least one group per window.
    pub fn new(window_capacity: usize) -> Self {
        Self {
            window_capacity: window_capacity.max(1),
        }
    }

    pub fn window_capacity(&self) -> usize {
        self.window_capacity
    }

    /// Groups `cursor .. min(total, cursor + capacity)` plus sizing metadata.
    pub fn window(&self, session: &ConflictSession) -> ConflictWindow {
        let start = session.cursor().min(session.group_count());
        let end = (start + self.window_capacity).min(session.group_count());
        let groups = session.groups()[start..end]
            .iter()
            .map(|g| WindowGroup {
                label: g.label.clone(),
                candidates: g.candidates.iter().map(CandidateSummary::from_recipe).collect(),
            })
            .collect();
        ConflictWindow {
            start_index: session.token(),
            total_groups: to_u32(session.group_count()),
            max_candidates_in_any_group: to_u32(session.max_candidates()),
            groups,
        }
    }

    /// Apply one reply to `session`. Only accepted choices mutate it.
    pub fn apply(&self, session: &mut ConflictSession, reply: &WindowSelection) -> ProtocolStep {
        let token = session.token();
        let fresh = reply.expected_start_index == token;

        if reply.cancel {
            return if fresh {
                ProtocolStep::Cancelled
            } else {
                ProtocolStep::IgnoredStale
            };
        }

        if !fresh {
            return self.resend(
                session,
                ResendReason::Stale {
                    expected: token,
                    got: reply.expected_start_index,
                },
            );
        }
        if session.is_complete() {
            return self.complete_or_abort(session);
        }
        // A group with nothing to pick can never be answered.
        if let Some(group) = session.current_group().filter(|g| g.candidates.is_empty()) {
            return ProtocolStep::Abort(SessionFault {
                group_index: session.cursor(),
                key: group.key.clone(),
            });
        }
        if reply.choices.is_empty() {
            return self.resend(session, ResendReason::NoChoices);
        }
        if reply.choices.len() > self.window_capacity {
            return self.resend(
                session,
                ResendReason::TooManyChoices {
                    got: reply.choices.len(),
                    max: self.window_capacity,
                },
            );
        }

        match session.select_batch(&reply.choices) {
            Ok(_) if session.is_complete() => self.complete_or_abort(session),
            Ok(_) => ProtocolStep::Window(self.window(session)),
            Err(e) => match e.error {
                SelectionError::Fault(fault) => ProtocolStep::Abort(fault),
                SelectionError::InvalidIndex {
                    group_index,
                    index,
                    candidates,
                } => self.resend(
                    session,
                    ResendReason::InvalidIndex {
                        accepted: e.accepted,
                        group_index,
                        index,
                        candidates,
                    },
                ),
                SelectionError::AlreadyComplete => self.complete_or_abort(session),
            },
        }
    }

    fn resend(&self, session: &ConflictSession, reason: ResendReason) -> ProtocolStep {
        ProtocolStep::Resend {
            reason,
            window: self.window(session),
        }
    }

    fn complete_or_abort(&self, session: &ConflictSession) -> ProtocolStep {
        match session.final_recipes() {
            Some(recipes) => ProtocolStep::Complete {
                source: session.source_label().to_string(),
                recipes,
            },
            // Complete but a selection is missing: cannot finalize.
            None => ProtocolStep::Abort(SessionFault {
                group_index: session.cursor(),
                key: "missing selection".to_string(),
            }),
        }
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
