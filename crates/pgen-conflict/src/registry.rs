//! Requester → session map.
//!
//! # Locking
//!
//! - The map lock is held only for insert/lookup/remove, never while a
//!   session is being worked on.
//! - Each session sits behind its own `Mutex`; different requesters never
//!   contend.
//! - Lock order is session → map (removal after a terminal step). Nothing takes
//!   map → session; [`SessionRegistry::sweep_idle`] snapshots handles first.
//!
//! A poisoned lock is recovered with `into_inner`: a session's state is only
//! ever mutated through checked transitions, so it stays consistent.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use pgen_schemas::{ConflictWindow, RequesterId, WindowSelection};

use crate::protocol::{BatchProtocol, ProtocolStep};
use crate::session::ConflictSession;

pub type SessionHandle = Arc<Mutex<ConflictSession>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// At most one session per requester.
    AlreadyActive { requester: RequesterId },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::AlreadyActive { requester } => {
                write!(f, "requester {requester} already has an active conflict session")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Result of routing a reply to a requester's session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Exchange {
    /// No live session: the reply belongs to a session that is gone. No-op.
    NoSession,
    Step(ProtocolStep),
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<RequesterId, SessionHandle>>,
    idle_ttl: Option<Duration>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionRegistry {
    /// Registry without idle expiry.
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` disables expiry; sessions then live until cancel, completion or disconnect.
    pub fn with_idle_ttl(idle_ttl: Option<Duration>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub fn idle_ttl(&self) -> Option<Duration> {
        self.idle_ttl
    }

    pub fn create(&self, session: ConflictSession) -> Result<SessionHandle, RegistryError> {
        let requester = session.requester();
        let groups = session.group_count();
        let mut map = lock(&self.sessions);
        if map.contains_key(&requester) {
            tracing::warn!(requester = %requester, "conflict session already active");
            return Err(RegistryError::AlreadyActive { requester });
        }
        let handle = Arc::new(Mutex::new(session));
        map.insert(requester, Arc::clone(&handle));
        tracing::info!(requester = %requester, groups, "conflict session created");
        Ok(handle)
    }

    pub fn get(&self, requester: &RequesterId) -> Option<SessionHandle> {
        lock(&self.sessions).get(requester).cloned()
    }

    pub fn contains(&self, requester: &RequesterId) -> bool {
        lock(&self.sessions).contains_key(requester)
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroy the requester's session, if any. Returns whether one existed.
    pub fn remove(&self, requester: &RequesterId) -> bool {
        let removed = lock(&self.sessions).remove(requester);
        match removed {
            Some(handle) => {
                lock(&handle).close();
                tracing::info!(requester = %requester, "conflict session destroyed");
                true
            }
            None => false,
        }
    }

    /// Remove `handle` only if it is still the requester's registered session.
    fn remove_exact(&self, requester: &RequesterId, handle: &SessionHandle) {
        let mut map = lock(&self.sessions);
        if map.get(requester).is_some_and(|h| Arc::ptr_eq(h, handle)) {
            map.remove(requester);
        }
    }

    /// Current window for the requester's session.
    pub fn window(&self, protocol: &BatchProtocol, requester: &RequesterId) -> Option<ConflictWindow> {
        let handle = self.get(requester)?;
        let session = lock(&handle);
        if session.is_closed() {
            return None;
        }
        Some(protocol.window(&session))
    }

    /// Route a reply to the requester's session and destroy the session when the
    /// step is terminal. Replies for closed or missing sessions are no-ops.
    pub fn submit(
        &self,
        protocol: &BatchProtocol,
        requester: &RequesterId,
        reply: &WindowSelection,
        now: Instant,
    ) -> Exchange {
        let Some(handle) = self.get(requester) else {
            tracing::debug!(requester = %requester, "selection for missing session dropped");
            return Exchange::NoSession;
        };
        let mut session = lock(&handle);
        if session.is_closed() {
            return Exchange::NoSession;
        }

        let step = protocol.apply(&mut session, reply);
        match &step {
            ProtocolStep::Window(w) => {
                session.touch(now);
                tracing::debug!(requester = %requester, start = w.start_index, total = w.total_groups, "window advanced");
            }
            ProtocolStep::Resend { reason, .. } => {
                session.touch(now);
                tracing::info!(requester = %requester, %reason, "window resent");
            }
            ProtocolStep::IgnoredStale => {
                tracing::debug!(requester = %requester, got = reply.expected_start_index, "stale cancel ignored");
            }
            ProtocolStep::Abort(fault) => {
                tracing::error!(requester = %requester, %fault, "conflict session aborted");
            }
            ProtocolStep::Complete { .. } | ProtocolStep::Cancelled => {}
        }

        if step.ends_session() {
            session.close();
            drop(session);
            self.remove_exact(requester, &handle);
            tracing::info!(requester = %requester, "conflict session destroyed");
        }
        Exchange::Step(step)
    }

    /// Destroy sessions idle for longer than the configured TTL.
    ///
    /// No-op when expiry is disabled. Returns the expired requesters.
    pub fn sweep_idle(&self, now: Instant) -> Vec<RequesterId> {
        let Some(ttl) = self.idle_ttl else {
            return Vec::new();
        };
        let snapshot: Vec<(RequesterId, SessionHandle)> = lock(&self.sessions)
            .iter()
            .map(|(k, v)| (*k, Arc::clone(v)))
            .collect();

        let mut expired = Vec::new();
        for (requester, handle) in snapshot {
            let mut session = lock(&handle);
            let idle = now.saturating_duration_since(session.last_activity());
            if idle > ttl && !session.is_closed() {
                session.close();
                drop(session);
                self.remove_exact(&requester, &handle);
                tracing::warn!(requester = %requester, idle_secs = idle.as_secs(), "idle conflict session expired");
                expired.push(requester);
            }
        }
        expired
    }
}
