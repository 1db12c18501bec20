//! Per-session tracker registry

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::tracker::EyeStateTracker;
use crate::DmsConfig;

/// Session used by clients that do not identify themselves
pub const DEFAULT_SESSION: &str = "default";

/// Request header carrying the client's capture session id
pub const SESSION_HEADER: &str = "x-session-id";

struct SessionEntry {
    tracker: EyeStateTracker,
    last_seen: Instant,
}

/// One [`EyeStateTracker`] per capture session
pub struct SessionRegistry {
    config: DmsConfig,
    sessions: HashMap<String, SessionEntry>,
}

impl SessionRegistry {
    pub fn new(config: DmsConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }

    /// Tracker for `session`, created on first use
    pub fn tracker_mut(&mut self, session: &str) -> &mut EyeStateTracker {
        let config = &self.config;
        let entry = self
            .sessions
            .entry(session.to_string())
            .or_insert_with(|| {
                debug!("New session {}", session);
                SessionEntry {
                    tracker: EyeStateTracker::new(config),
                    last_seen: Instant::now(),
                }
            });
        entry.last_seen = Instant::now();
        &mut entry.tracker
    }

    pub fn get(&self, session: &str) -> Option<&EyeStateTracker> {
        self.sessions.get(session).map(|e| &e.tracker)
    }

    /// Forget a session; returns whether it existed
    pub fn remove(&mut self, session: &str) -> bool {
        self.sessions.remove(session).is_some()
    }

    /// Drop sessions idle for at least `max_idle`; returns how many
    pub fn evict_idle(&mut self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, e| e.last_seen.elapsed() < max_idle);
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            info!("Evicted {} idle sessions", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
