//! Session-scoped working memory.
//!
//! A volatile ring per session id: the most recently stored items, oldest
//! evicted first once the ring is full. Nothing here is ever persisted;
//! dropping the engine drops all sessions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use mnemon_types::{MemoryItem, WorkingMemoryConfig};

/// Bounded recent-item rings keyed by session id.
#[derive(Debug)]
pub struct WorkingMemory {
    capacity: usize,
    sessions: Mutex<HashMap<String, VecDeque<MemoryItem>>>,
}

impl WorkingMemory {
    pub fn new(config: &WorkingMemoryConfig) -> Self {
        Self {
            capacity: config.session_capacity.max(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<MemoryItem>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item to a session's ring, evicting the oldest past capacity.
    pub fn push(&self, session_id: &str, item: MemoryItem) {
        let mut sessions = self.lock();
        let ring = sessions.entry(session_id.to_string()).or_default();
        ring.push_back(item);
        while ring.len() > self.capacity {
            ring.pop_front();
        }
    }

    /// Most recent `limit` items for a session, oldest first.
    pub fn recent(&self, session_id: &str, limit: usize) -> Vec<MemoryItem> {
        let sessions = self.lock();
        match sessions.get(session_id) {
            Some(ring) => {
                let skip = ring.len().saturating_sub(limit);
                ring.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Items currently held for a session.
    pub fn session_len(&self, session_id: &str) -> usize {
        self.lock().get(session_id).map_or(0, VecDeque::len)
    }

    /// Number of sessions with at least one item.
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    /// Tear down one session. Returns how many items were dropped.
    pub fn clear_session(&self, session_id: &str) -> usize {
        let dropped = self
            .lock()
            .remove(session_id)
            .map_or(0, |ring| ring.len());
        if dropped > 0 {
            debug!(session_id, dropped, "cleared working memory session");
        }
        dropped
    }

    /// Tear down every session. Returns how many items were dropped.
    pub fn clear_all(&self) -> usize {
        let mut sessions = self.lock();
        let dropped = sessions.values().map(VecDeque::len).sum();
        sessions.clear();
        dropped
    }
}
