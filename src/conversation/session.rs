//! Per-session conversation buffers.

use super::ConversationBuffer;
use crate::error::{DocketError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Default cap on live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Default idle time after which a session is dropped.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(60 * 60);

/// Shared handle to one session's buffer.
pub type SessionHandle = Arc<Mutex<ConversationBuffer>>;

struct Session {
    handle: SessionHandle,
    last_used: Instant,
}

/// Conversation buffers keyed by session ID.
///
/// Each buffer has its own lock, so a slow answer in one session does not
/// block others. Sessions live in memory only. Idle sessions expire, and
/// once `max_sessions` are live the least recently used one is dropped to
/// make room for a new one.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    max_history_tokens: usize,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(max_history_tokens: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_history_tokens,
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout: DEFAULT_SESSION_IDLE,
        }
    }

    /// Set the session cap and idle timeout.
    pub fn with_limits(mut self, max_sessions: usize, idle_timeout: Duration) -> Self {
        self.max_sessions = max_sessions.max(1);
        self.idle_timeout = idle_timeout;
        self
    }

    /// Look up `id`, or start a new session when it is `None` or unknown.
    ///
    /// Returns the session ID actually used.
    pub async fn get_or_create(&self, id: Option<&str>) -> (String, SessionHandle) {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        if let Some(id) = id {
            if let Some(session) = sessions.get_mut(id) {
                if now.duration_since(session.last_used) <= self.idle_timeout {
                    session.last_used = now;
                    return (id.to_string(), session.handle.clone());
                }
            }
        }

        self.evict(&mut sessions, now);

        let id = id
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let handle = Arc::new(Mutex::new(ConversationBuffer::new(self.max_history_tokens)));
        sessions.insert(
            id.clone(),
            Session {
                handle: handle.clone(),
                last_used: now,
            },
        );
        info!("Started conversation session {}", id);

        (id, handle)
    }

    /// Drop expired sessions, then the least recently used ones until a new
    /// session fits under the cap.
    fn evict(&self, sessions: &mut HashMap<String, Session>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, s| now.duration_since(s.last_used) <= self.idle_timeout);

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
        }

        let dropped = before - sessions.len();
        if dropped > 0 {
            debug!("Dropped {} idle or excess sessions", dropped);
        }
    }

    /// Empty a session's history.
    pub async fn clear(&self, id: &str) -> Result<()> {
        let handle = {
            let mut sessions = self.sessions.lock().await;
            let session = sessions
                .get_mut(id)
                .ok_or_else(|| DocketError::SessionNotFound(id.to_string()))?;
            session.last_used = Instant::now();
            session.handle.clone()
        };
        handle.lock().await.clear();
        Ok(())
    }

    /// Drop a session entirely. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(super::DEFAULT_MAX_HISTORY_TOKENS)
    }
}
