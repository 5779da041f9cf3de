use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::categories::Category;

/// Where a user is in the classification flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    SelectingCategory,
    AwaitingMessage(&'static Category),
}

#[derive(Debug, Clone)]
pub struct Session {
    pub state: ConversationState,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: ConversationState::SelectingCategory,
            last_activity: now,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now - self.last_activity >= idle_timeout
    }
}

/// Per-user sessions keyed by Telegram user id.
///
/// Every accessor takes the current time and treats an idle session as
/// absent, so expiry is exact even between sweeps.
pub struct SessionStore {
    sessions: Mutex<HashMap<u64, Session>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Begin a fresh session, discarding any previous one.
    /// Returns true if a live session was replaced.
    pub async fn start(&self, user_id: u64, now: DateTime<Utc>) -> bool {
        let mut sessions = self.sessions.lock().await;
        let previous = sessions.insert(user_id, Session::new(now));
        previous.is_some_and(|s| !s.is_expired(now, self.idle_timeout))
    }

    /// Current state of a live session. Drops the session if it has expired.
    pub async fn state(&self, user_id: u64, now: DateTime<Utc>) -> Option<ConversationState> {
        let mut sessions = self.sessions.lock().await;
        self.live(&mut sessions, user_id, now).map(|s| s.state)
    }

    /// Record the chosen category. Only valid while selecting.
    pub async fn select_category(
        &self,
        user_id: u64,
        category: &'static Category,
        now: DateTime<Utc>,
    ) -> bool {
        let mut sessions = self.sessions.lock().await;
        match self.live(&mut sessions, user_id, now) {
            Some(session) if session.state == ConversationState::SelectingCategory => {
                session.state = ConversationState::AwaitingMessage(category);
                session.last_activity = now;
                true
            }
            _ => false,
        }
    }

    /// End a session that is awaiting its message and hand back the category.
    pub async fn take_awaiting(
        &self,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Option<&'static Category> {
        let mut sessions = self.sessions.lock().await;
        let state = self.live(&mut sessions, user_id, now)?.state;
        match state {
            ConversationState::AwaitingMessage(category) => {
                sessions.remove(&user_id);
                Some(category)
            }
            ConversationState::SelectingCategory => None,
        }
    }

    /// Remove a session. Returns true if a live one existed.
    pub async fn end(&self, user_id: u64, now: DateTime<Utc>) -> bool {
        let mut sessions = self.sessions.lock().await;
        sessions
            .remove(&user_id)
            .is_some_and(|s| !s.is_expired(now, self.idle_timeout))
    }

    /// Drop every session idle for at least the timeout.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, self.idle_timeout));
        before - sessions.len()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn live<'a>(
        &self,
        sessions: &'a mut HashMap<u64, Session>,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Option<&'a mut Session> {
        let expired = sessions
            .get(&user_id)
            .is_some_and(|s| s.is_expired(now, self.idle_timeout));
        if expired {
            sessions.remove(&user_id);
            debug!("Session for user {} expired", user_id);
            return None;
        }
        sessions.get_mut(&user_id)
    }
}
