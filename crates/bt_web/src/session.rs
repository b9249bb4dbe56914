use std::collections::HashMap;
use std::time::Duration;

use axum::http::{header, HeaderMap};
use bt_core::{Event, Session};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "bt_session";

struct SessionEntry {
    session: Session,
    last_seen: DateTime<Utc>,
}

impl SessionEntry {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            session: Session::new(),
            last_seen: now,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        (now - self.last_seen)
            .to_std()
            .map(|age| age > ttl)
            .unwrap_or(false)
    }
}

/// Result of touching a session.
#[derive(Debug)]
pub struct Opened<T> {
    pub id: Uuid,
    /// The caller had no live session and a new one was started.
    pub created: bool,
    pub value: T,
}

/// In-memory UI state, one entry per browser session.
///
/// Sessions never share state with each other; the model they use is shared
/// read-only through `AppState`.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Run `f` against the caller's session, starting one if needed.
    pub async fn with_session<T>(&self, id: Option<Uuid>, f: impl FnOnce(&mut Session) -> T) -> Opened<T> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(now, self.ttl));
        if sessions.len() < before {
            debug!("evicted {} idle sessions", before - sessions.len());
        }

        let (id, created) = match id {
            Some(id) if sessions.contains_key(&id) => (id, false),
            _ => (Uuid::new_v4(), true),
        };
        if created {
            debug!("started session {}", id);
        }

        let entry = sessions.entry(id).or_insert_with(|| SessionEntry::new(now));
        entry.last_seen = now;
        let value = f(&mut entry.session);

        Opened { id, created, value }
    }

    pub async fn snapshot(&self, id: Option<Uuid>) -> Opened<Session> {
        self.with_session(id, |session| session.clone()).await
    }

    pub async fn apply(&self, id: Option<Uuid>, event: Event) -> Opened<()> {
        self.with_session(id, |session| session.apply(event)).await
    }

    /// Discard a session. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Read the session id from the request's `Cookie` header.
pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

pub fn session_cookie(id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

pub fn expired_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
