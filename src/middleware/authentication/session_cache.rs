use crate::models;
use chrono::Utc;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Resolved sessions by token, so the auth provider is not asked on every request.
pub struct SessionCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedSession>>,
}

struct CachedSession {
    session: models::Session,
    expires_at: Instant,
}

impl CachedSession {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now && !self.session.is_expired(Utc::now())
    }
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, token: &str) -> Option<models::Session> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(token) {
                Some(entry) if entry.is_live(now) => return Some(entry.session.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(token) {
            if entry.is_live(now) {
                return Some(entry.session.clone());
            }
            entries.remove(token);
        }

        None
    }

    pub async fn insert(&self, token: String, session: models::Session) {
        if self.ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        // drop whatever expired since the last miss
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            token,
            CachedSession {
                session,
                expires_at: now + self.ttl,
            },
        );
    }
}
