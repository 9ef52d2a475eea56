use chrono::{DateTime, Utc};

/// A session resolved by the auth provider and attached to the request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub token: String,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.map(|expires| expires <= now).unwrap_or(false)
    }
}
