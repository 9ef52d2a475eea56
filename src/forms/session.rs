use crate::models;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session document returned by the auth provider.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionForm {
    pub user: SessionUser,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl SessionForm {
    pub fn into_session(self, token: String) -> Result<models::Session, String> {
        if self.user.id.trim().is_empty() {
            return Err("session has no user id".to_string());
        }

        let session = models::Session {
            user_id: self.user.id,
            name: self.user.name,
            email: self.user.email,
            expires: self.expires,
            token,
        };
        if session.is_expired(Utc::now()) {
            return Err("session expired".to_string());
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_provider_session() {
        let form: SessionForm = serde_json::from_value(json!({
            "user": { "id": "user-1", "name": "Ada", "email": "ada@example.com" },
            "expires": "2999-01-01T00:00:00.000Z"
        }))
        .unwrap();

        let session = form.into_session("tok".to_string()).unwrap();
        assert_eq!(session.user_id, "user-1");
        assert_eq!(session.token, "tok");
    }

    #[test]
    fn rejects_expired_or_anonymous_sessions() {
        let expired: SessionForm = serde_json::from_value(json!({
            "user": { "id": "user-1" },
            "expires": "2000-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(expired.into_session("tok".to_string()).is_err());

        let blank = SessionForm::default();
        assert!(blank.into_session("tok".to_string()).is_err());
    }
}
