use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One chat request, kept only to count quota usage.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRequest {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}
