use crate::models;
use serde::Deserialize;
use serde_valid::Validate;

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    #[validate(min_items = 1)]
    pub messages: Vec<models::Message>,
    #[serde(default)]
    #[validate(min_length = 1)]
    #[validate(max_length = 128)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub is_new_chat: bool,
}
