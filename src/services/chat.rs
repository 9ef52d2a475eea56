use crate::models::{Message, Role};

pub const DEFAULT_TITLE: &str = "New chat";
const TITLE_MAX_CHARS: usize = 100;

/// Title derived from the most recent user message.
pub fn title_from_messages(messages: &[Message]) -> String {
    let text = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.text())
        .unwrap_or_default();

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    collapsed.chars().take(TITLE_MAX_CHARS).collect()
}

/// History plus the assistant reply, as it will be stored.
pub fn append_response(mut messages: Vec<Message>, response: Message) -> Vec<Message> {
    messages.push(response);
    messages
}
