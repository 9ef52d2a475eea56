use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Data,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Data => "data",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "data" => Ok(Role::Data),
            other => Err(format!("unknown message role {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolInvocationState {
    PartialCall,
    Call,
    Result,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub state: ToolInvocationState,
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
}

/// One element of `Message::parts`. Part types this service does not
/// interpret are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolInvocation {
        tool_invocation: ToolInvocation,
    },
    StepStart {},
    #[serde(untagged)]
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl Message {
    /// Builds a message whose `content` mirrors its text parts, which is how
    /// stored messages come back out of the database.
    pub fn from_parts(id: String, role: Role, parts: Vec<MessagePart>) -> Self {
        let content = text_of(&parts);
        Self {
            id,
            role,
            content,
            parts,
        }
    }

    /// Text parts joined, or `content` for messages sent without parts.
    pub fn text(&self) -> String {
        let joined = text_of(&self.parts);
        if joined.is_empty() {
            self.content.clone()
        } else {
            joined
        }
    }

    /// Parts to persist; a message sent with only `content` gets a text part.
    pub fn parts_or_content(&self) -> Vec<MessagePart> {
        if self.parts.is_empty() && !self.content.is_empty() {
            vec![MessagePart::Text {
                text: self.content.clone(),
            }]
        } else {
            self.parts.clone()
        }
    }
}

fn text_of(parts: &[MessagePart]) -> String {
    parts
        .iter()
        .filter_map(|part| match part {
            MessagePart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_browser_message() {
        let raw = json!({
            "id": "m1",
            "role": "assistant",
            "content": "Rust is fast.",
            "parts": [
                { "type": "step-start" },
                { "type": "tool-invocation", "toolInvocation": {
                    "state": "result", "toolCallId": "call_1", "toolName": "searchWeb",
                    "args": { "query": "rust" }, "result": [], "step": 0
                }},
                { "type": "text", "text": "Rust is fast." }
            ]
        });

        let message: Message = serde_json::from_value(raw).unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.parts.len(), 3);
        assert_eq!(message.parts[0], MessagePart::StepStart {});
        match &message.parts[1] {
            MessagePart::ToolInvocation { tool_invocation } => {
                assert_eq!(tool_invocation.state, ToolInvocationState::Result);
                assert_eq!(tool_invocation.tool_name, "searchWeb");
            }
            other => panic!("unexpected part {other:?}"),
        }
        assert_eq!(message.text(), "Rust is fast.");
    }

    #[test]
    fn unknown_parts_survive() {
        let part = json!({ "type": "source", "source": { "url": "https://example.com" } });

        let parsed: MessagePart = serde_json::from_value(part.clone()).unwrap();

        assert_eq!(parsed, MessagePart::Other(part.clone()));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), part);
    }

    #[test]
    fn content_only_message_gets_a_text_part() {
        let message: Message =
            serde_json::from_value(json!({ "role": "user", "content": "hi" })).unwrap();

        assert_eq!(message.text(), "hi");
        assert_eq!(
            message.parts_or_content(),
            vec![MessagePart::Text { text: "hi".to_string() }]
        );
    }

    #[test]
    fn step_start_serializes_as_bare_tag() {
        let value = serde_json::to_value(MessagePart::StepStart {}).unwrap();
        assert_eq!(value, json!({ "type": "step-start" }));
    }
}
