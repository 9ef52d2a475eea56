use crate::connectors::{
    ChatMessage, ChatRequest, ConnectorError, ModelConnector, ModelEvent, SearchConnector,
    SearchQuery, ToolCall, ToolDef, Usage,
};
use crate::helpers::{DataStreamWriter, StreamClosed, StreamPart};
use crate::models::{Message, MessagePart, Role, ToolInvocation, ToolInvocationState};
use chrono::{NaiveDate, Utc};
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

pub const SEARCH_TOOL_NAME: &str = "searchWeb";

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error(transparent)]
    Closed(#[from] StreamClosed),
}

#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// The assistant reply in browser message form.
    pub message: Message,
    pub finish_reason: String,
    pub usage: Usage,
}

pub fn system_prompt(today: NaiveDate) -> String {
    format!(
        "You are an AI assistant with access to a web search tool. \
         For every user query, always use the {SEARCH_TOOL_NAME} tool to find up-to-date information. \
         Always cite your sources with inline markdown links, e.g. [source](url), \
         for any factual statements or answers you provide.\n\
         The current date is {}.",
        today.format("%Y-%m-%d")
    )
}

pub fn search_web_tool() -> ToolDef {
    ToolDef {
        name: SEARCH_TOOL_NAME.to_string(),
        description: "Search the web for up-to-date information.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "The query to search the web for" }
            },
            "required": ["query"]
        }),
    }
}

/// Runs the model with the web search tool until it answers without calling
/// a tool or `max_steps` model calls have been made.
pub struct Agent {
    model: Arc<dyn ModelConnector>,
    search: Arc<dyn SearchConnector>,
    max_steps: usize,
    num_results: u32,
}

#[derive(Debug, Default)]
struct PendingCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

#[derive(Debug)]
struct ResolvedCall {
    id: String,
    name: String,
    args: Value,
}

/// Tool call fragments of one step, keyed by the model's call index.
#[derive(Debug, Default)]
struct PendingCalls(BTreeMap<usize, PendingCall>);

impl PendingCalls {
    fn push(&mut self, index: usize, id: Option<String>, name: Option<String>, arguments: &str) {
        let call = self.0.entry(index).or_default();
        if id.is_some() {
            call.id = id;
        }
        if let Some(name) = name {
            call.name.push_str(&name);
        }
        call.arguments.push_str(arguments);
    }

    fn resolve(self, step: usize) -> Vec<ResolvedCall> {
        self.0
            .into_iter()
            .map(|(index, call)| {
                let args = if call.arguments.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&call.arguments)
                        .unwrap_or_else(|_| Value::String(call.arguments.clone()))
                };
                ResolvedCall {
                    id: call.id.unwrap_or_else(|| format!("call_{step}_{index}")),
                    name: call.name,
                    args,
                }
            })
            .collect()
    }
}

fn normalize_finish_reason(reason: &str) -> String {
    match reason {
        "tool_calls" | "function_call" => "tool-calls".to_string(),
        "content_filter" => "content-filter".to_string(),
        other => other.to_string(),
    }
}

impl Agent {
    pub fn new(
        model: Arc<dyn ModelConnector>,
        search: Arc<dyn SearchConnector>,
        max_steps: usize,
        num_results: u32,
    ) -> Self {
        Self {
            model,
            search,
            max_steps: max_steps.max(1),
            num_results,
        }
    }

    pub async fn run(
        &self,
        history: &[Message],
        writer: &DataStreamWriter,
    ) -> Result<AgentOutcome, AgentError> {
        let message_id = Uuid::new_v4().to_string();
        let tools = vec![search_web_tool()];

        let mut conversation = vec![ChatMessage::system(system_prompt(Utc::now().date_naive()))];
        conversation.extend(to_model_messages(history));

        let mut parts = Vec::new();
        let mut content = String::new();
        let mut usage = Usage::default();
        let mut finish_reason = "unknown".to_string();

        for step in 0..self.max_steps {
            writer
                .write(StreamPart::StartStep {
                    message_id: message_id.clone(),
                })
                .await?;
            parts.push(MessagePart::StepStart {});

            let mut events = self
                .model
                .stream_chat(ChatRequest {
                    messages: conversation.clone(),
                    tools: tools.clone(),
                })
                .await?;

            let mut text = String::new();
            let mut pending = PendingCalls::default();
            let mut step_usage = Usage::default();
            let mut reason = None;

            while let Some(event) = events.next().await {
                match event? {
                    ModelEvent::TextDelta(delta) => {
                        writer.text(&delta).await?;
                        text.push_str(&delta);
                    }
                    ModelEvent::ToolCallDelta {
                        index,
                        id,
                        name,
                        arguments,
                    } => pending.push(index, id, name, &arguments),
                    ModelEvent::Finish { reason: r } => reason = Some(r),
                    ModelEvent::Usage(u) => step_usage += u,
                }
            }
            usage += step_usage;

            if !text.is_empty() {
                content.push_str(&text);
                parts.push(MessagePart::Text { text: text.clone() });
            }

            let calls = pending.resolve(step);
            if calls.is_empty() {
                finish_reason = normalize_finish_reason(reason.as_deref().unwrap_or("stop"));
                writer
                    .write(StreamPart::FinishStep {
                        finish_reason: finish_reason.clone(),
                        usage: step_usage,
                        is_continued: false,
                    })
                    .await?;
                break;
            }

            tracing::debug!(step, calls = calls.len(), "Model requested tool calls");
            conversation.push(ChatMessage::assistant_tool_calls(
                Some(text).filter(|t| !t.is_empty()),
                calls
                    .iter()
                    .map(|c| ToolCall::function(c.id.clone(), c.name.clone(), &c.args))
                    .collect(),
            ));

            for call in calls {
                writer
                    .write(StreamPart::ToolCall {
                        tool_call_id: call.id.clone(),
                        tool_name: call.name.clone(),
                        args: call.args.clone(),
                    })
                    .await?;

                let result = self.execute_tool(&call).await;

                writer
                    .write(StreamPart::ToolResult {
                        tool_call_id: call.id.clone(),
                        result: result.clone(),
                    })
                    .await?;

                conversation.push(ChatMessage::tool_result(call.id.clone(), result.to_string()));
                parts.push(MessagePart::ToolInvocation {
                    tool_invocation: ToolInvocation {
                        state: ToolInvocationState::Result,
                        tool_call_id: call.id,
                        tool_name: call.name,
                        args: call.args,
                        result: Some(result),
                        step: Some(step as u32),
                    },
                });
            }

            finish_reason = "tool-calls".to_string();
            writer
                .write(StreamPart::FinishStep {
                    finish_reason: finish_reason.clone(),
                    usage: step_usage,
                    is_continued: false,
                })
                .await?;
        }

        Ok(AgentOutcome {
            message: Message {
                id: message_id,
                role: Role::Assistant,
                content,
                parts,
            },
            finish_reason,
            usage,
        })
    }

    /// Tool failures become `{ "error": ... }` results for the model to read.
    async fn execute_tool(&self, call: &ResolvedCall) -> Value {
        if call.name != SEARCH_TOOL_NAME {
            tracing::warn!(tool = %call.name, "Model called an unknown tool");
            return json!({ "error": format!("unknown tool {}", call.name) });
        }

        let query = match call.args.get("query").and_then(Value::as_str) {
            Some(query) => query,
            None => return json!({ "error": "searchWeb requires a string `query` argument" }),
        };

        let request = SearchQuery {
            q: query.to_string(),
            num: self.num_results,
        };
        match self.search.search(&request).await {
            Ok(found) => json!(found.into_hits()),
            Err(err) => {
                tracing::warn!(error = %err, "Web search failed");
                json!({ "error": err.to_string() })
            }
        }
    }
}

/// Browser messages to the model's chat format. Each assistant step becomes
/// an assistant turn followed by the results of its tool calls.
pub fn to_model_messages(history: &[Message]) -> Vec<ChatMessage> {
    let mut out = Vec::with_capacity(history.len());
    for message in history {
        match message.role {
            Role::System => out.push(ChatMessage::system(message.text())),
            Role::User => out.push(ChatMessage::user(message.text())),
            Role::Assistant => out.extend(assistant_to_model(message)),
            Role::Data => {}
        }
    }
    out
}

fn assistant_to_model(message: &Message) -> Vec<ChatMessage> {
    if message.parts.is_empty() {
        if message.content.is_empty() {
            return vec![];
        }
        return vec![ChatMessage::assistant(message.content.clone())];
    }

    let mut out = Vec::new();
    for step in message.parts.split(|part| matches!(part, MessagePart::StepStart {})) {
        let mut text = String::new();
        let mut invocations = Vec::new();
        for part in step {
            match part {
                MessagePart::Text { text: t } => text.push_str(t),
                // calls that never got a result cannot be replayed
                MessagePart::ToolInvocation { tool_invocation }
                    if tool_invocation.state == ToolInvocationState::Result =>
                {
                    invocations.push(tool_invocation)
                }
                _ => {}
            }
        }

        if invocations.is_empty() {
            if !text.is_empty() {
                out.push(ChatMessage::assistant(text));
            }
            continue;
        }

        out.push(ChatMessage::assistant_tool_calls(
            Some(text).filter(|t| !t.is_empty()),
            invocations
                .iter()
                .map(|inv| {
                    ToolCall::function(inv.tool_call_id.clone(), inv.tool_name.clone(), &inv.args)
                })
                .collect(),
        ));
        for inv in invocations {
            let result = inv.result.clone().unwrap_or(Value::Null);
            out.push(ChatMessage::tool_result(inv.tool_call_id.clone(), result.to_string()));
        }
    }
    out
}
