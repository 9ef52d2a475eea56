use crate::connectors::Usage;
use actix_web::web::Bytes;
use serde_json::{json, Value};
use tokio::sync::mpsc;

pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const STREAM_HEADER: (&str, &str) = ("x-vercel-ai-data-stream", "v1");

/// Shown to the browser for any failure after streaming began.
pub const GENERIC_ERROR: &str = "Oops, an error occured!";

/// One line of the browser-facing data stream, `<code>:<json>\n`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPart {
    StartStep { message_id: String },
    Text(String),
    ToolCall { tool_call_id: String, tool_name: String, args: Value },
    ToolResult { tool_call_id: String, result: Value },
    Data(Vec<Value>),
    FinishStep { finish_reason: String, usage: Usage, is_continued: bool },
    FinishMessage { finish_reason: String, usage: Usage },
    Error(String),
}

impl StreamPart {
    fn code(&self) -> char {
        match self {
            StreamPart::StartStep { .. } => 'f',
            StreamPart::Text(_) => '0',
            StreamPart::ToolCall { .. } => '9',
            StreamPart::ToolResult { .. } => 'a',
            StreamPart::Data(_) => '2',
            StreamPart::FinishStep { .. } => 'e',
            StreamPart::FinishMessage { .. } => 'd',
            StreamPart::Error(_) => '3',
        }
    }

    fn payload(&self) -> Value {
        match self {
            StreamPart::StartStep { message_id } => json!({ "messageId": message_id }),
            StreamPart::Text(text) => json!(text),
            StreamPart::ToolCall { tool_call_id, tool_name, args } => json!({
                "toolCallId": tool_call_id,
                "toolName": tool_name,
                "args": args,
            }),
            StreamPart::ToolResult { tool_call_id, result } => json!({
                "toolCallId": tool_call_id,
                "result": result,
            }),
            StreamPart::Data(items) => json!(items),
            StreamPart::FinishStep { finish_reason, usage, is_continued } => json!({
                "finishReason": finish_reason,
                "usage": usage,
                "isContinued": is_continued,
            }),
            StreamPart::FinishMessage { finish_reason, usage } => json!({
                "finishReason": finish_reason,
                "usage": usage,
            }),
            StreamPart::Error(message) => json!(message),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}:{}\n", self.code(), self.payload())
    }
}

/// The browser went away; nothing more can be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("data stream closed by the client")]
pub struct StreamClosed;

/// Write half of a streaming response body.
#[derive(Debug, Clone)]
pub struct DataStreamWriter {
    tx: mpsc::Sender<Bytes>,
}

impl DataStreamWriter {
    /// Returns the writer and the receiver backing the response body.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub async fn write(&self, part: StreamPart) -> Result<(), StreamClosed> {
        self.tx
            .send(Bytes::from(part.encode()))
            .await
            .map_err(|_| StreamClosed)
    }

    pub async fn text(&self, delta: &str) -> Result<(), StreamClosed> {
        self.write(StreamPart::Text(delta.to_string())).await
    }

    pub async fn data(&self, item: Value) -> Result<(), StreamClosed> {
        self.write(StreamPart::Data(vec![item])).await
    }

    pub async fn error(&self, message: &str) -> Result<(), StreamClosed> {
        self.write(StreamPart::Error(message.to_string())).await
    }

    /// Resolves once the response body has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}
