use super::types::{ModelEvent, Usage};
use crate::connectors::ConnectorError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallChunk>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallChunk {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionChunk>,
}

#[derive(Debug, Deserialize)]
struct FunctionChunk {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Incremental decoder for a `text/event-stream` completion body.
///
/// Bytes are buffered until a full line is available, so a chunk boundary
/// may fall anywhere, including inside a multi-byte character.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `data: [DONE]` was seen; everything after it is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<ModelEvent>, ConnectorError> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if self.done {
                continue;
            }
            self.decode_line(&line, &mut events)?;
        }

        Ok(events)
    }

    /// Decodes whatever is left once the body has ended.
    pub fn finish(&mut self) -> Result<Vec<ModelEvent>, ConnectorError> {
        let rest = std::mem::take(&mut self.buffer);
        let mut events = Vec::new();
        if !self.done && !rest.is_empty() {
            self.decode_line(&rest, &mut events)?;
        }
        self.done = true;
        Ok(events)
    }

    fn decode_line(&mut self, raw: &[u8], events: &mut Vec<ModelEvent>) -> Result<(), ConnectorError> {
        let line = std::str::from_utf8(raw)
            .map_err(|err| ConnectorError::InvalidResponse(format!("stream is not UTF-8: {}", err)))?
            .trim();

        // comments, event names and keep-alives carry nothing for us
        let payload = match line.strip_prefix("data:") {
            Some(payload) => payload.trim(),
            None => return Ok(()),
        };
        if payload.is_empty() {
            return Ok(());
        }
        if payload == "[DONE]" {
            self.done = true;
            return Ok(());
        }

        let chunk: CompletionChunk = serde_json::from_str(payload)
            .map_err(|err| ConnectorError::InvalidResponse(format!("Invalid streaming chunk: {}", err)))?;

        for choice in chunk.choices {
            if let Some(delta) = choice.delta {
                if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
                    events.push(ModelEvent::TextDelta(text));
                }
                for call in delta.tool_calls.unwrap_or_default() {
                    let (name, arguments) = match call.function {
                        Some(f) => (f.name, f.arguments.unwrap_or_default()),
                        None => (None, String::new()),
                    };
                    events.push(ModelEvent::ToolCallDelta {
                        index: call.index,
                        id: call.id,
                        name,
                        arguments,
                    });
                }
            }
            if let Some(reason) = choice.finish_reason {
                events.push(ModelEvent::Finish { reason });
            }
        }

        if let Some(usage) = chunk.usage {
            events.push(ModelEvent::Usage(Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            }));
        }

        Ok(())
    }
}
