use super::sse::SseDecoder;
use super::types::{ChatRequest, ModelEvent};
use super::{ModelConnector, ModelEventStream};
use crate::connectors::config::ModelServiceConfig;
use crate::connectors::ConnectorError;
use actix_web::web::Bytes;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::Instrument;

/// Calls an OpenAI-compatible Chat Completions API with `stream: true`.
pub struct ModelServiceClient {
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: Option<f32>,
    http_client: reqwest::Client,
}

impl ModelServiceClient {
    pub fn new(config: &ModelServiceConfig) -> Result<Self, ConnectorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| ConnectorError::Internal(format!("HTTP client: {}", err)))?;

        Ok(Self {
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            http_client,
        })
    }

    fn request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": request.messages,
            "stream": true,
            // usage only arrives in a final chunk when asked for
            "stream_options": { "include_usage": true },
        });
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(request
                .tools
                .iter()
                .map(|t| t.to_json())
                .collect::<Vec<_>>());
            body["tool_choice"] = serde_json::json!("auto");
        }
        if let Some(temperature) = self.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        body
    }
}

#[async_trait]
impl ModelConnector for ModelServiceClient {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ModelEventStream, ConnectorError> {
        let span = tracing::info_span!(
            "model_stream_chat",
            model = %self.model,
            messages = request.messages.len()
        );

        let mut req = self
            .http_client
            .post(&self.endpoint)
            .header("Accept", "text/event-stream")
            .json(&self.request_body(&request));
        if let Some(key) = self.api_key.as_ref() {
            req = req.bearer_auth(key);
        }

        let resp = req.send().instrument(span.clone()).await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::error!(parent: &span, %status, "Model API rejected the request");
            return Err(ConnectorError::from_status(status, &text));
        }

        Ok(decode_events(Box::pin(resp.bytes_stream())))
    }
}

struct DecodeState<S> {
    body: S,
    decoder: SseDecoder,
    pending: VecDeque<ModelEvent>,
    failed: bool,
}

fn decode_events<S>(body: S) -> ModelEventStream
where
    S: futures::Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    let state = DecodeState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        failed: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.failed || state.decoder.is_done() {
                return None;
            }

            let decoded = match state.body.next().await {
                Some(Ok(chunk)) => state.decoder.push(&chunk),
                Some(Err(err)) => Err(ConnectorError::from(err)),
                None => state.decoder.finish(),
            };

            match decoded {
                Ok(events) => state.pending.extend(events),
                Err(err) => {
                    state.failed = true;
                    return Some((Err(err), state));
                }
            }
        }
    })
    .boxed()
}
