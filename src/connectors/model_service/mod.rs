mod client;
mod sse;
mod types;

pub use client::ModelServiceClient;
pub use sse::SseDecoder;
pub use types::*;

use super::config::ModelServiceConfig;
use super::errors::ConnectorError;
use actix_web::web;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

pub type ModelEventStream = BoxStream<'static, Result<ModelEvent, ConnectorError>>;

/// Abstraction over the hosted language model.
///
/// Production: `ModelServiceClient`. Tests script the event sequence directly.
#[async_trait]
pub trait ModelConnector: Send + Sync {
    /// Starts one completion and yields its events as they arrive.
    async fn stream_chat(&self, request: ChatRequest) -> Result<ModelEventStream, ConnectorError>;
}

pub fn init(config: &ModelServiceConfig) -> Result<web::Data<Arc<dyn ModelConnector>>, ConnectorError> {
    if config.api_key.is_none() {
        tracing::warn!("Model API key is not configured; requests go out unauthenticated");
    }
    let client: Arc<dyn ModelConnector> = Arc::new(ModelServiceClient::new(config)?);
    Ok(web::Data::new(client))
}
