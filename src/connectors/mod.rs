//! External Service Connectors
//!
//! Adapters for the hosted language model and the web search API.
//! Routes and services only see the traits; the HTTP clients live next to them.
//!
//! ## Architecture Pattern
//!
//! 1. Define trait in `{service}` module → allows substituting doubles in tests
//! 2. Implement HTTP client in the same module
//! 3. Configuration in `config.rs`
//! 4. Inject `web::Data<Arc<dyn Trait>>` into routes
//!
//! ## Usage in Routes
//!
//! ```ignore
//! pub async fn handler(
//!     search: web::Data<Arc<dyn SearchConnector>>,
//! ) -> Result<impl Responder> {
//!     let found = search.search(&SearchQuery { q: "rust".into(), num: 10 }).await?;
//! }
//! ```

pub mod config;
pub mod errors;
pub mod model_service;
pub mod search_service;

pub use config::{ModelServiceConfig, SearchServiceConfig};
pub use errors::ConnectorError;
pub use model_service::{
    ChatMessage, ChatRequest, ModelConnector, ModelEvent, ModelEventStream, ModelServiceClient,
    ToolCall, ToolDef, Usage,
};
pub use search_service::{
    OrganicResult, SearchConnector, SearchHit, SearchQuery, SearchResponse, SearchServiceClient,
};

pub use model_service::init as init_model_service;
pub use search_service::init as init_search_service;
