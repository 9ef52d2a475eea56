use serde::{Deserialize, Serialize};

/// Model API connector configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelServiceConfig {
    /// Base URL, e.g. https://api.openai.com/v1
    pub base_url: String,
    /// Bearer key (from env: APP__MODEL__API_KEY)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Model identifier sent with every request
    pub model: String,
    /// Upper bound of model calls per chat request
    #[serde(default = "ModelServiceConfig::default_max_steps")]
    pub max_steps: usize,
    /// HTTP request timeout in seconds, covering the whole streamed response
    #[serde(default = "ModelServiceConfig::default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl ModelServiceConfig {
    const fn default_max_steps() -> usize {
        10
    }

    const fn default_timeout() -> u64 {
        60
    }
}

impl Default for ModelServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_steps: Self::default_max_steps(),
            timeout_secs: Self::default_timeout(),
            temperature: None,
        }
    }
}

/// Search API connector configuration (Serper-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchServiceConfig {
    /// Base URL, e.g. https://google.serper.dev
    pub base_url: String,
    /// Sent as X-API-KEY (from env: APP__SEARCH__API_KEY)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// `num` sent with every web search
    #[serde(default = "SearchServiceConfig::default_num_results")]
    pub num_results: u32,
    #[serde(default = "SearchServiceConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl SearchServiceConfig {
    const fn default_num_results() -> u32 {
        10
    }

    const fn default_timeout() -> u64 {
        15
    }
}

impl Default for SearchServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://google.serper.dev".to_string(),
            api_key: None,
            num_results: Self::default_num_results(),
            timeout_secs: Self::default_timeout(),
        }
    }
}
