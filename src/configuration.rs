use crate::connectors::{ModelServiceConfig, SearchServiceConfig};
use serde;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub app_port: u16,
    pub app_host: String,
    pub auth: AuthSettings,
    pub model: ModelServiceConfig,
    pub search: SearchServiceConfig,
    #[serde(default)]
    pub quota: QuotaSettings,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database_name: String,
}

/// Session endpoint of the auth provider.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AuthSettings {
    pub url: String,
    #[serde(default = "AuthSettings::default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl AuthSettings {
    const fn default_cache_ttl() -> u64 {
        60
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct QuotaSettings {
    /// Requests a non-admin user may make per UTC day
    pub daily_request_limit: i64,
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            daily_request_limit: 50,
        }
    }
}

impl DatabaseSettings {
    // Connection string: postgresql://<username>:<password>@<host>:<port>/<database_name>
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name,
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port,
        )
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // configuration.yaml first, then APP__SECTION__KEY overrides
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration"))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
