use serde::Deserialize;
use std::env;
use std::time::Duration;

use resdesk_core::DEFAULT_PAGE_SIZE;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryMode {
    #[default]
    Memory,
    Http,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub mode: RepositoryMode,
    /// Admin API root, required in `http` mode
    pub base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
    /// Artificial delay of the in-memory repository
    pub latency_ms: Option<u64>,
}

impl RepositoryConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn latency(&self) -> Option<Duration> {
        self.latency_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
}

fn default_page_size() -> u32 { DEFAULT_PAGE_SIZE }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(environment())
            .build()?;

        s.try_deserialize()
    }
}

/// `RESDESK__REPOSITORY__MODE=http` sets `repository.mode`
fn environment() -> config::Environment {
    config::Environment::with_prefix("RESDESK").separator("__")
}
