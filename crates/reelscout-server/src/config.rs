//! Server configuration
//!
//! Built-in defaults come from `config/default.toml`. A user file given
//! with `--config` replaces them section by section; missing sections
//! keep their defaults.

use std::path::Path;
use std::time::Duration;

use reelscout_core::{ClientConfig, ResultLimits};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Environment variable overriding the download service endpoint
pub const DOWNLOAD_SERVICE_ENV: &str = "REELSCOUT_DOWNLOAD_SERVICE_URL";

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server: ListenConfig,
    pub fetcher: FetcherConfig,
    pub limits: LimitsConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    pub listen: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    pub timeout_secs: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_redirects: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub page: usize,
    pub sessions: usize,
    pub basic: usize,
    pub listing: usize,
    pub streams: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub webhook_url: String,
    pub webhook_timeout_secs: u64,
    pub download_service_url: String,
    pub download_timeout_secs: u64,
}

/// A user file where every section is optional
#[derive(Debug, Deserialize)]
struct PartialConfig {
    server: Option<ListenConfig>,
    fetcher: Option<FetcherConfig>,
    limits: Option<LimitsConfig>,
    upstream: Option<UpstreamConfig>,
}

impl ServerConfig {
    /// Load config: built-in defaults, then the user file, then environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ServerError> {
        let mut config = Self::defaults()?;

        if let Some(path) = path {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ServerError::Config(format!("{}: {}", path.display(), e)))?;
            config.merge_toml(&text)?;
            tracing::info!(path = %path.display(), "loaded config file");
        }

        config.apply_env(std::env::var(DOWNLOAD_SERVICE_ENV).ok());
        Ok(config)
    }

    /// Built-in defaults only
    pub fn defaults() -> Result<Self, ServerError> {
        toml::from_str(DEFAULT_CONFIG).map_err(|e| ServerError::Config(e.to_string()))
    }

    fn merge_toml(&mut self, text: &str) -> Result<(), ServerError> {
        let user: PartialConfig =
            toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;

        if let Some(server) = user.server {
            self.server = server;
        }
        if let Some(fetcher) = user.fetcher {
            self.fetcher = fetcher;
        }
        if let Some(limits) = user.limits {
            self.limits = limits;
        }
        if let Some(upstream) = user.upstream {
            self.upstream = upstream;
        }
        Ok(())
    }

    fn apply_env(&mut self, download_service_url: Option<String>) {
        if let Some(url) = download_service_url.filter(|u| !u.trim().is_empty()) {
            self.upstream.download_service_url = url.trim().to_string();
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout_secs: self.fetcher.timeout_secs,
            min_delay_ms: self.fetcher.min_delay_ms,
            max_delay_ms: self.fetcher.max_delay_ms,
            max_redirects: self.fetcher.max_redirects,
            seed: self.fetcher.seed,
        }
    }

    pub fn result_limits(&self) -> ResultLimits {
        ResultLimits {
            page: self.limits.page,
            sessions: self.limits.sessions,
            basic: self.limits.basic,
            listing: self.limits.listing,
            streams: self.limits.streams,
        }
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.webhook_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.download_timeout_secs)
    }
}
