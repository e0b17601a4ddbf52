//! HTTP server configuration.

use std::net::SocketAddr;

/// Settings for the HTTP surface; everything else lives in the pipeline
/// config.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `*` opens the API up entirely
    pub cors_origins: Vec<String>,
    /// Upper bound on request bodies (parameter documents can be large)
    pub max_body_size: usize,
    /// Expose the Prometheus scrape endpoint
    pub metrics_enabled: bool,
    /// `development` or `production`; controls error detail exposure
    pub environment: String,
}

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_BODY: usize = 10 * 1024 * 1024;

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            cors_origins: vec!["*".to_string()],
            max_body_size: DEFAULT_MAX_BODY,
            metrics_enabled: true,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Read server settings from the environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(DEFAULT_PORT),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|raw| raw.split(',').map(|o| o.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(DEFAULT_MAX_BODY),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| matches!(v.as_str(), "true" | "1"))
                .unwrap_or(true),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
