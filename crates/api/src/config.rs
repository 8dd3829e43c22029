use std::path::PathBuf;
use std::str::FromStr;

/// Error raised for an environment variable that does not parse.
#[derive(Debug, thiserror::Error)]
#[error("{key} has an invalid value '{value}'")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

/// Read `key`, falling back to `default` when unset.
fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError { key, value }),
        Err(_) => Ok(default),
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time allowed for in-flight requests after a shutdown signal
    /// (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub artifacts: ArtifactConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `ARTIFACT_DIR`         | `./artifacts`              |
    /// | `ARTIFACT_BASE_URL`    | `/artifacts`               |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port: env_or("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30)?,
            artifacts: ArtifactConfig::from_env(),
        })
    }
}

/// Where previews and uploaded exports are stored and served from.
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    /// Local directory holding artifact files.
    pub dir: PathBuf,
    /// Public URL prefix under which `dir` is served.
    pub base_url: String,
}

impl ArtifactConfig {
    pub fn from_env() -> Self {
        let dir = std::env::var("ARTIFACT_DIR").unwrap_or_else(|_| "./artifacts".into());
        let base_url = std::env::var("ARTIFACT_BASE_URL").unwrap_or_else(|_| "/artifacts".into());
        Self {
            dir: PathBuf::from(dir),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}
