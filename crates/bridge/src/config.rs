use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::BridgeError;

/// Bridge configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base URL of the kitforge service, without `/api/v1`.
    pub api_url: String,
    /// Design tool executable, or the application bundle on macOS.
    pub designer_path: PathBuf,
    pub poll_interval: Duration,
    pub designer_timeout: Duration,
    /// Limit for each request to the service or an asset host.
    pub http_timeout: Duration,
    /// Downloads and automation scripts, one subdirectory per job.
    pub work_dir: PathBuf,
    /// Where the design tool writes exports.
    pub output_dir: PathBuf,
    pub claim_batch_size: i64,
}

impl BridgeConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                 | Default                          |
    /// |-------------------------|----------------------------------|
    /// | `KITFORGE_API_URL`      | required                         |
    /// | `DESIGNER_PATH`         | required                         |
    /// | `POLL_INTERVAL_MS`      | `5000`                           |
    /// | `DESIGNER_TIMEOUT_SECS` | `300`                            |
    /// | `HTTP_TIMEOUT_SECS`     | `120`                            |
    /// | `BRIDGE_WORK_DIR`       | `<tmp>/kitforge-bridge/work`     |
    /// | `BRIDGE_OUTPUT_DIR`     | `<tmp>/kitforge-bridge/output`   |
    /// | `CLAIM_BATCH_SIZE`      | `5`                              |
    pub fn from_env() -> Result<Self, BridgeError> {
        let api_url = required("KITFORGE_API_URL")?;
        let designer_path = PathBuf::from(required("DESIGNER_PATH")?);

        let base = std::env::temp_dir().join("kitforge-bridge");
        let work_dir = std::env::var("BRIDGE_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base.join("work"));
        let output_dir = std::env::var("BRIDGE_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base.join("output"));

        let claim_batch_size: i64 = parsed("CLAIM_BATCH_SIZE", 5)?;
        if claim_batch_size < 1 {
            return Err(BridgeError::Config(
                "CLAIM_BATCH_SIZE must be at least 1".into(),
            ));
        }

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            designer_path,
            poll_interval: Duration::from_millis(parsed("POLL_INTERVAL_MS", 5000)?),
            designer_timeout: Duration::from_secs(parsed("DESIGNER_TIMEOUT_SECS", 300)?),
            http_timeout: Duration::from_secs(parsed("HTTP_TIMEOUT_SECS", 120)?),
            work_dir,
            output_dir,
            claim_batch_size,
        })
    }
}

fn required(key: &str) -> Result<String, BridgeError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| BridgeError::Config(format!("{key} must be set")))
}

fn parsed<T: FromStr>(key: &str, default: T) -> Result<T, BridgeError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| BridgeError::Config(format!("{key} has an invalid value '{value}'"))),
        Err(_) => Ok(default),
    }
}
